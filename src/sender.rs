//! The sender-side sliding-window state machine: fills the window up to
//! `floor(min(cwnd, rwnd, wmax))`, tracks one retransmission timer per
//! outstanding seq, applies congestion control on ACK/NAK, and reproduces
//! Go-Back-N's "retransmit everything from base" behaviour on timeout.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::clock::Clock;
use crate::cong::CongestionState;
use crate::config::{SendMode, SenderConfig};
use crate::err::Error;
use crate::inject::FaultInjector;
use crate::packet::{encode_window, Packet};
use crate::protocol::Protocol;

/// Anything a `Packet` can be written to. Blanket-implemented for every
/// `Write`, so engines run against a real socket or a plain `Vec<u8>`.
pub trait PacketSink {
    fn send(&mut self, pkt: &Packet) -> Result<(), Error>;
}

impl<W: Write> PacketSink for W {
    fn send(&mut self, pkt: &Packet) -> Result<(), Error> {
        self.write_all(&pkt.encode()).map_err(Error::from)
    }
}

fn default_payload(seq: u32) -> Vec<u8> {
    format!("Pacote {seq}").into_bytes()
}

pub struct SenderEngine {
    protocol: Protocol,
    total: u32,
    wmax: u32,
    send_mode: SendMode,
    timeout: Duration,
    max_retries: u32,
    data_faults: FaultInjector,
    clock: Clock,

    base: u32,
    next_seq: u32,
    sent: HashMap<u32, Vec<u8>>,
    timers: HashMap<u32, Instant>,
    retries: HashMap<u32, u32>,
    acked: HashSet<u32>,
    abandoned: HashSet<u32>,
    cong: CongestionState,
    rwnd: u32,
    terminated: bool,
}

impl SenderEngine {
    pub fn new(cfg: &SenderConfig, clock: Clock, initial_rwnd: u32) -> Self {
        SenderEngine {
            protocol: cfg.protocol,
            total: cfg.total,
            wmax: cfg.wmax,
            send_mode: cfg.send_mode,
            timeout: cfg.timeout,
            max_retries: cfg.max_retries,
            data_faults: cfg.data_faults.clone(),
            clock,
            base: 0,
            next_seq: 0,
            sent: HashMap::new(),
            timers: HashMap::new(),
            retries: HashMap::new(),
            acked: HashSet::new(),
            abandoned: HashSet::new(),
            cong: CongestionState::new(),
            rwnd: initial_rwnd,
            terminated: false,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    pub fn cwnd(&self) -> f64 {
        self.cong.cwnd
    }

    pub fn ssthresh(&self) -> f64 {
        self.cong.ssthresh
    }

    pub fn retries_for(&self, seq: u32) -> u32 {
        self.retries.get(&seq).copied().unwrap_or(0)
    }

    pub fn abandoned_seqs(&self) -> &HashSet<u32> {
        &self.abandoned
    }

    pub fn effective_window(&self) -> u32 {
        self.cong.effective_window(self.rwnd, self.wmax)
    }

    #[cfg(test)]
    pub(crate) fn force_cwnd(&mut self, cwnd: f64) {
        self.cong.cwnd = cwnd;
    }

    pub fn is_done(&self) -> bool {
        self.terminated || self.base >= self.total
    }

    /// Current count of unacknowledged outstanding packets: `next_seq -
    /// base` under GBN, `|sent|` under SR (acked seqs are purged from
    /// `sent` as soon as they're confirmed).
    pub fn outstanding_in_flight(&self) -> u32 {
        match self.protocol {
            Protocol::GoBackN => self.next_seq - self.base,
            Protocol::SelectiveRepeat => self.sent.len() as u32,
        }
    }

    /// Sends new DATA packets up to the current effective window. Safe to
    /// call repeatedly; a no-op once the window or the total is exhausted.
    /// In `SendMode::Single` at most one new packet is emitted per call,
    /// so the caller is expected to drain responses between calls; in
    /// `SendMode::Batch` the window is filled in one go.
    pub fn fill_window<S: PacketSink>(&mut self, sink: &mut S) -> Result<(), Error> {
        let w = self.effective_window();
        while self.next_seq < self.total && self.outstanding_in_flight() < w {
            self.send_one(sink)?;
            if self.send_mode == SendMode::Single {
                break;
            }
        }
        Ok(())
    }

    fn send_one<S: PacketSink>(&mut self, sink: &mut S) -> Result<(), Error> {
        let seq = self.next_seq;
        let payload = default_payload(seq);
        let corrupt = self.data_faults.should_corrupt(seq);
        let mut pkt = Packet::data(seq, payload.clone());
        if corrupt {
            pkt = pkt.corrupt();
            warn!("sender: injecting checksum corruption on seq {seq}");
        }
        trace!("sender: sending seq {seq}");
        sink.send(&pkt)?;

        self.sent.insert(seq, payload);
        self.timers.insert(seq, self.clock.now() + self.timeout);
        self.retries.insert(seq, 0);
        self.next_seq += 1;
        Ok(())
    }

    fn retransmit<S: PacketSink>(&mut self, seq: u32, sink: &mut S) -> Result<(), Error> {
        if let Some(payload) = self.sent.get(&seq).cloned() {
            let pkt = Packet::data(seq, payload);
            sink.send(&pkt)?;
            self.timers.insert(seq, self.clock.now() + self.timeout);
        }
        Ok(())
    }

    fn apply_window_advertisement(&mut self, pkt: &Packet) {
        if let Some(new_rwnd) = pkt.window_advertisement() {
            if new_rwnd != self.rwnd {
                debug!("sender: rwnd updated {} -> {}", self.rwnd, new_rwnd);
                self.rwnd = new_rwnd;
            }
        }
    }

    /// Handles one inbound ACK or NAK. DATA packets arriving at the
    /// sender are a protocol violation from the peer and are ignored.
    pub fn handle_incoming<S: PacketSink>(
        &mut self,
        pkt: &Packet,
        sink: &mut S,
    ) -> Result<(), Error> {
        if !pkt.checksum_ok() {
            warn!("sender: dropping ack/nak with bad checksum for seq {}", pkt.seq);
            return Ok(());
        }
        self.apply_window_advertisement(pkt);

        if pkt.is_ack() {
            self.handle_ack(pkt.seq);
        } else if pkt.is_nak() {
            self.handle_nak(pkt.seq, sink)?;
        }
        Ok(())
    }

    fn handle_ack(&mut self, r: u32) {
        let advanced = match self.protocol {
            Protocol::GoBackN => {
                if r >= self.base {
                    for seq in self.base..=r {
                        self.timers.remove(&seq);
                        self.sent.remove(&seq);
                    }
                    self.base = r + 1;
                    true
                } else {
                    false
                }
            }
            Protocol::SelectiveRepeat => {
                if self.acked.insert(r) {
                    self.timers.remove(&r);
                    self.sent.remove(&r);
                    while self.acked.contains(&self.base) {
                        self.base += 1;
                    }
                    true
                } else {
                    false
                }
            }
        };

        if advanced {
            debug!("sender: ack {r} advanced base to {}", self.base);
            self.cong.on_good_ack();
        }
    }

    fn handle_nak<S: PacketSink>(&mut self, r: u32, sink: &mut S) -> Result<(), Error> {
        match self.protocol {
            Protocol::GoBackN => self.cong.on_loss_gbn(),
            Protocol::SelectiveRepeat => self.cong.on_loss_sr(),
        }

        let attempts = self.retries.entry(r).or_insert(0);
        if *attempts < self.max_retries {
            *attempts += 1;
            warn!("sender: nak for seq {r}, retry {}", *attempts);
            self.retransmit(r, sink)?;
        } else {
            self.handle_retry_ceiling(r);
        }
        Ok(())
    }

    fn handle_retry_ceiling(&mut self, r: u32) {
        warn!("sender: seq {r} exhausted retries");
        match self.protocol {
            Protocol::GoBackN => self.terminated = true,
            Protocol::SelectiveRepeat => {
                self.abandoned.insert(r);
                self.timers.remove(&r);
                self.sent.remove(&r);
                self.acked.insert(r);
                while self.acked.contains(&self.base) {
                    self.base += 1;
                }
            }
        }
    }

    /// Sweeps for expired timers. Must be called regularly (the session
    /// runner does this every poll iteration); a no-op if nothing expired.
    pub fn on_tick<S: PacketSink>(&mut self, sink: &mut S) -> Result<(), Error> {
        let now = self.clock.now();
        match self.protocol {
            Protocol::GoBackN => self.tick_gbn(now, sink),
            Protocol::SelectiveRepeat => self.tick_sr(now, sink),
        }
    }

    fn tick_gbn<S: PacketSink>(&mut self, now: Instant, sink: &mut S) -> Result<(), Error> {
        let Some(&deadline) = self.timers.get(&self.base) else {
            return Ok(());
        };
        if now < deadline {
            return Ok(());
        }

        let base = self.base;
        let attempts = self.retries.entry(base).or_insert(0);
        if *attempts >= self.max_retries {
            self.handle_retry_ceiling(base);
            return Ok(());
        }
        *attempts += 1;

        self.cong.on_loss_gbn();
        warn!("sender: timeout on base seq {base}, going back from {base}");
        self.next_seq = base;
        let outstanding: Vec<u32> = self.sent.keys().copied().collect();
        for seq in outstanding {
            self.retransmit(seq, sink)?;
            self.next_seq = self.next_seq.max(seq + 1);
        }
        Ok(())
    }

    fn tick_sr<S: PacketSink>(&mut self, now: Instant, sink: &mut S) -> Result<(), Error> {
        let expired: Vec<u32> = self
            .timers
            .iter()
            .filter(|(_, &deadline)| now >= deadline)
            .map(|(&seq, _)| seq)
            .collect();

        for seq in expired {
            self.cong.on_loss_sr();
            let attempts = self.retries.entry(seq).or_insert(0);
            if *attempts < self.max_retries {
                *attempts += 1;
                warn!("sender: timeout on seq {seq}, retry {}", *attempts);
                self.retransmit(seq, sink)?;
            } else {
                self.handle_retry_ceiling(seq);
            }
        }
        Ok(())
    }
}

pub fn window_advertisement_payload(window: u32) -> Vec<u8> {
    encode_window(window)
}
