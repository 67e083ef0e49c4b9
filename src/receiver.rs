//! The receiver-side state machine: validates incoming DATA, buffers or
//! delivers it depending on discipline, and emits ACK/NAK carrying the
//! current receive-window advertisement.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::clock::Clock;
use crate::config::{AckMode, ReceiverConfig, WindowScheduleEntry};
use crate::err::Error;
use crate::inject::FaultInjector;
use crate::packet::{encode_window, Packet};
use crate::protocol::Protocol;
use crate::sender::PacketSink;

pub struct ReceiverEngine {
    protocol: Protocol,
    ack_mode: AckMode,
    ack_faults: FaultInjector,
    window_schedule: Vec<WindowScheduleEntry>,
    clock: Clock,
    start: Instant,
    next_schedule_idx: usize,

    expected: u32,
    buffered: HashMap<u32, Vec<u8>>,
    recv_base: u32,
    rwnd_adv: u32,

    delivered: Vec<Vec<u8>>,
}

impl ReceiverEngine {
    pub fn new(cfg: &ReceiverConfig, clock: Clock) -> Self {
        let start = clock.now();
        ReceiverEngine {
            protocol: cfg.protocol_default,
            ack_mode: cfg.ack_mode,
            ack_faults: cfg.ack_faults.clone(),
            window_schedule: cfg.window_schedule.clone(),
            clock,
            start,
            next_schedule_idx: 0,
            expected: 0,
            buffered: HashMap::new(),
            recv_base: 0,
            rwnd_adv: cfg.rwnd_ceiling,
            delivered: Vec::new(),
        }
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    pub fn recv_base(&self) -> u32 {
        self.recv_base
    }

    pub fn rwnd_adv(&self) -> u32 {
        self.rwnd_adv
    }

    /// Applies any schedule entries whose offset has elapsed since the
    /// connection started. Called on every inbound packet so a stale
    /// advertisement never outlives its scheduled moment for long.
    fn apply_schedule(&mut self) {
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        while self.next_schedule_idx < self.window_schedule.len()
            && elapsed >= self.window_schedule[self.next_schedule_idx].offset
        {
            let entry = self.window_schedule[self.next_schedule_idx];
            debug!("receiver: rwnd_adv {} -> {}", self.rwnd_adv, entry.window);
            self.rwnd_adv = entry.window;
            self.next_schedule_idx += 1;
        }
    }

    fn emit_control<S: PacketSink>(
        &self,
        seq: u32,
        nak: bool,
        sink: &mut S,
    ) -> Result<(), Error> {
        if self.ack_faults.should_drop(seq) {
            trace!("receiver: suppressing ack/nak for seq {seq} (loss injection)");
            return Ok(());
        }
        let payload = encode_window(self.rwnd_adv);
        let mut pkt = if nak {
            Packet::nak(seq, payload)
        } else {
            Packet::ack(seq, payload)
        };
        if self.ack_faults.should_corrupt(seq) {
            pkt = pkt.corrupt();
            warn!("receiver: injecting checksum corruption on ack/nak for seq {seq}");
        }
        sink.send(&pkt)
    }

    /// Processes one inbound DATA packet. Malformed frames never reach
    /// here; the caller drops those during decode.
    pub fn on_data<S: PacketSink>(&mut self, pkt: &Packet, sink: &mut S) -> Result<(), Error> {
        self.apply_schedule();

        if !pkt.checksum_ok() {
            let in_window = match self.protocol {
                Protocol::GoBackN => {
                    pkt.seq >= self.expected && pkt.seq < self.expected + self.rwnd_adv
                }
                Protocol::SelectiveRepeat => {
                    pkt.seq >= self.recv_base && pkt.seq < self.recv_base + self.rwnd_adv
                }
            };
            if in_window {
                warn!("receiver: checksum mismatch on seq {}, sending nak", pkt.seq);
                self.emit_control(pkt.seq, true, sink)?;
            } else {
                trace!("receiver: dropping out-of-window corrupt seq {}", pkt.seq);
            }
            return Ok(());
        }

        match self.protocol {
            Protocol::GoBackN => self.on_data_gbn(pkt, sink),
            Protocol::SelectiveRepeat => self.on_data_sr(pkt, sink),
        }
    }

    fn on_data_gbn<S: PacketSink>(&mut self, pkt: &Packet, sink: &mut S) -> Result<(), Error> {
        if pkt.seq == self.expected {
            trace!("receiver: delivering seq {}", pkt.seq);
            self.delivered.push(pkt.payload.clone());
            self.expected += 1;
        } else {
            trace!("receiver: dropping out-of-order seq {} (expected {})", pkt.seq, self.expected);
        }

        let ack_seq = match self.ack_mode {
            AckMode::Individual => pkt.seq,
            AckMode::Cumulative => {
                if self.expected == 0 {
                    pkt.seq
                } else {
                    self.expected - 1
                }
            }
        };
        self.emit_control(ack_seq, false, sink)
    }

    fn on_data_sr<S: PacketSink>(&mut self, pkt: &Packet, sink: &mut S) -> Result<(), Error> {
        if pkt.seq < self.recv_base {
            trace!("receiver: re-acking duplicate seq {}", pkt.seq);
            return self.emit_control(pkt.seq, false, sink);
        }
        if pkt.seq >= self.recv_base + self.rwnd_adv {
            trace!("receiver: dropping future seq {} outside window", pkt.seq);
            return Ok(());
        }

        self.buffered.entry(pkt.seq).or_insert_with(|| pkt.payload.clone());
        self.emit_control(pkt.seq, false, sink)?;

        while let Some(payload) = self.buffered.remove(&self.recv_base) {
            self.delivered.push(payload);
            self.recv_base += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gbn_config(ack_mode: AckMode) -> ReceiverConfig {
        ReceiverConfig {
            protocol_default: Protocol::GoBackN,
            ack_mode,
            rwnd_ceiling: 5,
            ..ReceiverConfig::default()
        }
    }

    fn sr_config() -> ReceiverConfig {
        ReceiverConfig {
            protocol_default: Protocol::SelectiveRepeat,
            rwnd_ceiling: 5,
            ..ReceiverConfig::default()
        }
    }

    #[test]
    fn gbn_in_order_delivery_acks_each_seq_individually() {
        let cfg = gbn_config(AckMode::Individual);
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        for seq in 0..3 {
            let pkt = Packet::data(seq, format!("Pacote {seq}").into_bytes());
            receiver.on_data(&pkt, &mut out).unwrap();
        }

        assert_eq!(receiver.expected(), 3);
        assert_eq!(receiver.delivered().len(), 3);
    }

    #[test]
    fn gbn_cumulative_ack_reports_latest_in_order_frontier() {
        let cfg = gbn_config(AckMode::Cumulative);
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        receiver
            .on_data(&Packet::data(0, b"Pacote 0".to_vec()), &mut out)
            .unwrap();
        out.clear();
        receiver
            .on_data(&Packet::data(1, b"Pacote 1".to_vec()), &mut out)
            .unwrap();

        let ack = Packet::decode(&out).unwrap();
        assert!(ack.is_ack());
        assert_eq!(ack.seq, 1);
    }

    #[test]
    fn gbn_out_of_order_is_dropped_but_still_acked() {
        let cfg = gbn_config(AckMode::Individual);
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        let pkt = Packet::data(2, b"Pacote 2".to_vec());
        receiver.on_data(&pkt, &mut out).unwrap();

        assert_eq!(receiver.expected(), 0);
        assert!(receiver.delivered().is_empty());
        let ack = Packet::decode(&out).unwrap();
        assert!(ack.is_ack());
        assert_eq!(ack.seq, 2);
    }

    #[test]
    fn checksum_mismatch_produces_nak() {
        let cfg = gbn_config(AckMode::Individual);
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        let corrupted = Packet::data(0, b"Pacote 0".to_vec()).corrupt();
        receiver.on_data(&corrupted, &mut out).unwrap();

        let nak = Packet::decode(&out).unwrap();
        assert!(nak.is_nak());
        assert_eq!(receiver.expected(), 0);
    }

    #[test]
    fn sr_buffers_out_of_order_and_advances_on_gap_fill() {
        let cfg = sr_config();
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        for seq in [3u32, 4, 5] {
            let pkt = Packet::data(seq, format!("Pacote {seq}").into_bytes());
            receiver.on_data(&pkt, &mut out).unwrap();
        }
        assert_eq!(receiver.recv_base(), 0);
        assert!(receiver.delivered().is_empty());

        for seq in [0u32, 1, 2] {
            let pkt = Packet::data(seq, format!("Pacote {seq}").into_bytes());
            receiver.on_data(&pkt, &mut out).unwrap();
        }
        assert_eq!(receiver.recv_base(), 6);
        assert_eq!(receiver.delivered().len(), 6);
    }

    #[test]
    fn sr_future_seq_beyond_window_is_dropped_silently() {
        let cfg = sr_config();
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        let pkt = Packet::data(10, b"too far".to_vec());
        receiver.on_data(&pkt, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn ack_loss_injection_suppresses_the_wire_write() {
        let mut cfg = gbn_config(AckMode::Individual);
        cfg.ack_faults = FaultInjector::new().with_drop([0]);
        let mut receiver = ReceiverEngine::new(&cfg, Clock::real());
        let mut out = Vec::new();

        receiver
            .on_data(&Packet::data(0, b"Pacote 0".to_vec()), &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(receiver.expected(), 1); // state still advances
    }

    #[test]
    fn dynamic_schedule_shrinks_rwnd_adv_over_time() {
        let mut cfg = sr_config();
        cfg.rwnd_ceiling = 5;
        cfg.window_schedule = vec![WindowScheduleEntry {
            offset: Duration::from_millis(100),
            window: 1,
        }];
        let offset = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let offset_clone = offset.clone();
        let base = Instant::now();
        let clock = Clock::from_fn(move || {
            base + Duration::from_millis(offset_clone.load(std::sync::atomic::Ordering::SeqCst))
        });
        let mut receiver = ReceiverEngine::new(&cfg, clock);
        assert_eq!(receiver.rwnd_adv(), 5);

        offset.store(150, std::sync::atomic::Ordering::SeqCst);
        let mut out = Vec::new();
        receiver
            .on_data(&Packet::data(0, b"Pacote 0".to_vec()), &mut out)
            .unwrap();
        assert_eq!(receiver.rwnd_adv(), 1);
    }
}
