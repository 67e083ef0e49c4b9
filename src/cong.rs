//! TCP-style congestion control, adapted to a per-packet (rather than
//! per-byte) sliding window. Mirrors the slow-start / congestion-avoidance
//! split of a classical Reno-style controller.

/// `cwnd` is kept real-valued so that congestion-avoidance growth
/// (`cwnd += 1/cwnd`) doesn't collapse to zero under integer truncation;
/// only the floor of it is ever used to bound the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionState {
    pub cwnd: f64,
    pub ssthresh: f64,
}

impl Default for CongestionState {
    fn default() -> Self {
        CongestionState {
            cwnd: 1.0,
            ssthresh: 16.0,
        }
    }
}

impl CongestionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }

    /// Applied on each ACK that actually advances `base`/`acked`.
    pub fn on_good_ack(&mut self) {
        if self.is_slow_start() {
            self.cwnd += 1.0;
        } else {
            self.cwnd += 1.0 / self.cwnd;
        }
    }

    fn halve_ssthresh(&mut self) -> f64 {
        self.ssthresh = (self.cwnd / 2.0).floor().max(1.0);
        self.ssthresh
    }

    /// GBN treats any loss signal (NAK or timeout) as aggressive backoff:
    /// collapse straight to `cwnd = 1`.
    pub fn on_loss_gbn(&mut self) {
        self.halve_ssthresh();
        self.cwnd = 1.0;
    }

    /// SR treats a loss signal (NAK or timeout) as a single dropped
    /// packet, so it only halves, reflecting per-packet loss semantics.
    pub fn on_loss_sr(&mut self) {
        let halved = self.halve_ssthresh();
        self.cwnd = halved;
    }

    /// The effective sending window: `floor(min(cwnd, rwnd, wmax))`.
    pub fn effective_window(&self, rwnd: u32, wmax: u32) -> u32 {
        self.cwnd.floor().min(rwnd as f64).min(wmax as f64).max(0.0) as u32
    }
}
