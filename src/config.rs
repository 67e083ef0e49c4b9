//! Plain configuration structs. Constructed directly in library/test use,
//! or parsed from CLI flags by the two binaries.

use std::time::Duration;

use clap::ValueEnum;

use crate::inject::FaultInjector;
use crate::protocol::Protocol;

/// How the sender fills its window before draining responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SendMode {
    Single,
    Batch,
}

/// Whether the receiver acknowledges each seq individually, or the latest
/// in-order frontier (GBN cumulative mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AckMode {
    Individual,
    Cumulative,
}

pub const DEFAULT_TOTAL: u32 = 6;
pub const DEFAULT_WMAX: u32 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RWND: u32 = 5;

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub wmax: u32,
    pub send_mode: SendMode,
    pub total: u32,
    /// Seqs whose first transmission gets a deliberately bad checksum.
    /// Only `should_corrupt` is meaningful here; drops aren't part of the
    /// sender-side fault surface.
    pub data_faults: FaultInjector,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            protocol: Protocol::SelectiveRepeat,
            wmax: DEFAULT_WMAX,
            send_mode: SendMode::Batch,
            total: DEFAULT_TOTAL,
            data_faults: FaultInjector::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// One entry of a dynamic receive-window schedule: after `offset` has
/// elapsed since the connection started, advertise `window` from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowScheduleEntry {
    pub offset: Duration,
    pub window: u32,
}

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub host: String,
    pub port: u16,
    pub protocol_default: Protocol,
    pub rwnd_ceiling: u32,
    pub ack_mode: AckMode,
    /// Outgoing ACK/NAK faults: `should_drop` suppresses the write
    /// entirely, `should_corrupt` sends it with a deliberately bad
    /// checksum.
    pub ack_faults: FaultInjector,
    pub window_schedule: Vec<WindowScheduleEntry>,
    pub processing_delay: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            protocol_default: Protocol::SelectiveRepeat,
            rwnd_ceiling: DEFAULT_RWND,
            ack_mode: AckMode::Individual,
            ack_faults: FaultInjector::new(),
            window_schedule: Vec::new(),
            processing_delay: None,
        }
    }
}
