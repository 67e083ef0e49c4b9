//! A reliable-transport protocol engine: a sender and a receiver that
//! provide in-order, exactly-once delivery of a finite sequence of
//! application messages over an unreliable unit-packet channel, using
//! sequence numbers, checksums, ACK/NAK, per-packet retransmission
//! timers, a congestion-controlled sliding window, and a dynamic
//! receive-window advertisement. Both Go-Back-N and Selective Repeat
//! disciplines are supported, negotiated at connection start.
//!
//! The codec and the two engines are transport-agnostic: they write
//! `Packet` values to anything implementing [`std::io::Write`], which
//! makes them exercisable directly against a `Vec<u8>` in tests. The
//! [`transport`] module supplies the real carrier — a TCP stream wrapped
//! with a length-delimited frame so that a single `write` always
//! surfaces as a single `read` on the other end.

pub mod clock;
pub mod cong;
pub mod config;
pub mod err;
pub mod handshake;
pub mod inject;
pub mod packet;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod transport;

pub use clock::Clock;
pub use config::{AckMode, ReceiverConfig, SendMode, SenderConfig, WindowScheduleEntry};
pub use err::Error;
pub use inject::FaultInjector;
pub use packet::Packet;
pub use protocol::Protocol;
pub use receiver::ReceiverEngine;
pub use sender::{PacketSink, SenderEngine};
