//! Owns the real socket. Wraps each encoded `Packet` with a 4-byte
//! big-endian length prefix so that TCP's stream semantics never blur two
//! frames together, then drives an engine's send/receive/timeout loop
//! against it. This is the only module that touches actual I/O — the
//! engines themselves only ever see `Packet` values.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};

use crate::err::Error;
use crate::packet::Packet;
use crate::receiver::ReceiverEngine;
use crate::sender::{PacketSink, SenderEngine};

/// Read calls block at most this long, so the poll loop stays responsive
/// to expiring retransmission timers even while waiting on the peer.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Sleep between iterations once there's nothing to send or read, so the
/// loop doesn't busy-spin.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn write_frame<W: Write>(stream: &mut W, pkt: &Packet) -> Result<(), Error> {
    let body = pkt.encode();
    let mut len_buf = [0u8; 4];
    BigEndian::write_u32(&mut len_buf, body.len() as u32);
    stream.write_all(&len_buf)?;
    stream.write_all(&body)?;
    Ok(())
}

fn read_exact_or_close<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<(), Error> {
    stream.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::PeerClosed
        } else {
            Error::TransportError(e)
        }
    })
}

pub fn read_frame<R: Read>(stream: &mut R) -> Result<Packet, Error> {
    let mut len_buf = [0u8; 4];
    read_exact_or_close(stream, &mut len_buf)?;
    let len = BigEndian::read_u32(&len_buf) as usize;
    let mut body = vec![0u8; len];
    read_exact_or_close(stream, &mut body)?;
    Packet::decode(&body)
}

/// Adapts any `Write` into a `PacketSink` that applies the length-prefix
/// wrapper, so engines can be driven against a real socket without
/// knowing about framing.
pub struct FramedWriter<'a, W: Write>(pub &'a mut W);

impl<W: Write> PacketSink for FramedWriter<'_, W> {
    fn send(&mut self, pkt: &Packet) -> Result<(), Error> {
        write_frame(self.0, pkt)
    }
}

fn is_timeout(err: &Error) -> bool {
    matches!(
        err,
        Error::TransportError(e)
            if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut
    )
}

/// Runs a sender engine to completion over a connected stream. Returns
/// the finished engine so callers can inspect final state (useful in
/// integration-style tests and for logging a summary).
pub fn run_sender_session(stream: &TcpStream, mut engine: SenderEngine) -> Result<SenderEngine, Error> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = stream.try_clone()?;

    while !engine.is_done() {
        {
            let mut sink = FramedWriter(&mut writer);
            engine.fill_window(&mut sink)?;
            engine.on_tick(&mut sink)?;
        }

        match read_frame(&mut reader) {
            Ok(pkt) => {
                trace!("sender: received frame for seq {}", pkt.seq);
                let mut sink = FramedWriter(&mut writer);
                engine.handle_incoming(&pkt, &mut sink)?;
            }
            Err(e) if is_timeout(&e) => {}
            Err(Error::MalformedFrame) => {}
            Err(Error::PeerClosed) => break,
            Err(e) => return Err(e),
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    debug!("sender: session finished, base={}", engine.base());
    Ok(engine)
}

/// Runs a receiver engine against one accepted connection until the peer
/// closes it. `processing_delay`, when set, simulates a slow receiver by
/// sleeping before each inbound packet is handed to the engine; it is
/// purely a wire-timing effect and never alters engine state transitions.
pub fn run_receiver_session(
    stream: &TcpStream,
    mut engine: ReceiverEngine,
    processing_delay: Option<Duration>,
) -> Result<ReceiverEngine, Error> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = stream.try_clone()?;

    loop {
        match read_frame(&mut reader) {
            Ok(pkt) => {
                if let Some(delay) = processing_delay {
                    std::thread::sleep(delay);
                }
                let mut sink = FramedWriter(&mut writer);
                engine.on_data(&pkt, &mut sink)?;
            }
            Err(e) if is_timeout(&e) => {}
            Err(Error::MalformedFrame) => {}
            Err(Error::PeerClosed) => break,
            Err(e) => return Err(e),
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    debug!("receiver: session ended, delivered {} packets", engine.delivered().len());
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_length_prefix() {
        let pkt = Packet::data(9, b"Pacote 9".to_vec());
        let mut buf = Vec::new();
        write_frame(&mut buf, &pkt).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn two_frames_back_to_back_stay_delimited() {
        let a = Packet::ack(1, Vec::new());
        let b = Packet::data(2, b"Pacote 2".to_vec());
        let mut buf = Vec::new();
        write_frame(&mut buf, &a).unwrap();
        write_frame(&mut buf, &b).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), a);
        assert_eq!(read_frame(&mut cursor).unwrap(), b);
    }
}
