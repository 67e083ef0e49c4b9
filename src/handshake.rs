//! The three-field connection bring-up: protocol tag exchange followed by
//! an initial receive-window advertisement. Runs directly against any
//! `Read + Write` stream so it can be exercised against an in-memory pipe
//! in tests as easily as a real `TcpStream`.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};

use crate::err::Error;
use crate::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeResult {
    pub protocol: Protocol,
    pub rwnd: u32,
}

/// Sender side: offer a protocol tag, read back what the receiver agreed
/// to (it may have fallen back to SR on an unrecognised tag), then read
/// the initial window.
pub fn sender_handshake<S: Read + Write>(
    stream: &mut S,
    offered: Protocol,
) -> Result<HandshakeResult, Error> {
    stream.write_all(&offered.tag())?;

    let mut tag_buf = [0u8; 3];
    stream.read_exact(&mut tag_buf)?;
    let protocol = Protocol::from_tag(&tag_buf);

    let mut window_buf = [0u8; 4];
    stream.read_exact(&mut window_buf)?;
    let rwnd = BigEndian::read_u32(&window_buf);

    Ok(HandshakeResult { protocol, rwnd })
}

/// Receiver side: read the offered tag, fall back to SR if unrecognised,
/// echo the agreed tag, then advertise the initial window.
pub fn receiver_handshake<S: Read + Write>(
    stream: &mut S,
    initial_window: u32,
) -> Result<Protocol, Error> {
    let mut tag_buf = [0u8; 3];
    stream.read_exact(&mut tag_buf)?;
    let protocol = Protocol::from_tag(&tag_buf);

    stream.write_all(&protocol.tag())?;

    let mut window_buf = [0u8; 4];
    BigEndian::write_u32(&mut window_buf, initial_window);
    stream.write_all(&window_buf)?;

    Ok(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A trivial duplex pipe so both sides of the handshake can run
    /// against in-memory buffers without a real socket.
    struct Pipe {
        inbound: Cursor<Vec<u8>>,
        outbound: Vec<u8>,
    }

    impl Read for Pipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbound.read(buf)
        }
    }

    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbound.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn agrees_on_requested_protocol() {
        let mut receiver_side = Pipe {
            inbound: Cursor::new(b"GBN".to_vec()),
            outbound: Vec::new(),
        };
        let agreed = receiver_handshake(&mut receiver_side, 7).unwrap();
        assert_eq!(agreed, Protocol::GoBackN);
        assert_eq!(&receiver_side.outbound[0..3], b"GBN");
        assert_eq!(BigEndian::read_u32(&receiver_side.outbound[3..7]), 7);
    }

    #[test]
    fn unrecognised_tag_falls_back_to_selective_repeat() {
        let mut receiver_side = Pipe {
            inbound: Cursor::new(b"xyz".to_vec()),
            outbound: Vec::new(),
        };
        let agreed = receiver_handshake(&mut receiver_side, 3).unwrap();
        assert_eq!(agreed, Protocol::SelectiveRepeat);
        assert_eq!(&receiver_side.outbound[0..3], b"SR ");
    }

    #[test]
    fn sender_reads_back_agreed_protocol_and_window() {
        let mut reply = Vec::new();
        reply.extend_from_slice(b"SR ");
        reply.extend_from_slice(&12u32.to_be_bytes());
        let mut sender_side = Pipe {
            inbound: Cursor::new(reply),
            outbound: Vec::new(),
        };
        let result = sender_handshake(&mut sender_side, Protocol::GoBackN).unwrap();
        assert_eq!(&sender_side.outbound, b"GBN");
        assert_eq!(result.protocol, Protocol::SelectiveRepeat);
        assert_eq!(result.rwnd, 12);
    }
}
