//! Wire format: a 7 byte prefix (seq, flags, checksum) followed by an
//! opaque payload. See RFC-less framing in the module docs of [`crate`].

use byteorder::{BigEndian, ByteOrder};

use crate::err::Error;

pub const HEADER_LEN: usize = 7;

pub const FLAG_ACK: u8 = 0b01;
pub const FLAG_NAK: u8 = 0b10;

/// A single framed unit: DATA when neither flag is set, otherwise ACK or NAK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq: u32,
    pub flags: u8,
    pub checksum: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn is_ack(&self) -> bool {
        self.flags & FLAG_ACK != 0
    }

    pub fn is_nak(&self) -> bool {
        self.flags & FLAG_NAK != 0
    }

    pub fn is_data(&self) -> bool {
        !self.is_ack() && !self.is_nak()
    }

    pub fn data(seq: u32, payload: Vec<u8>) -> Self {
        Packet {
            seq,
            flags: 0,
            checksum: checksum(&payload),
            payload,
        }
    }

    pub fn ack(seq: u32, payload: Vec<u8>) -> Self {
        Packet {
            seq,
            flags: FLAG_ACK,
            checksum: checksum(&payload),
            payload,
        }
    }

    pub fn nak(seq: u32, payload: Vec<u8>) -> Self {
        Packet {
            seq,
            flags: FLAG_NAK,
            checksum: checksum(&payload),
            payload,
        }
    }

    /// Replaces the checksum with its bitwise complement, leaving the
    /// payload untouched. Used by the error-injection hooks.
    pub fn corrupt(mut self) -> Self {
        self.checksum = !self.checksum;
        self
    }

    /// `true` if the stored checksum matches the payload as received.
    pub fn checksum_ok(&self) -> bool {
        self.checksum == checksum(&self.payload)
    }

    /// Decodes the current receive-window advertisement carried in an
    /// ACK/NAK payload, if present (first 4 bytes, big-endian).
    pub fn window_advertisement(&self) -> Option<u32> {
        if self.payload.len() >= 4 {
            Some(BigEndian::read_u32(&self.payload[..4]))
        } else {
            None
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        let mut prefix = [0u8; HEADER_LEN];
        BigEndian::write_u32(&mut prefix[0..4], self.seq);
        prefix[4] = self.flags;
        BigEndian::write_u16(&mut prefix[5..7], self.checksum);
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::MalformedFrame);
        }
        let seq = BigEndian::read_u32(&buf[0..4]);
        let flags = buf[4];
        let checksum = BigEndian::read_u16(&buf[5..7]);
        let payload = buf[HEADER_LEN..].to_vec();
        Ok(Packet {
            seq,
            flags,
            checksum,
            payload,
        })
    }
}

/// Sum of payload bytes modulo 2^16.
pub fn checksum(payload: &[u8]) -> u16 {
    let sum: u32 = payload.iter().map(|&b| b as u32).sum();
    (sum & 0xFFFF) as u16
}

/// Encodes a 4 byte big-endian window advertisement suitable for use as
/// an ACK/NAK payload.
pub fn encode_window(window: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 4];
    BigEndian::write_u32(&mut buf, window);
    buf
}
