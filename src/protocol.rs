use std::fmt;

/// Retransmission discipline negotiated during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    GoBackN,
    SelectiveRepeat,
}

impl Protocol {
    /// The 3 byte ASCII tag exchanged on the wire: `"GBN"` or `"SR "`.
    pub fn tag(self) -> [u8; 3] {
        match self {
            Protocol::GoBackN => *b"GBN",
            Protocol::SelectiveRepeat => *b"SR ",
        }
    }

    /// Parses a received tag, trimming whitespace. Anything that isn't
    /// recognised falls back to Selective Repeat per the handshake rules.
    pub fn from_tag(tag: &[u8]) -> Protocol {
        match std::str::from_utf8(tag).map(str::trim) {
            Ok("GBN") => Protocol::GoBackN,
            Ok("SR") => Protocol::SelectiveRepeat,
            _ => Protocol::SelectiveRepeat,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::GoBackN => write!(f, "GBN"),
            Protocol::SelectiveRepeat => write!(f, "SR"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GBN" => Ok(Protocol::GoBackN),
            "SR" => Ok(Protocol::SelectiveRepeat),
            other => Err(format!("unknown protocol {other:?}, expected GBN or SR")),
        }
    }
}
