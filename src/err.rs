#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("frame shorter than the 7 byte header")]
    MalformedFrame,

    #[error("checksum mismatch for seq {0}")]
    ChecksumMismatch(u32),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("I/O error: {0}")]
    TransportError(#[from] std::io::Error),

    #[error("retransmission ceiling reached for seq {0}")]
    RetransmissionCeiling(u32),
}
