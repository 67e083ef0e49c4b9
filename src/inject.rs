//! Deterministic fault injection, used by both engines so that checksum
//! and loss failure paths are reproducible in tests rather than relying
//! on real network misbehaviour.

use std::collections::HashSet;

/// Corrupts or drops selected sequence numbers on the way out. Never
/// influences state transitions, only what ends up on the wire.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    corrupt_seqs: HashSet<u32>,
    drop_seqs: HashSet<u32>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_corrupt(mut self, seqs: impl IntoIterator<Item = u32>) -> Self {
        self.corrupt_seqs.extend(seqs);
        self
    }

    pub fn with_drop(mut self, seqs: impl IntoIterator<Item = u32>) -> Self {
        self.drop_seqs.extend(seqs);
        self
    }

    pub fn should_corrupt(&self, seq: u32) -> bool {
        self.corrupt_seqs.contains(&seq)
    }

    pub fn should_drop(&self, seq: u32) -> bool {
        self.drop_seqs.contains(&seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_configured_seqs_independently() {
        let inj = FaultInjector::new().with_corrupt([3]).with_drop([4]);
        assert!(inj.should_corrupt(3));
        assert!(!inj.should_corrupt(4));
        assert!(inj.should_drop(4));
        assert!(!inj.should_drop(3));
    }
}
