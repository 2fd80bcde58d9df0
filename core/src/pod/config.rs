//! Tunable parameters for the Proof-of-Diplomacy engine.

/// PoD tuning parameters (§4.4).
///
/// `k` and `base_difficulty` mirror the donor workspace's small
/// `Config`-struct-with-`Default` convention (`consensus::ConsensusConfig`).
#[derive(Clone, Copy, Debug)]
pub struct PodConfig {
    /// Units: titan·seconds/byte, documentation only — see glossary.
    pub k: u64,
    /// Base difficulty in leading zero bits for a confirmer's first
    /// confirmation on a block.
    pub base_difficulty: u32,
    /// Difficulty increase, in bits, per prior confirmation by the same
    /// validator on the same block.
    pub difficulty_step: u32,
    /// Minimum required confirmations regardless of size/value.
    pub min_confirmations: u64,
    /// Attempt cap for a single puzzle solve before giving up as `Exhausted`.
    pub max_tries: u64,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            k: 40,
            base_difficulty: 16,
            difficulty_step: 4,
            min_confirmations: 3,
            max_tries: 10_000_000,
        }
    }
}
