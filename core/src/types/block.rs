//! Block and confirmation records.

use serde::{Deserialize, Serialize};

use super::Hash256;
use super::canonical::canonical_json_seq;
use super::tx::Xmif;
use crate::hash::sha256_hex;

/// One confirmer's hashcash solution over a block id.
///
/// Invariant (§3, §4.4): `sha256("{block.hash}:{validator}:{nonce}:{difficulty}:{timestamp_ms}")`
/// equals `hash` and has at least `difficulty` leading zero bits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub validator: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub timestamp_ms: i64,
    pub hash: String,
}

impl Confirmation {
    /// Recomputes the pre-image hash this confirmation claims to have
    /// produced, independent of whether it was ever a valid solution.
    pub fn recompute_hash(
        block_hash: &str,
        validator: &str,
        nonce: u64,
        difficulty: u32,
        timestamp_ms: i64,
    ) -> String {
        let preimage = format!("{block_hash}:{validator}:{nonce}:{difficulty}:{timestamp_ms}");
        sha256_hex(preimage.as_bytes())
    }
}

/// A sealed or in-progress block.
///
/// Fields and invariants are as specified in `SPEC_FULL.md` §3: `index` is
/// strictly monotonic starting at 1, `prev_hash` chains to the previous
/// block's `hash` (or the all-zero sentinel at genesis), `transactions`
/// order is fixed at assembly time, `merkle_root`/`hash` are computed once
/// and never change, and `confirmations` grows during mining only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub prev_hash: String,
    pub transactions: Vec<Xmif>,
    pub merkle_root: String,
    pub hash: String,
    pub confirmations: Vec<Confirmation>,
}

impl Block {
    /// Computes the canonical JSON serialization of `transactions`, used
    /// both as the `merkle_root` pre-image and as the block-size input to
    /// the PoD engine's `N` calculation.
    pub fn canonical_transactions_json(
        transactions: &[Xmif],
    ) -> Result<String, serde_json::Error> {
        canonical_json_seq(transactions)
    }

    /// Computes `merkle_root` (a flat hash, not a tree — see glossary) from
    /// the canonical JSON encoding of `transactions`.
    pub fn compute_merkle_root(transactions: &[Xmif]) -> Result<String, serde_json::Error> {
        let canon = Self::canonical_transactions_json(transactions)?;
        Ok(sha256_hex(canon.as_bytes()))
    }

    /// Computes the block id: `sha256(prev_hash ":" merkle_root ":" index)`.
    pub fn compute_hash(prev_hash: &str, merkle_root: &str, index: u64) -> String {
        let preimage = format!("{prev_hash}:{merkle_root}:{index}");
        sha256_hex(preimage.as_bytes())
    }

    /// Assembles a new block from already-ordered transactions, computing
    /// `merkle_root` and `hash` and starting with no confirmations.
    pub fn assemble(
        index: u64,
        prev_hash: String,
        transactions: Vec<Xmif>,
    ) -> Result<Self, serde_json::Error> {
        let merkle_root = Self::compute_merkle_root(&transactions)?;
        let hash = Self::compute_hash(&prev_hash, &merkle_root, index);
        Ok(Block {
            index,
            prev_hash,
            transactions,
            merkle_root,
            hash,
            confirmations: Vec::new(),
        })
    }

    /// Returns the genesis `prev_hash` sentinel: 64 zero hex digits.
    pub fn genesis_prev_hash() -> String {
        Hash256::zero_hex()
    }

    /// Number of prior confirmations this block already has from `validator`.
    pub fn confirmation_count_by(&self, validator: &str) -> usize {
        self.confirmations
            .iter()
            .filter(|c| c.validator == validator)
            .count()
    }

    /// Size in bytes of the canonical JSON encoding of this block's
    /// transactions, the `block_size_bytes` input to PoD's `N` calculation.
    pub fn size_bytes(&self) -> Result<usize, serde_json::Error> {
        Ok(Self::canonical_transactions_json(&self.transactions)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_xmif(mc: &str) -> Xmif {
        Xmif {
            mc: mc.to_string(),
            signature: vec![1, 2, 3],
        }
    }

    #[test]
    fn assembling_genesis_block_uses_zero_prev_hash() {
        let txs = vec![dummy_xmif("a|b|c|d|e")];
        let block = Block::assemble(1, Block::genesis_prev_hash(), txs).unwrap();
        assert_eq!(block.prev_hash, "0".repeat(64));
        assert_eq!(block.index, 1);
        assert!(block.confirmations.is_empty());
    }

    #[test]
    fn hash_is_deterministic_given_same_inputs() {
        let txs = vec![dummy_xmif("a|b|c|d|e")];
        let b1 = Block::assemble(1, Block::genesis_prev_hash(), txs.clone()).unwrap();
        let b2 = Block::assemble(1, Block::genesis_prev_hash(), txs).unwrap();
        assert_eq!(b1.hash, b2.hash);
        assert_eq!(b1.merkle_root, b2.merkle_root);
    }

    #[test]
    fn hash_changes_when_transaction_order_changes() {
        let txs_a = vec![dummy_xmif("a|b|c|d|e"), dummy_xmif("f|g|h|i|j")];
        let txs_b = vec![dummy_xmif("f|g|h|i|j"), dummy_xmif("a|b|c|d|e")];
        let b1 = Block::assemble(1, Block::genesis_prev_hash(), txs_a).unwrap();
        let b2 = Block::assemble(1, Block::genesis_prev_hash(), txs_b).unwrap();
        assert_ne!(b1.merkle_root, b2.merkle_root);
    }

    #[test]
    fn confirmation_count_by_validator_is_zero_initially() {
        let block = Block::assemble(1, Block::genesis_prev_hash(), vec![]).unwrap();
        assert_eq!(block.confirmation_count_by("validator-a"), 0);
    }

    #[test]
    fn confirmation_recompute_hash_matches_manual_preimage() {
        let got = Confirmation::recompute_hash("blockhash", "validator-a", 7, 16, 1234);
        let expected = sha256_hex(b"blockhash:validator-a:7:16:1234");
        assert_eq!(got, expected);
    }
}
