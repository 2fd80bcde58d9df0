//! Proof-of-Diplomacy: multi-confirmer hashcash consensus (§4.4).
//!
//! Grounded on the original `hashcash.py` `ProofOfDiplomacy` class for the
//! exact `N`/difficulty formulas and puzzle shape; restructured as a pure
//! library with no knowledge of the assembler that calls it, per the
//! cyclic-module-use resolution in `SPEC_FULL.md` §9.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use super::config::PodConfig;
use crate::error::{Error, Result};
use crate::hash::{leading_zero_bits, sha256_hex};
use crate::types::block::{Block, Confirmation};
use crate::types::tx::parse_microformat;

/// How many nonce attempts pass between cancellation checks in
/// [`ProofOfDiplomacy::solve_puzzle`] (§5: "every fixed attempt count").
const CANCELLATION_CHECK_INTERVAL: u64 = 1 << 16;

/// The Proof-of-Diplomacy engine: a pure function library over block ids
/// and confirmer identities. It never touches the ledger or mempool.
#[derive(Clone, Copy, Debug)]
pub struct ProofOfDiplomacy {
    pub config: PodConfig,
}

impl ProofOfDiplomacy {
    pub fn new(config: PodConfig) -> Self {
        Self { config }
    }

    /// `N = max(3, floor(k * block_size_bytes / total_amount))`, with
    /// `total_amount` coerced to 1 if zero or negative (§4.4, §8 boundary
    /// behavior: `total_amount = 0 => N = max(3, k * size / 1)`).
    pub fn calculate_n(&self, block_size_bytes: usize, total_amount: Decimal) -> u64 {
        let amount = if total_amount <= Decimal::ZERO {
            Decimal::ONE
        } else {
            total_amount
        };
        let size = Decimal::from(block_size_bytes as u64);
        let k = Decimal::from(self.config.k);
        let n = (k * size / amount).floor();
        let n: u64 = n.try_into().unwrap_or(u64::MAX);
        n.max(self.config.min_confirmations)
    }

    /// Per-confirmer difficulty: `base_difficulty + difficulty_step * c`,
    /// where `c` is the number of confirmations `validator` already
    /// contributed to `block`.
    pub fn calculate_difficulty(&self, block: &Block, validator: &str) -> u32 {
        let count = block.confirmation_count_by(validator) as u32;
        self.config.base_difficulty + self.config.difficulty_step * count
    }

    /// Solves the hashcash puzzle for `block_hash`/`validator`/`difficulty`:
    /// scans `nonce` upward, refreshing `timestamp_ms` each attempt, until a
    /// `(nonce, hash, timestamp_ms)` triple has `>= difficulty` leading zero
    /// bits. Checks `cancelled` every [`CANCELLATION_CHECK_INTERVAL`]
    /// attempts and returns early if it was set. Returns `Exhausted` if
    /// `max_tries` is reached with no solution.
    pub fn solve_puzzle(
        &self,
        block_hash: &str,
        validator: &str,
        difficulty: u32,
        cancelled: &AtomicBool,
    ) -> Result<Confirmation> {
        let mut nonce: u64 = 0;
        while nonce < self.config.max_tries {
            if nonce % CANCELLATION_CHECK_INTERVAL == 0 && cancelled.load(Ordering::Relaxed) {
                return Err(Error::Exhausted);
            }

            let timestamp_ms = current_unix_millis();
            let preimage = format!("{block_hash}:{validator}:{nonce}:{difficulty}:{timestamp_ms}");
            let digest = sha256_hex(preimage.as_bytes());

            if leading_zero_bits(&digest) >= difficulty {
                return Ok(Confirmation {
                    validator: validator.to_string(),
                    nonce,
                    difficulty,
                    timestamp_ms,
                    hash: digest,
                });
            }

            nonce += 1;
        }
        Err(Error::Exhausted)
    }

    /// Verifies a single confirmation: recomputes the pre-image hash and
    /// checks both equality with the claimed `hash` and that it meets its
    /// claimed `difficulty`.
    pub fn verify_confirmation(&self, block_hash: &str, conf: &Confirmation) -> bool {
        let expected = Confirmation::recompute_hash(
            block_hash,
            &conf.validator,
            conf.nonce,
            conf.difficulty,
            conf.timestamp_ms,
        );
        expected == conf.hash && leading_zero_bits(&conf.hash) >= conf.difficulty
    }

    /// Computes `total_amount` by summing `money.amount` across every
    /// transaction's microformat (§4.4, §9: canonical field, never
    /// substring extraction).
    pub fn total_amount(&self, block: &Block) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for tx in &block.transactions {
            let fields = parse_microformat(&tx.mc)?;
            total += fields.money.amount;
        }
        Ok(total)
    }

    /// Computes `N_required` for `block` from its current transaction set.
    pub fn required_confirmations(&self, block: &Block) -> Result<u64> {
        let size = block.size_bytes()?;
        let total = self.total_amount(block)?;
        Ok(self.calculate_n(size, total))
    }

    /// Full finality check (§4.4): enough confirmations, each individually
    /// valid, strictly timestamp-ordered, and no duplicate `(validator,
    /// nonce)` pairs. Returns `(is_final, n_required)`.
    pub fn check_block_status(&self, block: &Block) -> Result<(bool, u64)> {
        let n_required = self.required_confirmations(block)?;

        let mut seen = std::collections::HashSet::new();
        let mut last_timestamp: Option<i64> = None;
        for conf in &block.confirmations {
            if !self.verify_confirmation(&block.hash, conf) {
                return Err(Error::PodInvalid(format!(
                    "confirmation by {} failed verification",
                    conf.validator
                )));
            }
            if let Some(prev) = last_timestamp {
                if conf.timestamp_ms <= prev {
                    return Err(Error::PodInvalid(
                        "confirmations are not strictly ordered by timestamp".to_string(),
                    ));
                }
            }
            last_timestamp = Some(conf.timestamp_ms);

            if !seen.insert((conf.validator.clone(), conf.nonce)) {
                return Err(Error::PodInvalid(format!(
                    "duplicate (validator, nonce) pair: ({}, {})",
                    conf.validator, conf.nonce
                )));
            }
        }

        Ok((block.confirmations.len() as u64 >= n_required, n_required))
    }
}

fn current_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::Xmif;
    use rust_decimal_macros::dec;

    fn engine() -> ProofOfDiplomacy {
        ProofOfDiplomacy::new(PodConfig::default())
    }

    fn dummy_xmif(amount: &str) -> Xmif {
        let money = format!(r#"{{"amount":"{amount}","currency":"NGN","owner":"000000000001"}}"#);
        let mc = format!("000000000001|000000000002|{money}|27/07/2026, 10:00:00|0.0001");
        Xmif {
            mc,
            signature: vec![1, 2, 3],
        }
    }

    #[test]
    fn calculate_n_respects_minimum_of_three() {
        let e = engine();
        // Tiny size, huge amount => formula would round down to 0.
        assert_eq!(e.calculate_n(1, dec!(1_000_000)), 3);
    }

    #[test]
    fn calculate_n_zero_amount_is_coerced_to_one() {
        let e = engine();
        let n_zero = e.calculate_n(1000, Decimal::ZERO);
        let n_one = e.calculate_n(1000, Decimal::ONE);
        assert_eq!(n_zero, n_one);
    }

    #[test]
    fn calculate_difficulty_escalates_by_step_per_repeat() {
        let e = engine();
        let txs = vec![dummy_xmif("1000")];
        let mut block = Block::assemble(1, Block::genesis_prev_hash(), txs).unwrap();

        assert_eq!(e.calculate_difficulty(&block, "validator-a"), 16);

        block.confirmations.push(Confirmation {
            validator: "validator-a".to_string(),
            nonce: 0,
            difficulty: 16,
            timestamp_ms: 1,
            hash: "f".repeat(64),
        });
        assert_eq!(e.calculate_difficulty(&block, "validator-a"), 20);
        assert_eq!(e.calculate_difficulty(&block, "validator-b"), 16);
    }

    #[test]
    fn solve_and_verify_round_trip() {
        let e = ProofOfDiplomacy::new(PodConfig {
            base_difficulty: 4,
            ..PodConfig::default()
        });
        let cancelled = AtomicBool::new(false);
        let conf = e
            .solve_puzzle("block-hash", "validator-a", 4, &cancelled)
            .expect("should find a low-difficulty solution quickly");
        assert!(e.verify_confirmation("block-hash", &conf));
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let e = ProofOfDiplomacy::new(PodConfig {
            base_difficulty: 1,
            ..PodConfig::default()
        });
        let cancelled = AtomicBool::new(false);
        let mut conf = e
            .solve_puzzle("block-hash", "validator-a", 1, &cancelled)
            .unwrap();
        conf.nonce += 1;
        assert!(!e.verify_confirmation("block-hash", &conf));
    }

    #[test]
    fn solve_puzzle_honors_cancellation() {
        let e = ProofOfDiplomacy::new(PodConfig {
            base_difficulty: 255,
            max_tries: u64::MAX,
            ..PodConfig::default()
        });
        let cancelled = AtomicBool::new(true);
        let err = e
            .solve_puzzle("block-hash", "validator-a", 255, &cancelled)
            .unwrap_err();
        assert!(matches!(err, Error::Exhausted));
    }

    #[test]
    fn check_block_status_detects_duplicate_nonce() {
        let e = engine();
        let txs = vec![dummy_xmif("1000")];
        let mut block = Block::assemble(1, Block::genesis_prev_hash(), txs).unwrap();
        let dup = Confirmation {
            validator: "validator-a".to_string(),
            nonce: 0,
            difficulty: 0,
            timestamp_ms: 1,
            hash: Confirmation::recompute_hash(&block.hash, "validator-a", 0, 0, 1),
        };
        let dup2 = Confirmation {
            timestamp_ms: 2,
            hash: Confirmation::recompute_hash(&block.hash, "validator-a", 0, 0, 2),
            ..dup.clone()
        };
        block.confirmations.push(dup);
        block.confirmations.push(dup2);
        let err = e.check_block_status(&block).unwrap_err();
        assert!(matches!(err, Error::PodInvalid(_)));
    }

    #[test]
    fn check_block_status_detects_out_of_order_timestamps() {
        let e = engine();
        let txs = vec![dummy_xmif("1000")];
        let mut block = Block::assemble(1, Block::genesis_prev_hash(), txs).unwrap();
        let c1 = Confirmation {
            validator: "validator-a".to_string(),
            nonce: 0,
            difficulty: 0,
            timestamp_ms: 5,
            hash: Confirmation::recompute_hash(&block.hash, "validator-a", 0, 0, 5),
        };
        let c2 = Confirmation {
            validator: "validator-b".to_string(),
            nonce: 0,
            difficulty: 0,
            timestamp_ms: 4,
            hash: Confirmation::recompute_hash(&block.hash, "validator-b", 0, 0, 4),
        };
        block.confirmations.push(c1);
        block.confirmations.push(c2);
        let err = e.check_block_status(&block).unwrap_err();
        assert!(matches!(err, Error::PodInvalid(_)));
    }
}
