//! Block assembler: mining-loop orchestration (§4.5).
//!
//! Mirrors the donor workspace's `Proposer` (`build_block`) and
//! `ConsensusEngine::propose_block`/`import_block` pair, collapsed into a
//! single step: Proof-of-Diplomacy blocks are sealed atomically by the one
//! local assembler, with no fork-choice decision to make afterwards.

use std::sync::atomic::AtomicBool;

use crate::error::{Error, Result};
use crate::ledger::{LedgerStore, MempoolStore};
use crate::pod::ProofOfDiplomacy;
use crate::types::block::Block;
use crate::types::tx::Xmif;

/// Tunables for [`BlockAssembler`], mirroring the donor's
/// `Proposer::{max_block_txs, max_block_size_bytes, allow_empty_blocks}`
/// trio.
#[derive(Clone, Debug)]
pub struct AssemblerConfig {
    pub max_block_txs: usize,
    pub allow_empty_blocks: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_block_txs: 500,
            allow_empty_blocks: false,
        }
    }
}

/// Drives one full mining round: snapshot mempool, assemble a candidate
/// block, solve confirmations as the local validator until `N_required` is
/// met, append to the ledger, and drain the mempool.
pub struct BlockAssembler {
    config: AssemblerConfig,
    pod: ProofOfDiplomacy,
}

impl BlockAssembler {
    pub fn new(config: AssemblerConfig, pod: ProofOfDiplomacy) -> Self {
        Self { config, pod }
    }

    /// Runs one mining round against `ledger`/`mempool` as `validator_id`.
    ///
    /// Returns `Ok(None)` if the mempool was empty and empty blocks are
    /// disallowed. Returns `Ok(Some(block))` with the sealed, appended block
    /// otherwise. On `Error::Exhausted` from the confirmation loop, the
    /// candidate's transactions are left untouched in the mempool (they
    /// were only snapshotted, never drained) so the next round retries them.
    pub fn run_round(
        &self,
        ledger: &dyn LedgerStore,
        mempool: &dyn MempoolStore,
        validator_id: &str,
        cancelled: &AtomicBool,
    ) -> Result<Option<Block>> {
        let mut pending = mempool.snapshot();
        if pending.is_empty() && !self.config.allow_empty_blocks {
            return Ok(None);
        }
        if pending.len() > self.config.max_block_txs {
            pending.truncate(self.config.max_block_txs);
        }

        let next_index = ledger.tail().map(|b| b.index + 1).unwrap_or(1);
        let prev_hash = ledger
            .tail()
            .map(|b| b.hash)
            .unwrap_or_else(Block::genesis_prev_hash);

        let mut block = Block::assemble(next_index, prev_hash, pending)?;
        self.confirm_until_final(&mut block, validator_id, cancelled)?;

        ledger.append(&block)?;
        mempool.drain()?;

        Ok(Some(block))
    }

    /// Loops solving puzzles as `validator_id`, at that validator's
    /// escalating per-confirmation difficulty, until `N_required` is met.
    fn confirm_until_final(
        &self,
        block: &mut Block,
        validator_id: &str,
        cancelled: &AtomicBool,
    ) -> Result<()> {
        loop {
            let (is_final, n_required) = self.pod.check_block_status(block)?;
            if is_final {
                return Ok(());
            }
            if block.confirmations.len() as u64 >= n_required * 4 {
                // A confirmer that cannot keep pace should not spin forever;
                // this is a defensive multiple of n_required, not a spec
                // constant.
                return Err(Error::Exhausted);
            }

            let difficulty = self.pod.calculate_difficulty(block, validator_id);
            let confirmation =
                self.pod
                    .solve_puzzle(&block.hash, validator_id, difficulty, cancelled)?;
            block.confirmations.push(confirmation);
        }
    }

    /// Convenience accessor for callers that need to report `N_required`
    /// for a candidate before it's been confirmed at all (e.g. a `/status`
    /// style diagnostic).
    pub fn pending_n_required(&self, transactions: &[Xmif], index: u64, prev_hash: String) -> Result<u64> {
        let block = Block::assemble(index, prev_hash, transactions.to_vec())?;
        self.pod.required_confirmations(&block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FileLedgerStore, FileMempoolStore, LedgerConfig, MempoolConfig};
    use crate::pod::PodConfig;
    use tempfile::tempdir;

    fn valid_xmif(n: u32) -> Xmif {
        let mc = format!(
            "00000000000{n}|000000000002|{{\"amount\":\"10\",\"currency\":\"NGN\",\"owner\":\"000000000001\"}}|27/07/2026, 10:00:00|0.0001"
        );
        Xmif {
            mc,
            signature: vec![1, 2, 3],
        }
    }

    fn low_difficulty_assembler() -> BlockAssembler {
        let pod = ProofOfDiplomacy::new(PodConfig {
            base_difficulty: 1,
            difficulty_step: 1,
            min_confirmations: 2,
            ..PodConfig::default()
        });
        BlockAssembler::new(AssemblerConfig::default(), pod)
    }

    #[test]
    fn run_round_returns_none_on_empty_mempool_by_default() {
        let dir = tempdir().unwrap();
        let ledger = FileLedgerStore::open(&LedgerConfig {
            path: dir.path().join("ledger.data"),
        })
        .unwrap();
        let mempool = FileMempoolStore::open(&MempoolConfig {
            path: dir.path().join("mempool.bin"),
        })
        .unwrap();
        let assembler = low_difficulty_assembler();
        let cancelled = AtomicBool::new(false);

        let result = assembler
            .run_round(&ledger, &mempool, "validator-a", &cancelled)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn run_round_seals_and_appends_a_block() {
        let dir = tempdir().unwrap();
        let ledger = FileLedgerStore::open(&LedgerConfig {
            path: dir.path().join("ledger.data"),
        })
        .unwrap();
        let mempool = FileMempoolStore::open(&MempoolConfig {
            path: dir.path().join("mempool.bin"),
        })
        .unwrap();
        mempool.store(valid_xmif(1)).unwrap();

        let assembler = low_difficulty_assembler();
        let cancelled = AtomicBool::new(false);

        let block = assembler
            .run_round(&ledger, &mempool, "validator-a", &cancelled)
            .unwrap()
            .expect("non-empty mempool should seal a block");

        assert_eq!(block.index, 1);
        assert!(block.confirmations.len() >= 2);
        assert_eq!(ledger.tail().unwrap().hash, block.hash);
        assert!(mempool.snapshot().is_empty());
    }

    #[test]
    fn second_round_chains_onto_the_first() {
        let dir = tempdir().unwrap();
        let ledger = FileLedgerStore::open(&LedgerConfig {
            path: dir.path().join("ledger.data"),
        })
        .unwrap();
        let mempool = FileMempoolStore::open(&MempoolConfig {
            path: dir.path().join("mempool.bin"),
        })
        .unwrap();
        let assembler = low_difficulty_assembler();
        let cancelled = AtomicBool::new(false);

        mempool.store(valid_xmif(1)).unwrap();
        let first = assembler
            .run_round(&ledger, &mempool, "validator-a", &cancelled)
            .unwrap()
            .unwrap();

        mempool.store(valid_xmif(2)).unwrap();
        let second = assembler
            .run_round(&ledger, &mempool, "validator-a", &cancelled)
            .unwrap()
            .unwrap();

        assert_eq!(second.index, 2);
        assert_eq!(second.prev_hash, first.hash);
    }
}
