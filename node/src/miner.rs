//! Background mining task (§4.5, §5).
//!
//! Drives `pod_core::assembler::BlockAssembler::run_round` on a fixed
//! interval. The puzzle inner loop is CPU-bound, so each round runs on a
//! blocking thread via `tokio::task::spawn_blocking`, matching §5's
//! "mining loop blocks only inside the puzzle inner loop" requirement;
//! the shared `mining_cancelled` flag lets shutdown interrupt a round in
//! progress rather than waiting for it to finish.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use pod_core::assembler::BlockAssembler;
use pod_core::error::Error;
use pod_core::ledger::{FileLedgerStore, LedgerStore};
use pod_core::ledger::{FileMempoolStore, MempoolStore};
use pod_core::peers::PeerStore;

use crate::rpc_client;
use crate::state::SharedState;

/// Minimum wait between mining rounds when the mempool is empty, so the
/// task does not spin hot polling an empty queue.
const IDLE_ROUND_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run(state: SharedState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    tracing::info!("mining task started");

    let mut last_corrupt_frames: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let round_state = state.clone();
        let round_started = Instant::now();
        let round = tokio::task::spawn_blocking(move || mine_one_round(&round_state)).await;

        match round {
            Ok(Ok(Some(block))) => {
                state.metrics.node.blocks_mined_total.inc();
                record_confirmation_metrics(&state, &block, round_started.elapsed());
                tracing::info!(index = block.index, hash = %block.hash, "sealed a new block");
                broadcast_block(&state, &block).await;
            }
            Ok(Ok(None)) => {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_ROUND_INTERVAL) => {}
                    _ = shutdown.changed() => break,
                }
                continue;
            }
            Ok(Err(Error::Exhausted)) => {
                tracing::warn!("mining round exhausted its attempt budget, retrying");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "mining round failed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "mining round task panicked");
            }
        }

        state
            .metrics
            .node
            .mempool_size
            .set(state.mempool.snapshot().len() as i64);
        sync_corrupt_frame_counter(&state, &mut last_corrupt_frames);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("mining task stopped");
}

/// Records this round's Proof-of-Diplomacy metrics: one
/// `pod_confirmations_total` increment per accepted confirmation, and the
/// round's average per-puzzle solve time as a `pod_puzzle_solve_seconds`
/// observation (the assembler is a pure library with no metrics
/// dependency of its own, per `SPEC_FULL.md` §9's one-way
/// assembler→pod dependency, so timing happens at this layer instead).
fn record_confirmation_metrics(
    state: &SharedState,
    block: &pod_core::types::block::Block,
    round_elapsed: Duration,
) {
    let confirmation_count = block.confirmations.len().max(1);
    state
        .metrics
        .node
        .pod_confirmations_total
        .with_label_values(&[state.validator_id.as_str()])
        .inc_by(block.confirmations.len() as u64);
    state
        .metrics
        .node
        .pod_puzzle_solve_seconds
        .observe(round_elapsed.as_secs_f64() / confirmation_count as f64);
}

/// Mirrors `state.ledger`'s cumulative corrupt-frame count into the
/// `ledger_corrupt_frames_total` counter. The counter only ever grows, so
/// this advances it by the delta since the last tick rather than setting
/// it outright.
fn sync_corrupt_frame_counter(state: &SharedState, last_seen: &mut u64) {
    let current = state.ledger.corrupt_frame_count();
    let delta = current.saturating_sub(*last_seen);
    if delta > 0 {
        state.metrics.node.ledger_corrupt_frames_total.inc_by(delta);
        *last_seen = current;
    }
}

fn mine_one_round(
    state: &SharedState,
) -> Result<Option<pod_core::types::block::Block>, Error> {
    run_round(
        &state.assembler,
        state.ledger.as_ref(),
        state.mempool.as_ref(),
        &state.validator_id,
        state.mining_cancelled.as_ref(),
    )
}

fn run_round(
    assembler: &BlockAssembler,
    ledger: &FileLedgerStore,
    mempool: &FileMempoolStore,
    validator_id: &str,
    cancelled: &std::sync::atomic::AtomicBool,
) -> Result<Option<pod_core::types::block::Block>, Error> {
    cancelled.store(false, Ordering::SeqCst);
    assembler.run_round(ledger, mempool, validator_id, cancelled)
}

async fn broadcast_block(state: &SharedState, block: &pod_core::types::block::Block) {
    let json = match serde_json::to_string(block) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode sealed block for broadcast");
            return;
        }
    };

    let peers = match state.peers.list() {
        Ok(peers) => peers,
        Err(e) => {
            tracing::warn!(error = %e, "failed to list peers for block broadcast");
            return;
        }
    };

    for peer in peers {
        let result = rpc_client::receive_block(
            &state.http_client,
            &peer.host,
            peer.port,
            &state.config.hmac.secret,
            &json,
        )
        .await;
        if let Err(e) = result {
            tracing::debug!(host = %peer.host, port = peer.port, error = %e, "block broadcast to peer failed");
        }
    }
}
