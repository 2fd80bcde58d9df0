//! Shared application state for the HTTP server and background tasks.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use pod_core::assembler::{AssemblerConfig, BlockAssembler};
use pod_core::config::NodeConfig;
use pod_core::ledger::{FileLedgerStore, FileMempoolStore};
use pod_core::metrics::MetricsRegistry;
use pod_core::peers::SqlitePeerStore;
use pod_core::pod::ProofOfDiplomacy;

/// Shared state held by the HTTP handlers and every background task
/// (roaming, periodic-announce, mining).
///
/// Every store is its own internal-lock-guarded type (`FileLedgerStore`,
/// `FileMempoolStore`, `SqlitePeerStore`), matching the donor's
/// `Mutex<DefaultConsensusEngine>`-in-`AppState` pattern but pushed one
/// level down: each store already serializes its own writers (§4.2/§4.3/
/// §4.6), so `AppState` only needs to share `Arc`s, not re-wrap them in
/// another async mutex.
pub struct AppState {
    pub config: NodeConfig,
    pub ledger: Arc<FileLedgerStore>,
    pub mempool: Arc<FileMempoolStore>,
    pub peers: Arc<SqlitePeerStore>,
    pub pod: ProofOfDiplomacy,
    pub assembler: BlockAssembler,
    pub metrics: Arc<MetricsRegistry>,
    /// This node's own address identifier, used both as the PoD
    /// `validator` string for locally-mined confirmations and as the
    /// `address()` a `SignerIdentity` would report (§3).
    pub validator_id: String,
    /// Flips when the orchestrator requests shutdown; the mining task's
    /// puzzle inner loop polls this every `2^16` nonces (§5).
    pub mining_cancelled: Arc<AtomicBool>,
    /// Outbound HTTP client used by roaming, periodic-announce, and block
    /// broadcast to call other nodes' RPC endpoints.
    pub http_client: reqwest::Client,
}

/// Thread-safe alias for [`AppState`], passed to Axum handlers via the
/// `State` extractor and cloned into each spawned background task.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: NodeConfig,
        ledger: Arc<FileLedgerStore>,
        mempool: Arc<FileMempoolStore>,
        peers: Arc<SqlitePeerStore>,
        metrics: Arc<MetricsRegistry>,
        validator_id: String,
    ) -> Self {
        let pod = ProofOfDiplomacy::new(config.pod);
        let assembler = BlockAssembler::new(AssemblerConfig::default(), pod);
        Self {
            config,
            ledger,
            mempool,
            peers,
            pod,
            assembler,
            metrics,
            validator_id,
            mining_cancelled: Arc::new(AtomicBool::new(false)),
            http_client: reqwest::Client::new(),
        }
    }
}
