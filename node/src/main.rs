// pod-node/src/main.rs

//! Proof-of-Diplomacy node binary.
//!
//! Exposes a single XML-RPC dispatch route (`POST /`, §4.8/§6), and runs
//! three supervised background tasks alongside the HTTP server: roaming
//! discovery, periodic re-announce, and the mining loop (§4.9, §4.10).

mod config;
mod miner;
mod roaming;
mod routes;
mod rpc_client;
mod state;
mod xmlrpc;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::post};

use pod_core::hash::sha256_hex;
use pod_core::ledger::{FileLedgerStore, FileMempoolStore, LedgerConfig, MempoolConfig};
use pod_core::metrics::{MetricsRegistry, run_prometheus_http_server};
use pod_core::peers::SqlitePeerStore;

use state::{AppState, SharedState};

/// Bounded grace period background tasks get to wind down after shutdown
/// is signalled, before the orchestrator gives up waiting on them (§4.10:
/// "join workers with a bounded grace period").
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pod_node=info,pod_core=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = config::load();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if config.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = config.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Durable stores
    // ---------------------------

    let ledger = Arc::new(
        FileLedgerStore::open(&LedgerConfig {
            path: config.ledger.ledger_path.clone(),
        })
        .map_err(|e| format!("failed to open ledger store: {e}"))?,
    );
    let mempool = Arc::new(
        FileMempoolStore::open(&MempoolConfig {
            path: config.ledger.mempool_path.clone(),
        })
        .map_err(|e| format!("failed to open mempool store: {e}"))?,
    );
    let peers = Arc::new(
        SqlitePeerStore::open(&config.peers.db_path)
            .map_err(|e| format!("failed to open peer store: {e}"))?,
    );

    // ---------------------------
    // Validator identity
    // ---------------------------

    // A real deployment derives this from an account's signing key
    // (`SignerIdentity::address`, §3); absent a live signer this node
    // identifies itself, stably, by its own advertised address.
    let validator_id = sha256_hex(format!("{}:{}", config.host, config.port).as_bytes());

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState::new(
        config.clone(),
        ledger,
        mempool,
        peers,
        metrics,
        validator_id,
    ));

    // ---------------------------
    // Shutdown signal
    // ---------------------------

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // ---------------------------
    // Background tasks
    // ---------------------------

    let roam_state = app_state.clone();
    let roam_rx = shutdown_rx.clone();
    let roam_handle = tokio::spawn(async move { roaming::roam_discovery(roam_state, roam_rx).await });

    let announce_state = app_state.clone();
    let announce_rx = shutdown_rx.clone();
    let announce_handle =
        tokio::spawn(async move { roaming::periodic_announce(announce_state, announce_rx).await });

    let miner_state = app_state.clone();
    let miner_rx = shutdown_rx.clone();
    let miner_handle = tokio::spawn(async move { miner::run(miner_state, miner_rx).await });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/", post(routes::dispatch))
        .with_state(app_state);

    let listen_addr = config.api.listen_addr;
    tracing::info!("pod node listening on http://{}", listen_addr);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| format!("failed to bind {listen_addr}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("HTTP server error: {e}"))?;

    // Server future returned: a shutdown signal fired. Propagate it to the
    // background tasks and wait for them, bounded.
    let _ = shutdown_tx.send(true);

    let joined = tokio::time::timeout(
        SHUTDOWN_GRACE_PERIOD,
        async { tokio::join!(roam_handle, announce_handle, miner_handle) },
    )
    .await;
    if joined.is_err() {
        tracing::warn!("background tasks did not finish within the shutdown grace period");
    }

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
