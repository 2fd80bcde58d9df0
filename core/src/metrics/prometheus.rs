//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed node metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Node-level Prometheus metrics: mining, PoD confirmations, RPC auth outcomes,
/// ledger integrity, and peer/mempool gauges.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Total number of blocks sealed by this node's assembler.
    pub blocks_mined_total: IntCounter,
    /// Total accepted confirmations, labelled by validator address.
    pub pod_confirmations_total: IntCounterVec,
    /// Wall-clock time spent solving a single hashcash puzzle, in seconds.
    pub pod_puzzle_solve_seconds: Histogram,
    /// RPC authentication failures, labelled by failure kind.
    pub rpc_auth_failures_total: IntCounterVec,
    /// Ledger frames skipped because they failed to decode.
    pub ledger_corrupt_frames_total: IntCounter,
    /// Current number of pending transactions in the mempool.
    pub mempool_size: IntGauge,
    /// Current number of peers known to this node.
    pub peers_known: IntGauge,
}

impl NodeMetrics {
    /// Registers node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_mined_total = IntCounter::with_opts(Opts::new(
            "blocks_mined_total",
            "Total number of blocks sealed by this node's assembler",
        ))?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let pod_confirmations_total = IntCounterVec::new(
            Opts::new(
                "pod_confirmations_total",
                "Total accepted Proof-of-Diplomacy confirmations by validator",
            ),
            &["validator"],
        )?;
        registry.register(Box::new(pod_confirmations_total.clone()))?;

        let pod_puzzle_solve_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pod_puzzle_solve_seconds",
                "Time to solve a single hashcash puzzle in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
        )?;
        registry.register(Box::new(pod_puzzle_solve_seconds.clone()))?;

        let rpc_auth_failures_total = IntCounterVec::new(
            Opts::new(
                "rpc_auth_failures_total",
                "RPC authentication failures by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(rpc_auth_failures_total.clone()))?;

        let ledger_corrupt_frames_total = IntCounter::with_opts(Opts::new(
            "ledger_corrupt_frames_total",
            "Total ledger frames skipped because they failed to decode",
        ))?;
        registry.register(Box::new(ledger_corrupt_frames_total.clone()))?;

        let mempool_size = IntGauge::with_opts(Opts::new(
            "mempool_size",
            "Current number of pending transactions in the mempool",
        ))?;
        registry.register(Box::new(mempool_size.clone()))?;

        let peers_known = IntGauge::with_opts(Opts::new(
            "peers_known",
            "Current number of peers known to this node",
        ))?;
        registry.register(Box::new(peers_known.clone()))?;

        Ok(Self {
            blocks_mined_total,
            pod_confirmations_total,
            pod_puzzle_solve_seconds,
            rpc_auth_failures_total,
            ledger_corrupt_frames_total,
            mempool_size,
            peers_known,
        })
    }
}

/// Wrapper around a Prometheus registry and the node metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the node metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("pod".to_string()), None)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self { registry, node })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "metrics HTTP connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn node_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = NodeMetrics::register(&registry).expect("register metrics");

        metrics.blocks_mined_total.inc();
        metrics
            .pod_confirmations_total
            .with_label_values(&["validator-1"])
            .inc();
        metrics.pod_puzzle_solve_seconds.observe(0.123);
        metrics
            .rpc_auth_failures_total
            .with_label_values(&["bad_signature"])
            .inc();
        metrics.ledger_corrupt_frames_total.inc();
        metrics.mempool_size.set(3);
        metrics.peers_known.set(5);

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.node.blocks_mined_total.inc();
        let text = registry.gather_text();
        assert!(text.contains("blocks_mined_total"));
    }
}
