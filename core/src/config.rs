//! Top-level node configuration (§6 "Configuration (recognized options)").
//!
//! `NodeConfig` aggregates every sub-config a node needs to start: PoD
//! tuning, ledger/mempool/peer-store file paths, roaming and periodic-
//! announce parameters, the HMAC shared secret and clock-skew tolerance,
//! the HTTP listen address, and the metrics exporter. This mirrors the
//! donor workspace's `ChainConfig` composition (one aggregate struct
//! built from smaller `Default`-able pieces); `pod-node::config` is
//! responsible for the defaults/file/env layering described in
//! `SPEC_FULL.md` §4.10, since the donor's own `main.rs` never needed a
//! config loader (it hardcoded `ChainConfig::default()`).

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pod::PodConfig;

/// File paths owned by the ledger and mempool stores (§6: `ledger_file`,
/// and the mempool's sibling path, which the spec's recognized-option
/// list leaves to a sensible default alongside `db_dir`).
#[derive(Clone, Debug)]
pub struct LedgerPaths {
    pub ledger_path: PathBuf,
    pub mempool_path: PathBuf,
}

impl Default for LedgerPaths {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("db/ledger.data"),
            mempool_path: PathBuf::from("db/mempool.bin"),
        }
    }
}

/// Peer directory file path (§6: `db_file`).
#[derive(Clone, Debug)]
pub struct PeerConfig {
    pub db_path: PathBuf,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db/peers.db"),
        }
    }
}

/// Roaming discovery and periodic-announce tuning (§4.9, §6:
/// `roam_subnet_base`, `roam_ports`, `roam_interval_seconds`).
#[derive(Clone, Debug)]
pub struct RoamConfig {
    /// The `/24` base, e.g. `"10.0.0"`; the roaming loop fills in a
    /// random last octet each iteration.
    pub subnet_base: String,
    /// Candidate ports probed by the roaming loop and re-announced to by
    /// the periodic-announce loop.
    pub ports: Vec<u16>,
    /// Upper bound, in seconds, of the roaming loop's uniform sleep
    /// interval (`[0.5, interval]`).
    pub interval_secs: u64,
    /// Period, in seconds, of the periodic-announce loop (§4.9 default 30).
    pub announce_interval_secs: u64,
}

impl Default for RoamConfig {
    fn default() -> Self {
        Self {
            subnet_base: "10.0.0".to_string(),
            ports: vec![8000, 8001, 8002],
            interval_secs: 10,
            announce_interval_secs: 30,
        }
    }
}

/// RPC authentication tuning (§4.7, §6: `hmac_secret`,
/// `hmac_tolerance_seconds`).
#[derive(Clone, Debug)]
pub struct HmacConfig {
    pub secret: String,
    pub tolerance_secs: i64,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-shared-secret".to_string(),
            tolerance_secs: 120,
        }
    }
}

/// The HTTP listen address for the XML-RPC envelope (§6 "Wire protocol").
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let addr: SocketAddr = "0.0.0.0:8000"
            .parse()
            .expect("hard-coded API listen address should parse");
        Self { listen_addr: addr }
    }
}

/// Prometheus exporter configuration (unchanged from the donor's
/// `MetricsConfig`).
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level node configuration.
///
/// `host`/`port` are the address this node advertises to peers (the
/// `announce(host, port)` payload), which may differ from `api.listen_addr`
/// (e.g. behind NAT or under container port mapping).
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub pod: PodConfig,
    pub ledger: LedgerPaths,
    pub peers: PeerConfig,
    pub roam: RoamConfig,
    pub hmac: HmacConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    /// Owned entirely by the account subsystem (§6); this crate never
    /// reads or writes it, but the config loader still recognizes the
    /// option so a single config file can describe a whole node.
    pub state_file: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            pod: PodConfig::default(),
            ledger: LedgerPaths::default(),
            peers: PeerConfig::default(),
            roam: RoamConfig::default(),
            hmac: HmacConfig::default(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            state_file: PathBuf::from("db/state.data"),
        }
    }
}
