//! `pod-core`: the Proof-of-Diplomacy consensus and ledger library.
//!
//! This crate provides the core building blocks of the node (§2):
//!
//! - hash primitives (`hash`),
//! - strongly-typed domain types: xmif, money, IXAN, block, confirmation,
//!   peer record (`types`),
//! - the Proof-of-Diplomacy engine: `N`/difficulty formulas, puzzle
//!   solve/verify, finality checking (`pod`),
//! - durable ledger and mempool storage (`ledger`),
//! - the block assembler / mining loop (`assembler`),
//! - a durable peer directory (`peers`),
//! - RPC authentication and transport-agnostic method handlers (`rpc`),
//! - boundary traits for collaborators this crate consumes but does not
//!   own: account signing and the rate oracle (`signer`),
//! - a Prometheus metrics registry (`metrics`),
//! - top-level node configuration (`config`),
//! - and a unified error taxonomy (`error`).
//!
//! The `pod-node` binary composes these pieces into an HTTP node with a
//! roaming-discovery loop, a periodic-announce loop, and a mining task.

pub mod assembler;
pub mod config;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod metrics;
pub mod peers;
pub mod pod;
pub mod rpc;
pub mod signer;
pub mod types;

// Re-export the most commonly used items at the crate root for
// ergonomic `pod_core::Xxx` access from `pod-node`.
pub use assembler::{AssemblerConfig, BlockAssembler};
pub use config::NodeConfig;
pub use error::{AuthErrorKind, Error, Result};
pub use hash::{leading_zero_bits, sha256_hex};
pub use ledger::{
    FileLedgerStore, FileMempoolStore, LedgerConfig, LedgerStore, MempoolConfig, MempoolStore,
};
pub use metrics::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};
pub use peers::{PeerStore, SqlitePeerStore};
pub use pod::{PodConfig, ProofOfDiplomacy};
pub use signer::{RateOracle, SignerIdentity};
pub use types::{
    Block, Confirmation, Hash256, Money, PeerRecord, Xmif, derive_ixan, parse_microformat,
};
