//! Proof-of-Diplomacy consensus (§4.4): confirmation-count and
//! per-confirmer difficulty formulas, puzzle solve/verify, and block
//! finality checking.

pub mod config;
pub mod engine;

pub use config::PodConfig;
pub use engine::ProofOfDiplomacy;
