//! Core domain types used by the node.
//!
//! This module defines strongly-typed hashes, the transaction interchange
//! format, block/confirmation records, and peer records shared across the
//! consensus, ledger, and RPC layers. The goal is to avoid "naked" byte
//! buffers and untyped maps in public APIs and instead use domain-specific
//! newtypes, the same discipline the rest of this workspace applies to
//! account/evidence identifiers.

use serde::{Deserialize, Serialize};

pub mod block;
pub mod canonical;
pub mod ixan;
pub mod money;
pub mod peer;
pub mod tx;

pub use block::{Block, Confirmation};
pub use ixan::derive_ixan;
pub use money::Money;
pub use peer::PeerRecord;
pub use tx::{Xmif, parse_microformat};

/// Length in bytes of the 256-bit hash type used throughout this crate.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (SHA-256).
///
/// Every fixed-size hash in this crate (block ids, confirmation hashes,
/// the hashcash puzzle digest) is a SHA-256 output represented either as
/// this type or, at API boundaries that need the textual form (block ids
/// embedded in strings, the puzzle pre-image), as its lowercase hex string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the SHA-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let hex = crate::hash::sha256_hex(data);
        Hash256::from_hex(&hex).expect("sha256_hex always returns 64 valid hex chars")
    }

    /// Parses a 64-character hex string into a [`Hash256`].
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != HASH_LEN * 2 {
            return None;
        }
        let bytes = hex::decode(hex).ok()?;
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash256(arr))
    }

    /// Returns the lowercase hex encoding of this hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// 64 zero hex digits: the `prev_hash` sentinel for genesis blocks.
    pub fn zero_hex() -> String {
        "0".repeat(HASH_LEN * 2)
    }
}
