//! Boundary traits for collaborators this crate consumes but does not own
//! (§1): account key management and the fiat/crypto rate oracle.
//!
//! Neither trait is implemented here. They exist so that `pod_core`'s
//! block assembler and RPC layer can be written and tested against a
//! stable interface without depending on key-storage or pricing code,
//! mirroring the donor workspace's `validation::MlVerifier` seam
//! (`ml_client::HttpMlVerifier` implements it; the consensus engine only
//! ever sees the trait).

/// A long-lived asymmetric identity: sign/verify detached signatures over
/// byte strings, and report a stable address.
///
/// The block assembler signs nothing directly — confirmations are
/// unsigned hashcash solutions — but the microformat's sender signature
/// (§3) and every RPC's HMAC identity both flow from an implementation of
/// this trait, owned by the account subsystem and loaned in at
/// construction time (§3 "Ownership and lifecycle").
pub trait SignerIdentity: Send + Sync {
    /// Produces a detached signature over `bytes`.
    fn sign(&self, bytes: &[u8]) -> Vec<u8>;

    /// Verifies a detached signature produced by [`sign`](Self::sign)
    /// (or an equivalent external signer) over `bytes`.
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> bool;

    /// This identity's stable address string, used as an xmif
    /// `sender_ixan`/`receiver_address` component and as a PoD
    /// confirmation's `validator`.
    fn address(&self) -> String;
}

/// A read-only fiat/crypto exchange-rate oracle (§1: "AMM price feeds
/// (read-only rate oracle)").
///
/// Out of scope for this crate's consensus logic — no confirmation or
/// ledger invariant depends on a rate — but declared here as the seam a
/// real bridge/on-ramp integration would fill, so higher layers have a
/// typed interface to program against.
pub trait RateOracle: Send + Sync {
    /// Returns the current price of `base` denominated in `quote`, or
    /// `None` if the pair is not quoted.
    fn rate(&self, base: &str, quote: &str) -> Option<f64>;
}
