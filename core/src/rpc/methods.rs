//! Transport-agnostic RPC method handlers (§4.8).
//!
//! Every function here assumes its caller has already authenticated the
//! inbound call (`rpc::auth::verify`); these handlers implement only the
//! domain logic of each method, over already-open store handles. The
//! `pod-node` binary adapts these to the XML-RPC-over-HTTP envelope and
//! decides, per method, whether an authentication failure becomes a
//! `{success, reason}` result or an XML-RPC fault (§4.8, §7).
//!
//! Grounded on the original `node.py`'s `NodeRPCHandler`, which returns a
//! `{success, reason}` dict for every mutating call and raises only for
//! the two read-side methods; `receive_block`'s invariant/PoD
//! re-verification before append is a spec-mandated hardening over the
//! original, which trusted the HMAC signature alone (§4.8, §9).

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::ledger::LedgerStore;
use crate::peers::PeerStore;
use crate::pod::ProofOfDiplomacy;
use crate::types::block::Block;
use crate::types::peer::PeerRecord;

/// Result of [`ping`].
#[derive(Clone, Debug, PartialEq)]
pub struct PingResult {
    pub success: bool,
    /// Unix milliseconds at the moment the call was handled.
    pub time: i64,
}

/// Common `{success, reason}` shape shared by the mutating methods.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusResult {
    pub success: bool,
    pub reason: Option<String>,
}

impl StatusResult {
    fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Result of [`get_state`]: this node's advertised address, the current
/// UTC instant, and every peer it currently knows about.
#[derive(Clone, Debug, PartialEq)]
pub struct GetStateResult {
    pub host: String,
    pub port: u16,
    pub current_utc: DateTime<Utc>,
    pub peers: Vec<PeerRecord>,
}

/// The parsed body of a `send_state` call: the sender's own address plus
/// its view of the peer set, pushed to the receiver for catch-up.
#[derive(Clone, Debug, PartialEq)]
pub struct SendStatePayload {
    pub host: String,
    pub port: u16,
    pub peers: Vec<PeerRecord>,
}

/// `ping` (§4.8): a liveness probe with no domain payload.
pub fn ping(now_unix_ms: i64) -> PingResult {
    PingResult {
        success: true,
        time: now_unix_ms,
    }
}

/// `announce(host, port)` (§4.8): upserts the caller into the local peer
/// directory.
pub fn announce(peers: &dyn PeerStore, host: &str, port: u16) -> Result<StatusResult> {
    peers.upsert(host, port)?;
    Ok(StatusResult::ok())
}

/// `get_state` (§4.8): this node's address, current time, and known peers.
/// Auth failures on this method are the receiver's responsibility to
/// raise as an XML-RPC fault before ever calling this function.
pub fn get_state(self_host: &str, self_port: u16, peers: &dyn PeerStore) -> Result<GetStateResult> {
    Ok(GetStateResult {
        host: self_host.to_string(),
        port: self_port,
        current_utc: Utc::now(),
        peers: peers.list()?,
    })
}

/// `get_ledger` (§4.8): the raw bytes of the ledger file, to be base64-
/// wrapped by the transport layer. Auth failures here are also the
/// caller's responsibility to raise as a fault.
pub fn get_ledger(ledger: &dyn LedgerStore) -> Result<Vec<u8>> {
    ledger.read_raw()
}

/// `send_state(xml)` (§4.8): merges the sender's advertised address and
/// its known peers into the local directory. No re-gossip is performed
/// beyond this direct merge (§9: pull-dominant propagation).
pub fn send_state(peer_store: &dyn PeerStore, payload: &SendStatePayload) -> Result<StatusResult> {
    peer_store.upsert(&payload.host, payload.port)?;
    for peer in &payload.peers {
        peer_store.upsert(&peer.host, peer.port)?;
    }
    Ok(StatusResult::ok())
}

/// `receive_block(json)` (§4.8): re-verifies chain linkage, the block's
/// own canonical hash, and PoD finality before ever appending — trusting
/// the RPC signature only for the origin, never for the block's content
/// (§4.8's explicit hardening mandate).
pub fn receive_block(
    ledger: &dyn LedgerStore,
    pod: &ProofOfDiplomacy,
    block: Block,
) -> Result<StatusResult> {
    let tail = ledger.tail();
    let expected_index = tail.as_ref().map(|b| b.index + 1).unwrap_or(1);
    let expected_prev_hash = tail
        .as_ref()
        .map(|b| b.hash.clone())
        .unwrap_or_else(Block::genesis_prev_hash);

    if block.index != expected_index || block.prev_hash != expected_prev_hash {
        return Ok(StatusResult::fail("stale_or_forked"));
    }

    let expected_merkle_root = match Block::compute_merkle_root(&block.transactions) {
        Ok(root) => root,
        Err(e) => return Ok(StatusResult::fail(format!("bad_format: {e}"))),
    };
    if block.merkle_root != expected_merkle_root {
        return Ok(StatusResult::fail("chain_mismatch: merkle_root"));
    }
    let expected_hash = Block::compute_hash(&block.prev_hash, &block.merkle_root, block.index);
    if block.hash != expected_hash {
        return Ok(StatusResult::fail("chain_mismatch: hash"));
    }

    let (is_final, n_required) = match pod.check_block_status(&block) {
        Ok(status) => status,
        Err(Error::PodInvalid(reason)) => {
            return Ok(StatusResult::fail(format!("pod_invalid: {reason}")));
        }
        Err(e) => return Err(e),
    };
    if !is_final {
        return Ok(StatusResult::fail(format!(
            "pod_invalid: {} of {n_required} required confirmations",
            block.confirmations.len()
        )));
    }

    ledger.append(&block)?;
    Ok(StatusResult::ok())
}
