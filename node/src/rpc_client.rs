//! Outbound peer RPC calls (§4.9, §6).
//!
//! Grounded on the donor's `ml_client/http.rs`, which wraps
//! `reqwest::blocking::Client` behind a small typed API over one
//! collaborator's HTTP surface; generalized here to the async client (the
//! rest of this crate is `tokio`-based) calling peer nodes' XML-RPC
//! endpoint instead of the ML verifier.

use std::time::{SystemTime, UNIX_EPOCH};

use pod_core::error::{Error, Result};
use pod_core::rpc::auth;
use pod_core::types::peer::PeerRecord;

use crate::xmlrpc::{self, StateDocument};

/// Default per-call timeout (§5: "RPC clients use a per-call timeout,
/// default 5 s").
const CALL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

fn endpoint(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/")
}

fn random_nonce() -> String {
    use rand::Rng;
    rand::thread_rng().r#gen::<u64>().to_string()
}

fn current_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

async fn call(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    secret: &str,
    method_name: &str,
    domain_params: &[&str],
    payload: &str,
) -> Result<String> {
    let timestamp = current_unix_seconds();
    let nonce = random_nonce();
    let signature = auth::sign(secret, timestamp, &nonce, payload);

    let timestamp_str = timestamp.to_string();
    let mut params: Vec<&str> = domain_params.to_vec();
    params.push(&timestamp_str);
    params.push(&nonce);
    params.push(&signature);

    let body = xmlrpc::build_method_call(method_name, &params);

    let response = client
        .post(endpoint(host, port))
        .timeout(CALL_TIMEOUT)
        .body(body)
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    response
        .text()
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

/// Calls `ping` on `(host, port)`. Returns `Ok(())` on any well-formed
/// response; the caller only cares about reachability.
pub async fn ping(client: &reqwest::Client, host: &str, port: u16, secret: &str) -> Result<()> {
    call(client, host, port, secret, "ping", &[], "").await?;
    Ok(())
}

/// Calls `announce(self_host, self_port)` on `(host, port)`.
pub async fn announce(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    secret: &str,
    self_host: &str,
    self_port: u16,
) -> Result<()> {
    let payload = format!("{self_host}:{self_port}");
    let self_port_str = self_port.to_string();
    call(
        client,
        host,
        port,
        secret,
        "announce",
        &[self_host, &self_port_str],
        &payload,
    )
    .await?;
    Ok(())
}

/// Calls `send_state(xml)` on `(host, port)`, pushing this node's own
/// advertised address and known peer set.
pub async fn send_state(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    secret: &str,
    self_host: &str,
    self_port: u16,
    known_peers: &[PeerRecord],
) -> Result<()> {
    let current_utc = chrono::Utc::now();
    let xml = xmlrpc::build_state_document(self_host, self_port, current_utc, known_peers);
    call(client, host, port, secret, "send_state", &[&xml], &xml).await?;
    Ok(())
}

/// Calls `get_state` on `(host, port)`, returning the peer's advertised
/// state document.
pub async fn get_state(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    secret: &str,
) -> Result<StateDocument> {
    let response = call(client, host, port, secret, "get_state", &[], "").await?;
    xmlrpc::parse_state_document(&response)
}

/// Calls `receive_block(json)` on `(host, port)`, broadcasting a newly
/// sealed block. Best-effort, no retry (§4.5/§9: propagation is convergent
/// through gossip, not guaranteed per-call).
pub async fn receive_block(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    secret: &str,
    block_json: &str,
) -> Result<()> {
    call(client, host, port, secret, "receive_block", &[block_json], block_json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_formats_bare_http_url() {
        assert_eq!(endpoint("10.0.0.5", 7654), "http://10.0.0.5:7654/");
    }

    #[test]
    fn random_nonce_is_numeric_and_varies() {
        let a = random_nonce();
        let b = random_nonce();
        assert!(a.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(a, b, "two random u64 nonces colliding is astronomically unlikely");
    }
}
