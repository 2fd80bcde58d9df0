//! The single `POST /` XML-RPC dispatch route (§4.8, §6).
//!
//! Mirrors the donor's `api-gateway` route module shape (one file per
//! concern, composed into a `Router` in `main`), collapsed to one handler
//! because this protocol multiplexes every method over a single endpoint
//! rather than one route per method.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use pod_core::error::{AuthErrorKind, Error};
use pod_core::rpc::auth;
use pod_core::rpc::methods::{self, SendStatePayload};
use pod_core::types::block::Block;

use crate::state::SharedState;
use crate::xmlrpc::{self, MethodCall};

/// Handles every inbound RPC call: parses the envelope, verifies the
/// trailing auth triple, dispatches on method name, and encodes the
/// result back into the XML-RPC response shape.
pub async fn dispatch(State(state): State<SharedState>, body: Bytes) -> (StatusCode, String) {
    let body = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return (StatusCode::BAD_REQUEST, xmlrpc::fault_response(1, "bad_format:not_utf8")),
    };

    let call = match xmlrpc::parse_method_call(body) {
        Ok(call) => call,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                xmlrpc::fault_response(1, &format!("bad_format:{e}")),
            );
        }
    };

    if call.params.len() < 3 {
        return (
            StatusCode::BAD_REQUEST,
            xmlrpc::fault_response(1, "bad_format:missing_auth_triple"),
        );
    }

    let split = call.params.len() - 3;
    let domain_params = &call.params[..split];
    let timestamp_str = &call.params[split];
    let nonce = &call.params[split + 1];
    let signature = &call.params[split + 2];

    let payload = auth_payload(&call.method_name, domain_params);
    let now_unix = current_unix_seconds();

    let auth_result = auth::verify(
        &state.config.hmac.secret,
        timestamp_str,
        nonce,
        &payload,
        signature,
        now_unix,
        state.config.hmac.tolerance_secs,
    );

    if let Err(Error::AuthFailed(kind)) = &auth_result {
        state
            .metrics
            .node
            .rpc_auth_failures_total
            .with_label_values(&[auth_kind_label(*kind)])
            .inc();
        tracing::warn!(method = %call.method_name, kind = %kind, "rpc auth failed");

        return match call.method_name.as_str() {
            "get_state" | "get_ledger" => (
                StatusCode::OK,
                xmlrpc::fault_response(1, &format!("auth_failed:{kind}")),
            ),
            _ => (
                StatusCode::OK,
                xmlrpc::status_response(false, Some(&format!("auth_failed:{kind}"))),
            ),
        };
    }
    if let Err(e) = auth_result {
        return (StatusCode::INTERNAL_SERVER_ERROR, xmlrpc::fault_response(1, &e.to_string()));
    }

    dispatch_method(&state, &call, domain_params).await
}

async fn dispatch_method(
    state: &SharedState,
    call: &MethodCall,
    domain_params: &[String],
) -> (StatusCode, String) {
    match call.method_name.as_str() {
        "ping" => {
            let result = methods::ping(current_unix_millis());
            (StatusCode::OK, xmlrpc::ping_response(result.success, result.time))
        }
        "announce" => {
            let (host, port) = match parse_host_port(domain_params) {
                Some(pair) => pair,
                None => {
                    return (
                        StatusCode::OK,
                        xmlrpc::status_response(false, Some("bad_format:host_port")),
                    );
                }
            };
            match methods::announce(state.peers.as_ref(), &host, port) {
                Ok(result) => (StatusCode::OK, xmlrpc::status_response(result.success, result.reason.as_deref())),
                Err(e) => (StatusCode::OK, xmlrpc::status_response(false, Some(&e.to_string()))),
            }
        }
        "get_state" => match methods::get_state(&state.config.host, state.config.port, state.peers.as_ref()) {
            Ok(result) => (
                StatusCode::OK,
                xmlrpc::success_response(&xmlrpc::build_state_document(
                    &result.host,
                    result.port,
                    result.current_utc,
                    &result.peers,
                )),
            ),
            Err(e) => (StatusCode::OK, xmlrpc::fault_response(1, &e.to_string())),
        },
        "get_ledger" => match methods::get_ledger(state.ledger.as_ref()) {
            Ok(bytes) => (
                StatusCode::OK,
                xmlrpc::success_response(&BASE64.encode(bytes)),
            ),
            Err(e) => (StatusCode::OK, xmlrpc::fault_response(1, &e.to_string())),
        },
        "send_state" => {
            let xml = match domain_params.first() {
                Some(xml) => xml,
                None => {
                    return (
                        StatusCode::OK,
                        xmlrpc::status_response(false, Some("bad_format:missing_state_document")),
                    );
                }
            };
            let parsed = match xmlrpc::parse_state_document(xml) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return (StatusCode::OK, xmlrpc::status_response(false, Some(&e.to_string())));
                }
            };
            let payload = SendStatePayload {
                host: parsed.host,
                port: parsed.port,
                peers: parsed.peers,
            };
            match methods::send_state(state.peers.as_ref(), &payload) {
                Ok(result) => (StatusCode::OK, xmlrpc::status_response(result.success, result.reason.as_deref())),
                Err(e) => (StatusCode::OK, xmlrpc::status_response(false, Some(&e.to_string()))),
            }
        }
        "receive_block" => {
            let json = match domain_params.first() {
                Some(json) => json,
                None => {
                    return (
                        StatusCode::OK,
                        xmlrpc::status_response(false, Some("bad_format:missing_block")),
                    );
                }
            };
            let block: Block = match serde_json::from_str(json) {
                Ok(block) => block,
                Err(e) => {
                    return (
                        StatusCode::OK,
                        xmlrpc::status_response(false, Some(&format!("bad_format:{e}"))),
                    );
                }
            };
            match methods::receive_block(state.ledger.as_ref(), &state.pod, block) {
                Ok(result) => {
                    if result.success {
                        state.metrics.node.blocks_mined_total.inc();
                    }
                    (StatusCode::OK, xmlrpc::status_response(result.success, result.reason.as_deref()))
                }
                Err(e) => (StatusCode::OK, xmlrpc::status_response(false, Some(&e.to_string()))),
            }
        }
        other => (
            StatusCode::OK,
            xmlrpc::fault_response(2, &format!("unknown_method:{other}")),
        ),
    }
}

/// Reconstructs the exact pre-image `payload` signed by the caller,
/// matching §4.7's table: empty for argumentless calls, `"{host}:{port}"`
/// for `announce`, and the raw xml/json body for `send_state`/`receive_block`.
fn auth_payload(method_name: &str, domain_params: &[String]) -> String {
    match method_name {
        "ping" | "get_state" | "get_ledger" => String::new(),
        "announce" => domain_params
            .first()
            .zip(domain_params.get(1))
            .map(|(host, port)| format!("{host}:{port}"))
            .unwrap_or_default(),
        "send_state" | "receive_block" => domain_params.first().cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn parse_host_port(domain_params: &[String]) -> Option<(String, u16)> {
    let host = domain_params.first()?.clone();
    let port = domain_params.get(1)?.parse::<u16>().ok()?;
    Some((host, port))
}

fn auth_kind_label(kind: AuthErrorKind) -> &'static str {
    match kind {
        AuthErrorKind::InvalidTimestamp => "invalid_timestamp",
        AuthErrorKind::TimestampOutOfRange => "timestamp_out_of_range",
        AuthErrorKind::BadSignature => "bad_signature",
    }
}

fn current_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn current_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn auth_payload_is_empty_for_argumentless_methods() {
        assert_eq!(auth_payload("ping", &params(&[])), "");
        assert_eq!(auth_payload("get_state", &params(&[])), "");
        assert_eq!(auth_payload("get_ledger", &params(&[])), "");
    }

    #[test]
    fn auth_payload_joins_host_and_port_for_announce() {
        assert_eq!(
            auth_payload("announce", &params(&["10.0.0.9", "8080"])),
            "10.0.0.9:8080"
        );
    }

    #[test]
    fn auth_payload_is_raw_body_for_send_state_and_receive_block() {
        let xml = "<methodCall><state/></methodCall>".to_string();
        assert_eq!(auth_payload("send_state", &[xml.clone()]), xml);
        let json = "{\"index\":1}".to_string();
        assert_eq!(auth_payload("receive_block", &[json.clone()]), json);
    }

    #[test]
    fn parse_host_port_rejects_missing_or_malformed_port() {
        assert_eq!(
            parse_host_port(&params(&["10.0.0.9", "8080"])),
            Some(("10.0.0.9".to_string(), 8080))
        );
        assert_eq!(parse_host_port(&params(&["10.0.0.9"])), None);
        assert_eq!(parse_host_port(&params(&["10.0.0.9", "not-a-port"])), None);
    }

    #[test]
    fn auth_kind_label_covers_every_variant() {
        assert_eq!(auth_kind_label(AuthErrorKind::InvalidTimestamp), "invalid_timestamp");
        assert_eq!(
            auth_kind_label(AuthErrorKind::TimestampOutOfRange),
            "timestamp_out_of_range"
        );
        assert_eq!(auth_kind_label(AuthErrorKind::BadSignature), "bad_signature");
    }
}
