//! Minimal XML-RPC-style envelope (§6 "Wire protocol").
//!
//! No `xmlrpc` crate exists in this workspace's dependency universe (it
//! is the one dependency in this spec with no precedent elsewhere in the
//! reference pack), so the envelope is hand-rolled: `quick-xml`'s event
//! reader parses inbound `<methodCall>` documents, and plain string
//! templates build responses. Every value this protocol actually carries
//! is a flat string — `host:port`, an xml/json body, a decimal
//! timestamp — so there is no need to round-trip XML-RPC's full scalar
//! zoo (`<int>`, `<boolean>`, `<dateTime.iso8601>`, ...); `<boolean>` and
//! `<int>` are used only for building responses, never required when
//! parsing requests.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use pod_core::error::{Error, Result};
use pod_core::types::PeerRecord;

/// A parsed inbound `<methodCall>`: the method name plus its ordered
/// string parameters. Every method's domain parameters are followed by
/// the three auth parameters (`timestamp`, `nonce`, `signature`), per
/// §4.7 ("Auth triple is appended as the last three positional arguments
/// of every call").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<String>,
}

/// Parses a `<methodCall><methodName>...</methodName><params>...</params></methodCall>`
/// document into a method name and an ordered list of parameter strings.
pub fn parse_method_call(xml: &str) -> Result<MethodCall> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut method_name: Option<String> = None;
    let mut params = Vec::new();
    let mut in_method_name = false;
    let mut in_value = false;
    let mut current = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"methodName" => in_method_name = true,
                b"value" => {
                    in_value = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"methodName" => in_method_name = false,
                b"value" => {
                    params.push(std::mem::take(&mut current));
                    in_value = false;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"value" => {
                params.push(String::new());
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::BadFormat(format!("invalid XML text: {e}")))?;
                if in_method_name {
                    method_name = Some(text.into_owned());
                } else if in_value {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if in_value {
                    let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::BadFormat(format!("malformed XML-RPC call: {e}"))),
        }
        buf.clear();
    }

    let method_name =
        method_name.ok_or_else(|| Error::BadFormat("missing methodName element".to_string()))?;
    Ok(MethodCall {
        method_name,
        params,
    })
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Builds a `<methodCall>` request envelope: `method_name` plus ordered
/// string `params` (the caller appends the auth triple itself).
pub fn build_method_call(method_name: &str, params: &[&str]) -> String {
    let mut body = String::new();
    for p in params {
        body.push_str(&format!(
            "<param><value>{}</value></param>",
            escape_text(p)
        ));
    }
    format!(
        "<methodCall><methodName>{}</methodName><params>{}</params></methodCall>",
        escape_text(method_name),
        body
    )
}

/// Builds a `<methodResponse>` carrying one flat string value.
pub fn success_response(value: &str) -> String {
    format!(
        "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
        escape_text(value)
    )
}

/// Builds the `<struct>{success, reason}</struct>` body every mutating
/// method returns on success or routine rejection (§4.8, §7).
pub fn status_struct(success: bool, reason: Option<&str>) -> String {
    let mut s = String::from("<struct>");
    s.push_str(&format!(
        "<member><name>success</name><value><boolean>{}</boolean></value></member>",
        if success { 1 } else { 0 }
    ));
    if let Some(r) = reason {
        s.push_str(&format!(
            "<member><name>reason</name><value><string>{}</string></value></member>",
            escape_text(r)
        ));
    }
    s.push_str("</struct>");
    s
}

/// Builds a full `<methodResponse>` wrapping a `{success, reason}` struct.
pub fn status_response(success: bool, reason: Option<&str>) -> String {
    format!(
        "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
        status_struct(success, reason)
    )
}

/// Builds the `<struct>{success, time}</struct>` body `ping` returns
/// (§4.8: `{success, time}`, `node.py:296`), `time` being Unix
/// milliseconds.
pub fn ping_struct(success: bool, time_ms: i64) -> String {
    format!(
        "<struct>\
         <member><name>success</name><value><boolean>{}</boolean></value></member>\
         <member><name>time</name><value><int>{time_ms}</int></value></member>\
         </struct>",
        if success { 1 } else { 0 }
    )
}

/// Builds a full `<methodResponse>` wrapping a `{success, time}` struct.
pub fn ping_response(success: bool, time_ms: i64) -> String {
    format!(
        "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
        ping_struct(success, time_ms)
    )
}

/// Builds the XML-RPC fault response raised for auth failures on the
/// read-side methods (`get_state`, `get_ledger`) per §4.8/§6: fault code
/// 1, string `"auth_failed:{subkind}"`.
pub fn fault_response(code: i32, fault_string: &str) -> String {
    format!(
        "<methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>{code}</int></value></member>\
         <member><name>faultString</name><value><string>{}</string></value></member>\
         </struct></value></fault></methodResponse>",
        escape_text(fault_string)
    )
}

/// Builds the `<state>` document returned by `get_state` and carried as
/// the `send_state` payload: this node's advertised address, the current
/// UTC instant, and its known peers.
pub fn build_state_document(
    host: &str,
    port: u16,
    current_utc: DateTime<Utc>,
    peers: &[PeerRecord],
) -> String {
    let mut peers_xml = String::new();
    for peer in peers {
        peers_xml.push_str(&format!(
            "<peer host=\"{}\" port=\"{}\" last_seen=\"{}\" />",
            escape_attr(&peer.host),
            peer.port,
            peer.last_seen.to_rfc3339()
        ));
    }
    format!(
        "<state host=\"{}\" port=\"{}\" current_utc=\"{}\"><peers>{}</peers></state>",
        escape_attr(host),
        port,
        current_utc.to_rfc3339(),
        peers_xml
    )
}

/// The decoded form of a `<state>` document (§4.8: `get_state`'s result
/// shape and `send_state`'s payload shape are the same document).
#[derive(Debug, Clone, PartialEq)]
pub struct StateDocument {
    pub host: String,
    pub port: u16,
    pub peers: Vec<PeerRecord>,
}

/// Parses a `<state>` document built by [`build_state_document`].
pub fn parse_state_document(xml: &str) -> Result<StateDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut host = None;
    let mut port = None;
    let mut peers = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name().as_ref().to_vec();
                if local == b"state" {
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"host" => {
                                host = Some(
                                    attr.unescape_value()
                                        .map_err(|e| {
                                            Error::BadFormat(format!("bad host attribute: {e}"))
                                        })?
                                        .into_owned(),
                                );
                            }
                            b"port" => {
                                let value = attr.unescape_value().map_err(|e| {
                                    Error::BadFormat(format!("bad port attribute: {e}"))
                                })?;
                                port = Some(value.parse::<u16>().map_err(|e| {
                                    Error::BadFormat(format!("invalid port: {e}"))
                                })?);
                            }
                            _ => {}
                        }
                    }
                } else if local == b"peer" {
                    let mut peer_host = None;
                    let mut peer_port = None;
                    let mut last_seen = None;
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| Error::BadFormat(format!("bad peer attribute: {e}")))?
                            .into_owned();
                        match attr.key.as_ref() {
                            b"host" => peer_host = Some(value),
                            b"port" => {
                                peer_port = Some(value.parse::<u16>().map_err(|e| {
                                    Error::BadFormat(format!("invalid peer port: {e}"))
                                })?)
                            }
                            b"last_seen" => {
                                last_seen = DateTime::parse_from_rfc3339(&value)
                                    .ok()
                                    .map(|dt| dt.with_timezone(&Utc));
                            }
                            _ => {}
                        }
                    }
                    if let (Some(h), Some(p)) = (peer_host, peer_port) {
                        peers.push(PeerRecord::new(h, p, last_seen.unwrap_or_else(Utc::now)));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::BadFormat(format!("malformed state document: {e}"))),
        }
        buf.clear();
    }

    let host = host.ok_or_else(|| Error::BadFormat("state document missing host".to_string()))?;
    let port = port.ok_or_else(|| Error::BadFormat("state document missing port".to_string()))?;
    Ok(StateDocument { host, port, peers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_method_call_extracts_name_and_params_in_order() {
        let xml = build_method_call("announce", &["10.0.0.5", "8000", "1000.0", "42", "deadbeef"]);
        let call = parse_method_call(&xml).unwrap();
        assert_eq!(call.method_name, "announce");
        assert_eq!(
            call.params,
            vec!["10.0.0.5", "8000", "1000.0", "42", "deadbeef"]
        );
    }

    #[test]
    fn parse_method_call_preserves_empty_payload_params() {
        let xml = build_method_call("ping", &["", "1000.0", "42", "deadbeef"]);
        let call = parse_method_call(&xml).unwrap();
        assert_eq!(call.method_name, "ping");
        assert_eq!(call.params[0], "");
    }

    #[test]
    fn status_response_round_trips_through_parse_method_call_shape() {
        let xml = status_response(false, Some("stale_or_forked"));
        assert!(xml.contains("<boolean>0</boolean>"));
        assert!(xml.contains("stale_or_forked"));
    }

    #[test]
    fn ping_response_carries_both_success_and_time() {
        let xml = ping_response(true, 1_700_000_000_000);
        assert!(xml.contains("<boolean>1</boolean>"));
        assert!(xml.contains("<int>1700000000000</int>"));
    }

    #[test]
    fn fault_response_contains_code_and_string() {
        let xml = fault_response(1, "auth_failed:timestamp_out_of_range");
        assert!(xml.contains("<int>1</int>"));
        assert!(xml.contains("auth_failed:timestamp_out_of_range"));
    }

    #[test]
    fn state_document_round_trips() {
        let peers = vec![PeerRecord::new("10.0.0.2", 8001, Utc::now())];
        let xml = build_state_document("10.0.0.1", 8000, Utc::now(), &peers);
        let parsed = parse_state_document(&xml).unwrap();
        assert_eq!(parsed.host, "10.0.0.1");
        assert_eq!(parsed.port, 8000);
        assert_eq!(parsed.peers.len(), 1);
        assert_eq!(parsed.peers[0].host, "10.0.0.2");
    }

    #[test]
    fn state_document_with_no_peers_parses_cleanly() {
        let xml = build_state_document("10.0.0.1", 8000, Utc::now(), &[]);
        let parsed = parse_state_document(&xml).unwrap();
        assert!(parsed.peers.is_empty());
    }
}
