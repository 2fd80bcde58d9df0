//! HMAC-based RPC authentication (§4.7).
//!
//! Grounded on the original `node.py`'s `make_signature`/`verify_signature`/
//! `_check_time_and_signature` trio: hex HMAC-SHA256 over a `timestamp :
//! nonce : payload` pre-image, constant-time compared, with a clock-skew
//! tolerance window and no nonce replay cache.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AuthErrorKind, Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Builds the exact pre-image signed by [`sign`]/verified by [`verify`],
/// matching the original's `make_message_for_rpc(timestamp, nonce, payload)`:
/// `timestamp + ":" + nonce + ":" + payload` (§4.7).
fn message_for_rpc(timestamp: i64, nonce: &str, payload: &str) -> String {
    format!("{timestamp}:{nonce}:{payload}")
}

/// Returns the hex HMAC-SHA256 digest of the RPC pre-image under `secret`.
pub fn sign(secret: &str, timestamp: i64, nonce: &str, payload: &str) -> String {
    let message = message_for_rpc(timestamp, nonce, payload);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies an incoming RPC call's timestamp and signature, in that order:
/// a stale or malformed timestamp is rejected before ever touching the
/// signature, matching the acceptance order in §4.7.
pub fn verify(
    secret: &str,
    timestamp_str: &str,
    nonce: &str,
    payload: &str,
    signature_hex: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| Error::AuthFailed(AuthErrorKind::InvalidTimestamp))?;

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(Error::AuthFailed(AuthErrorKind::TimestampOutOfRange));
    }

    let message = message_for_rpc(timestamp, nonce, payload);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(message.as_bytes());

    let signature_bytes = hex::decode(signature_hex)
        .map_err(|_| Error::AuthFailed(AuthErrorKind::BadSignature))?;

    mac.verify_slice(&signature_bytes)
        .map_err(|_| Error::AuthFailed(AuthErrorKind::BadSignature))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "supersecret_shared_key";

    #[test]
    fn sign_then_verify_round_trips() {
        let signature = sign(SECRET, 1_000, "nonce-1", "payload");
        verify(SECRET, "1000", "nonce-1", "payload", &signature, 1_010, 120)
            .expect("round trip should verify");
    }

    #[test]
    fn verify_rejects_malformed_timestamp() {
        let signature = sign(SECRET, 1_000, "nonce-1", "payload");
        let err = verify(SECRET, "not-a-number", "nonce-1", "payload", &signature, 1_010, 120)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AuthFailed(AuthErrorKind::InvalidTimestamp)
        ));
    }

    #[test]
    fn verify_rejects_out_of_tolerance_timestamp() {
        let signature = sign(SECRET, 1_000, "nonce-1", "payload");
        let err = verify(SECRET, "1000", "nonce-1", "payload", &signature, 2_000, 120).unwrap_err();
        assert!(matches!(
            err,
            Error::AuthFailed(AuthErrorKind::TimestampOutOfRange)
        ));
    }

    #[test]
    fn verify_rejects_bad_signature() {
        let err = verify(SECRET, "1000", "nonce-1", "payload", "00".repeat(32).as_str(), 1_010, 120)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AuthFailed(AuthErrorKind::BadSignature)
        ));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signature = sign(SECRET, 1_000, "nonce-1", "payload");
        let err = verify(SECRET, "1000", "nonce-1", "tampered", &signature, 1_010, 120).unwrap_err();
        assert!(matches!(
            err,
            Error::AuthFailed(AuthErrorKind::BadSignature)
        ));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let signature = sign(SECRET, 1_000, "nonce-1", "payload");
        let err = verify("other-secret", "1000", "nonce-1", "payload", &signature, 1_010, 120)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AuthFailed(AuthErrorKind::BadSignature)
        ));
    }
}
