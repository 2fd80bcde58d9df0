//! The `xmif` transaction interchange format and its microformat pre-image.

use serde::{Deserialize, Serialize};

use super::money::Money;
use crate::error::Error;

/// `xmif` (XBucks Money Interchange Format): a microformat string plus the
/// sender's signature over its exact UTF-8 bytes.
///
/// `mc` is the *only* input to signing and verification; any re-derivation
/// of it from parsed fields must reproduce it byte-for-byte (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Xmif {
    pub mc: String,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// The decoded fields of a microformat string: `sender_ixan | receiver |
/// money_json | timestamp | fees`.
#[derive(Clone, Debug, PartialEq)]
pub struct MicroformatFields {
    pub sender_ixan: String,
    pub receiver: String,
    pub money: Money,
    /// The `dd/mm/YYYY, HH:MM:SS` timestamp exactly as it appears in `mc`.
    pub timestamp: String,
    pub fees: String,
}

impl MicroformatFields {
    /// Builds the exact microformat string this would sign: `sender_ixan |
    /// receiver | money_json | timestamp | fees`, byte-identical to what
    /// `parse_microformat` would have consumed to produce these fields.
    pub fn to_microformat(&self) -> Result<String, Error> {
        let money_json = serde_json::to_string(&self.money)?;
        Ok([
            self.sender_ixan.as_str(),
            self.receiver.as_str(),
            money_json.as_str(),
            self.timestamp.as_str(),
            self.fees.as_str(),
        ]
        .join("|"))
    }
}

/// Parses a microformat string into its five pipe-delimited segments.
///
/// Enforces exactly five segments and that segment 3 is valid JSON with
/// the `amount`/`currency`/`owner` keys `Money` expects (§4.3). Any
/// violation is a `BadFormat` error.
pub fn parse_microformat(mc: &str) -> Result<MicroformatFields, Error> {
    let parts: Vec<&str> = mc.split('|').collect();
    if parts.len() != 5 {
        return Err(Error::BadFormat(format!(
            "expected 5 pipe-delimited segments, found {}",
            parts.len()
        )));
    }
    let money: Money = serde_json::from_str(parts[2])
        .map_err(|e| Error::BadFormat(format!("invalid money_json segment: {e}")))?;

    Ok(MicroformatFields {
        sender_ixan: parts[0].to_string(),
        receiver: parts[1].to_string(),
        money,
        timestamp: parts[3].to_string(),
        fees: parts[4].to_string(),
    })
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_fields() -> MicroformatFields {
        MicroformatFields {
            sender_ixan: "000000000001".to_string(),
            receiver: "000000000002".to_string(),
            money: Money::new(dec!(1000), "NGN", "000000000001"),
            timestamp: "27/07/2026, 10:00:00".to_string(),
            fees: "0.0001".to_string(),
        }
    }

    #[test]
    fn microformat_round_trips() {
        let fields = sample_fields();
        let mc = fields.to_microformat().unwrap();
        let parsed = parse_microformat(&mc).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = parse_microformat("a|b|c").unwrap_err();
        assert!(matches!(err, Error::BadFormat(_)));
    }

    #[test]
    fn rejects_non_json_money_segment() {
        let err = parse_microformat("a|b|not-json|d|e").unwrap_err();
        assert!(matches!(err, Error::BadFormat(_)));
    }

    #[test]
    fn xmif_signature_round_trips_as_hex() {
        let xmif = Xmif {
            mc: "a|b|c|d|e".to_string(),
            signature: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_string(&xmif).unwrap();
        assert!(json.contains("\"deadbeef\""));
        let back: Xmif = serde_json::from_str(&json).unwrap();
        assert_eq!(xmif, back);
    }
}
