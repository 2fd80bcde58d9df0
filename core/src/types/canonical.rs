//! Canonical JSON serialization.
//!
//! `merkle_root`, block ids, and ledger/mempool frame bodies all hash or
//! embed the canonical JSON encoding of a value: object keys sorted,
//! stable stringification of non-JSON primitives. `serde_json::Value`'s
//! map type is a `BTreeMap` by default (it only becomes insertion-ordered
//! if the `preserve_order` feature is enabled, which this workspace does
//! not enable), so round-tripping a value through `serde_json::Value`
//! before the final `to_string` is sufficient to get sorted keys at every
//! nesting level.

use serde::Serialize;

/// Serializes `value` to a canonical JSON string: keys sorted at every
/// level, no insignificant whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let as_value = serde_json::to_value(value)?;
    serde_json::to_string(&as_value)
}

/// Serializes a sequence of values as a canonical JSON array, the exact
/// shape used for `merkle_root` and for block-size accounting.
pub fn canonical_json_seq<T: Serialize>(values: &[T]) -> Result<String, serde_json::Error> {
    canonical_json(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_are_sorted() {
        let value = json!({"z": 1, "a": 2, "m": 3});
        let out = canonical_json(&value).unwrap();
        assert_eq!(out, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn nested_object_keys_are_sorted() {
        let value = json!({"outer_b": {"z": 1, "a": 2}, "outer_a": 1});
        let out = canonical_json(&value).unwrap();
        assert_eq!(out, r#"{"outer_a":1,"outer_b":{"a":2,"z":1}}"#);
    }
}
