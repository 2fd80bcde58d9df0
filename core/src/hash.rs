//! Hash primitives: SHA-256 hex digests and leading-zero-bit counting.
//!
//! These are the two building blocks every other module in this crate is
//! built on top of: block ids, confirmation hashes, and the hashcash
//! puzzle all reduce to `sha256_hex` plus `leading_zero_bits`.

use sha2::{Digest, Sha256};

/// Computes the lowercase hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Counts leading zero bits in the 256-bit big-endian integer that `hex`
/// encodes, reading nibble by nibble so no big-integer type is needed.
///
/// `hex` is expected to be a 64-character lowercase (or uppercase) hex
/// string; any other length still works, it is just not a SHA-256 digest.
pub fn leading_zero_bits(hex: &str) -> u32 {
    let mut bits = 0u32;
    for ch in hex.chars() {
        let nibble = match ch.to_digit(16) {
            Some(n) => n as u8,
            None => break,
        };
        if nibble == 0 {
            bits += 4;
            continue;
        }
        bits += nibble.leading_zeros() - 4;
        break;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        // sha256("") is the well-known empty-string digest.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn leading_zero_bits_all_zero_hex() {
        assert_eq!(leading_zero_bits(&"0".repeat(64)), 256);
    }

    #[test]
    fn leading_zero_bits_counts_nibbles_then_top_bits() {
        // 0x00 0x01 ... => 8 zero bits from the first two nibbles, then
        // the third nibble is 0x0 (4 more zero bits), then 0x1 contributes
        // 3 more leading zero bits within its own nibble.
        assert_eq!(leading_zero_bits("0001"), 15);
    }

    #[test]
    fn leading_zero_bits_nonzero_first_nibble() {
        // 0x8... has no leading zero bits at all.
        assert_eq!(leading_zero_bits("8000"), 0);
        // 0x4... has exactly one leading zero bit.
        assert_eq!(leading_zero_bits("4000"), 1);
    }
}
