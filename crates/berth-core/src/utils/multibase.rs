//! Multibase string helpers.
//!
//! Digests and DID keys are rendered as base58btc multibase strings, i.e. a
//! leading `z` followed by the base58 (bitcoin alphabet) encoding.

use crate::error::{BerthError, BerthResult};

/// Multibase prefix for base58btc
pub const BASE58BTC_PREFIX: char = 'z';

/// Encode bytes as a base58btc multibase string
pub fn encode_base58btc(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 138 / 100 + 2);
    out.push(BASE58BTC_PREFIX);
    out.push_str(&bs58::encode(bytes).into_string());
    out
}

/// Decode a base58btc multibase string
pub fn decode_base58btc(input: &str) -> BerthResult<Vec<u8>> {
    let body = input
        .strip_prefix(BASE58BTC_PREFIX)
        .ok_or_else(|| BerthError::InvalidDigest {
            input: input.to_string(),
            reason: "expected base58btc multibase prefix 'z'".to_string(),
        })?;

    bs58::decode(body)
        .into_vec()
        .map_err(|e| BerthError::InvalidDigest {
            input: input.to_string(),
            reason: format!("invalid base58btc: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_required() {
        assert!(decode_base58btc("Qm1234").is_err());
        assert!(decode_base58btc("z0OIl").is_err());
    }

    #[test]
    fn test_encode_has_prefix() {
        let encoded = encode_base58btc(&[0x12, 0x20, 0xff]);
        assert!(encoded.starts_with('z'));
        assert_eq!(decode_base58btc(&encoded).unwrap(), vec![0x12, 0x20, 0xff]);
    }
}
