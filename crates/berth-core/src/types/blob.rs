//! Content addresses.
//!
//! A `Digest` is a multihash: a self-describing hash whose wire form is the
//! raw multihash bytes and whose text form is a base58btc multibase string.

use ipld_core::cid::multihash::Multihash;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{BerthError, BerthResult};
use crate::utils::{decode_base58btc, encode_base58btc, sha256};

/// Multicodec code for sha2-256
pub const SHA2_256: u64 = 0x12;

/// A multihash identifying blob content
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest(Multihash<64>);

impl Digest {
    /// Hash content with sha2-256 and wrap it as a multihash
    pub fn sha256(content: &[u8]) -> Self {
        Self::from_sha256(sha256(content))
    }

    /// Wrap raw sha2-256 digest bytes
    pub fn from_sha256(hash: [u8; 32]) -> Self {
        // 32 bytes always fits a 64 byte multihash
        match Multihash::wrap(SHA2_256, &hash) {
            Ok(mh) => Self(mh),
            Err(_) => unreachable!("sha2-256 digest exceeds multihash capacity"),
        }
    }

    /// Parse raw multihash bytes
    pub fn from_bytes(bytes: &[u8]) -> BerthResult<Self> {
        Multihash::from_bytes(bytes)
            .map(Self)
            .map_err(|e| BerthError::InvalidDigest {
                input: hex::encode(bytes),
                reason: e.to_string(),
            })
    }

    /// Parse a base58btc multibase encoded multihash
    pub fn from_multibase(input: &str) -> BerthResult<Self> {
        let bytes = decode_base58btc(input)?;
        Multihash::from_bytes(&bytes)
            .map(Self)
            .map_err(|e| BerthError::InvalidDigest {
                input: input.to_string(),
                reason: e.to_string(),
            })
    }

    /// Raw multihash bytes (code, length, digest)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Base58btc multibase rendering used in URLs and logs
    pub fn to_multibase(&self) -> String {
        encode_base58btc(&self.to_bytes())
    }

    /// Multihash function code
    pub fn code(&self) -> u64 {
        self.0.code()
    }

    /// The hash bytes without the multihash prefix
    pub fn hash_bytes(&self) -> &[u8] {
        self.0.digest()
    }

    /// Hex encoding of the hash bytes, used for path sharding
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash_bytes())
    }

    /// Access the underlying multihash
    pub fn multihash(&self) -> &Multihash<64> {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_multibase())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_multibase())
    }
}

impl FromStr for Digest {
    type Err = BerthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_multibase(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_multibase())
        } else {
            serde_bytes::Bytes::new(&self.to_bytes()).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_multibase(&s).map_err(D::Error::custom)
        } else {
            let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Self::from_bytes(&bytes).map_err(D::Error::custom)
        }
    }
}

/// A content-addressed blob: digest plus declared size in bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blob {
    pub size: u64,
    pub digest: Digest,
}

impl Blob {
    /// Create a new blob descriptor
    pub fn new(digest: Digest, size: u64) -> Self {
        Self { size, digest }
    }

    /// Describe in-memory content as a sha2-256 blob
    pub fn from_content(content: &[u8]) -> Self {
        Self::new(Digest::sha256(content), content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_multihash_layout() {
        let digest = Digest::sha256(b"hello world");
        let bytes = digest.to_bytes();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[..2], &[0x12, 0x20]);
        assert_eq!(digest.code(), SHA2_256);
        assert_eq!(digest.hash_bytes(), &sha256(b"hello world"));
    }

    #[test]
    fn test_multibase_parse() {
        let digest = Digest::sha256(b"hello world");
        let text = digest.to_string();
        assert!(text.starts_with("zQm"));
        assert_eq!(text.parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn test_malformed_digest_rejected() {
        assert!("not-a-digest".parse::<Digest>().is_err());
        assert!(Digest::from_bytes(&[0x12, 0x20, 0x01]).is_err());
    }

    #[test]
    fn test_json_uses_multibase() {
        let blob = Blob::from_content(b"abc");
        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["size"], 3);
        assert_eq!(json["digest"], blob.digest.to_string());
    }

    #[test]
    fn test_cbor_uses_raw_multihash_bytes() {
        let blob = Blob::from_content(b"abc");
        let encoded = serde_ipld_dagcbor::to_vec(&blob).unwrap();
        let decoded: Blob = serde_ipld_dagcbor::from_slice(&encoded).unwrap();
        assert_eq!(decoded, blob);
        // byte string header for 34 bytes: major type 2, one-byte length
        let needle = [&[0x58, 34][..], &blob.digest.to_bytes()[..]].concat();
        assert!(encoded.windows(needle.len()).any(|w| w == needle.as_slice()));
    }
}
