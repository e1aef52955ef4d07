//! Content links (CIDv1).
//!
//! Links name signed artifacts (invocations, delegations, receipts) by the
//! sha2-256 hash of their DAG-CBOR encoding.

use ipld_core::cid::Cid;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::Digest;
use crate::error::{BerthError, BerthResult};

/// Multicodec code for DAG-CBOR
pub const DAG_CBOR: u64 = 0x71;

/// A CIDv1 link
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Link(Cid);

impl Link {
    /// Link to DAG-CBOR encoded bytes
    pub fn of_dag_cbor(bytes: &[u8]) -> Self {
        let digest = Digest::sha256(bytes);
        Self(Cid::new_v1(DAG_CBOR, digest.multihash().clone()))
    }

    /// Wrap an existing CID
    pub fn from_cid(cid: Cid) -> Self {
        Self(cid)
    }

    /// Access the underlying CID
    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Raw binary CID
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }
}

impl From<Cid> for Link {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.0)
    }
}

impl FromStr for Link {
    type Err = BerthError;

    fn from_str(s: &str) -> BerthResult<Self> {
        Cid::try_from(s).map(Self).map_err(|e| BerthError::Encoding {
            message: format!("invalid link '{}': {}", s, e),
        })
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.0.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(D::Error::custom)
        } else {
            Cid::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_is_deterministic() {
        let a = Link::of_dag_cbor(b"\xa0");
        let b = Link::of_dag_cbor(b"\xa0");
        assert_eq!(a, b);
        assert_ne!(a, Link::of_dag_cbor(b"\xa1"));
        assert_eq!(a.cid().codec(), DAG_CBOR);
    }

    #[test]
    fn test_link_text_form() {
        let link = Link::of_dag_cbor(b"\xa0");
        let text = link.to_string();
        assert!(text.starts_with("bafy"));
        assert_eq!(text.parse::<Link>().unwrap(), link);
    }

    #[test]
    fn test_link_cbor_tag() {
        let link = Link::of_dag_cbor(b"\xa0");
        let encoded = serde_ipld_dagcbor::to_vec(&link).unwrap();
        // tag 42
        assert_eq!(&encoded[..2], &[0xd8, 0x2a]);
        let decoded: Link = serde_ipld_dagcbor::from_slice(&encoded).unwrap();
        assert_eq!(decoded, link);
    }
}
