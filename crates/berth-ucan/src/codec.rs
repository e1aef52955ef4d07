//! DAG-CBOR encoding helpers.
//!
//! Everything that is signed or linked goes through these functions so the
//! byte form is the canonical DAG-CBOR one.

use berth_core::error::{BerthError, BerthResult};
use ipld_core::ipld::Ipld;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value as DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> BerthResult<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value)
        .map_err(|e| BerthError::encoding(format!("Failed to encode DAG-CBOR: {}", e)))
}

/// Decode DAG-CBOR bytes
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BerthResult<T> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| BerthError::encoding(format!("Failed to decode DAG-CBOR: {}", e)))
}

/// Convert a typed value into its IPLD data model form
pub fn to_ipld<T: Serialize>(value: &T) -> BerthResult<Ipld> {
    from_slice(&to_vec(value)?)
}

/// Bind an IPLD value to a typed structure
pub fn from_ipld<T: DeserializeOwned>(value: &Ipld) -> BerthResult<T> {
    from_slice(&to_vec(value)?)
}
