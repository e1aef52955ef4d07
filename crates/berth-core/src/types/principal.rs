//! Principal identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BerthError, BerthResult};

/// A decentralized identifier, e.g. `did:key:z6Mk...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string
    pub fn parse(input: &str) -> BerthResult<Self> {
        let invalid = |reason: &str| BerthError::InvalidDid {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let rest = input.strip_prefix("did:").ok_or_else(|| invalid("missing 'did:' scheme"))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing method-specific identifier"))?;

        if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(invalid("method must be lowercase alphanumeric"));
        }
        if id.is_empty() {
            return Err(invalid("empty method-specific identifier"));
        }

        Ok(Self(input.to_string()))
    }

    /// DID method name (`key`, `web`, ...)
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = BerthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = BerthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}
