//! Delegations: signed grants of a command from issuer to audience.

use berth_core::Did;
use serde::{Deserialize, Serialize};

use crate::envelope::{EnvelopePayload, Signed};
use crate::policy::Statement;

/// Envelope tag for delegations
pub const DELEGATION_TAG: &str = "ucan/dlg@1.0.0-rc.1";

/// Delegation payload; fields are declared in canonical key order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationPayload {
    pub aud: Did,
    pub cmd: String,
    /// Unix seconds; `None` encodes as null and never expires
    pub exp: Option<u64>,
    pub iss: Did,
    pub pol: Vec<Statement>,
    pub sub: Did,
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
}

impl DelegationPayload {
    /// Start a non-expiring delegation with an empty policy and a random nonce
    pub fn new(issuer: &Did, audience: &Did, subject: &Did, command: &str) -> Self {
        Self {
            aud: audience.clone(),
            cmd: command.to_string(),
            exp: None,
            iss: issuer.clone(),
            pol: Vec::new(),
            sub: subject.clone(),
            nonce: crate::nonce(),
        }
    }

    pub fn with_policy(mut self, policy: Vec<Statement>) -> Self {
        self.pol = policy;
        self
    }

    pub fn with_expiration(mut self, expires: u64) -> Self {
        self.exp = Some(expires);
        self
    }

    /// Whether the delegation has lapsed at `now` (unix seconds)
    pub fn is_expired(&self, now: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

impl EnvelopePayload for DelegationPayload {
    const TAG: &'static str = DELEGATION_TAG;

    fn issuer(&self) -> &Did {
        &self.iss
    }
}

/// A signed delegation
pub type Delegation = Signed<DelegationPayload>;
