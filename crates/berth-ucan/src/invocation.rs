//! Invocations and receipts.
//!
//! An invocation asks the node to run a command with arguments; the node
//! answers with a receipt it signs itself, linking back to the invocation.

use berth_core::error::{BerthError, BerthResult};
use berth_core::{Did, Link};
use ipld_core::ipld::Ipld;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::envelope::{EnvelopePayload, Signed};
use crate::signer::Signer;

/// Envelope tag for invocations
pub const INVOCATION_TAG: &str = "ucan/inv@1.0.0-rc.1";

/// Envelope tag for receipts
pub const RECEIPT_TAG: &str = "ucan/rct@1.0.0-rc.1";

/// Invocation payload; fields are declared in canonical key order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationPayload {
    pub cmd: String,
    pub iss: Did,
    /// Delegations authorizing the issuer to act on the subject
    pub prf: Vec<Link>,
    pub sub: Did,
    pub args: Ipld,
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
}

impl InvocationPayload {
    /// Build an invocation of `command` with typed arguments
    pub fn new<A: Serialize>(issuer: &Did, subject: &Did, command: &str, args: &A) -> BerthResult<Self> {
        Ok(Self {
            cmd: command.to_string(),
            iss: issuer.clone(),
            prf: Vec::new(),
            sub: subject.clone(),
            args: codec::to_ipld(args)?,
            nonce: crate::nonce(),
        })
    }

    pub fn with_proofs(mut self, proofs: Vec<Link>) -> Self {
        self.prf = proofs;
        self
    }

    /// Bind the arguments to a command's argument type
    pub fn bind_args<A: DeserializeOwned>(&self) -> BerthResult<A> {
        codec::from_ipld(&self.args).map_err(|e| BerthError::PolicyViolation {
            capability: self.cmd.clone(),
            reason: format!("arguments do not match the command schema: {}", e),
        })
    }
}

impl EnvelopePayload for InvocationPayload {
    const TAG: &'static str = INVOCATION_TAG;

    fn issuer(&self) -> &Did {
        &self.iss
    }
}

/// A signed invocation
pub type Invocation = Signed<InvocationPayload>;

/// Check an invocation before it is dispatched.
///
/// Verifies the issuer's signature and requires a proof whenever the issuer
/// acts on a subject other than itself. Validating the delegation chain the
/// proofs name is left to the transport.
pub fn validate(invocation: &Invocation) -> BerthResult<()> {
    invocation.verify()?;

    let payload = invocation.payload();
    if payload.iss != payload.sub && payload.prf.is_empty() {
        return Err(BerthError::MissingProof {
            command: payload.cmd.clone(),
        });
    }
    Ok(())
}

/// Error reported in a failed receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub name: String,
    pub message: String,
}

impl From<&BerthError> for Failure {
    fn from(err: &BerthError) -> Self {
        Self {
            name: err.name().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of running an invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok(Ipld),
    Error(Failure),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }
}

/// Receipt payload; fields are declared in canonical key order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub iss: Did,
    pub out: Outcome,
    /// The invocation this receipt answers
    pub ran: Link,
}

impl EnvelopePayload for ReceiptPayload {
    const TAG: &'static str = RECEIPT_TAG;

    fn issuer(&self) -> &Did {
        &self.iss
    }
}

/// A signed receipt
pub type Receipt = Signed<ReceiptPayload>;

/// Sign a receipt for `ran` with the node identity
pub fn issue_receipt(signer: &Signer, ran: &Link, out: Outcome) -> BerthResult<Receipt> {
    Receipt::seal(
        signer,
        ReceiptPayload {
            iss: signer.did().clone(),
            out,
            ran: ran.clone(),
        },
    )
}
