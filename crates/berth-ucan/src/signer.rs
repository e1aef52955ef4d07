//! Node identity.
//!
//! A node signs receipts and location commitments with an Ed25519 key. Its
//! principal is the corresponding `did:key`, the multibase encoding of the
//! ed25519-pub multicodec prefix followed by the 32 byte public key.

use berth_core::error::{BerthError, BerthResult};
use berth_core::utils::{decode_base58btc, encode_base58btc};
use berth_core::Did;
use camino::Utf8Path;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use std::fmt;

/// Multicodec prefix for ed25519 public keys (varint 0xed)
const ED25519_PUB: [u8; 2] = [0xed, 0x01];

/// Signing identity of this node
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    did: Did,
}

impl Signer {
    /// Wrap an existing signing key
    pub fn from_key(key: SigningKey) -> BerthResult<Self> {
        let did = did_key(&key.verifying_key())?;
        Ok(Self { key, did })
    }

    /// Generate a fresh random identity
    pub fn generate() -> BerthResult<Self> {
        Self::from_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Parse a PKCS#8 PEM encoded private key
    pub fn from_pem(pem: &str) -> BerthResult<Self> {
        let key = SigningKey::from_pkcs8_pem(pem).map_err(|e| BerthError::Signing {
            message: format!("invalid Ed25519 PKCS#8 PEM key: {}", e),
        })?;
        Self::from_key(key)
    }

    /// Load a PEM key file
    pub fn load(path: &Utf8Path) -> BerthResult<Self> {
        let pem = std::fs::read_to_string(path)
            .map_err(|e| BerthError::io(format!("Failed to read key file {}", path), e))?;
        Self::from_pem(&pem)
    }

    /// Encode the private key as PKCS#8 PEM
    pub fn to_pem(&self) -> BerthResult<String> {
        self.key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| BerthError::Signing {
                message: format!("failed to encode key: {}", e),
            })
    }

    /// Write the private key to `path` as PEM
    pub fn save(&self, path: &Utf8Path) -> BerthResult<()> {
        let pem = self.to_pem()?;
        std::fs::write(path, pem)
            .map_err(|e| BerthError::io(format!("Failed to write key file {}", path), e))
    }

    /// The node's principal
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("did", &self.did).finish_non_exhaustive()
    }
}

/// Derive the `did:key` for an Ed25519 public key
pub fn did_key(key: &VerifyingKey) -> BerthResult<Did> {
    let mut bytes = Vec::with_capacity(ED25519_PUB.len() + 32);
    bytes.extend_from_slice(&ED25519_PUB);
    bytes.extend_from_slice(key.as_bytes());
    Did::parse(&format!("did:key:{}", encode_base58btc(&bytes)))
}

/// Recover the Ed25519 public key from a `did:key`
pub fn verifying_key(did: &Did) -> BerthResult<VerifyingKey> {
    let invalid = |reason: String| BerthError::InvalidDid {
        input: did.to_string(),
        reason,
    };

    let encoded = did
        .as_str()
        .strip_prefix("did:key:")
        .ok_or_else(|| invalid("only did:key principals can be verified".to_string()))?;
    let bytes = decode_base58btc(encoded).map_err(|e| invalid(e.to_string()))?;

    let raw = bytes
        .strip_prefix(&ED25519_PUB[..])
        .ok_or_else(|| invalid("not an ed25519 public key".to_string()))?;
    let raw: &[u8; 32] = raw
        .try_into()
        .map_err(|_| invalid(format!("expected 32 key bytes, got {}", raw.len())))?;

    VerifyingKey::from_bytes(raw).map_err(|e| invalid(e.to_string()))
}

/// Check an Ed25519 signature made by `did` over `message`
pub fn verify(did: &Did, message: &[u8], signature: &[u8]) -> BerthResult<()> {
    let key = verifying_key(did)?;
    let signature = Signature::from_slice(signature).map_err(|_| BerthError::InvalidSignature {
        what: format!("message from {}", did),
    })?;
    key.verify(message, &signature)
        .map_err(|_| BerthError::InvalidSignature {
            what: format!("message from {}", did),
        })
}
