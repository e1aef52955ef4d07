//! Signed envelopes.
//!
//! Delegations, invocations and receipts share one container:
//!
//! ```text
//! [ signature, { "h": varsig-header, "<type tag>": payload } ]
//! ```
//!
//! The signature covers the DAG-CBOR encoding of the inner map. An envelope
//! is named by the CID of its full encoding.

use berth_core::error::{BerthError, BerthResult};
use berth_core::{Did, Link};
use ipld_core::ipld::Ipld;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::codec;
use crate::signer::{self, Signer};

/// Varsig header: ed25519 signature over a DAG-CBOR payload
pub const VARSIG_HEADER: [u8; 4] = [0x34, 0xed, 0x01, 0x71];

const HEADER_KEY: &str = "h";

/// A payload that can be sealed into an envelope
pub trait EnvelopePayload: Serialize + DeserializeOwned {
    /// Type tag keying the payload inside the envelope
    const TAG: &'static str;

    /// Principal whose key must have produced the signature
    fn issuer(&self) -> &Did;
}

/// A decoded or freshly sealed envelope
#[derive(Debug, Clone)]
pub struct Signed<P> {
    payload: P,
    signature: Vec<u8>,
    signed_bytes: Vec<u8>,
    bytes: Vec<u8>,
    link: Link,
}

impl<P: EnvelopePayload> Signed<P> {
    /// Sign `payload` with `signer`
    pub fn seal(signer: &Signer, payload: P) -> BerthResult<Self> {
        let mut inner = BTreeMap::new();
        inner.insert(HEADER_KEY.to_string(), Ipld::Bytes(VARSIG_HEADER.to_vec()));
        inner.insert(P::TAG.to_string(), codec::to_ipld(&payload)?);
        let inner = Ipld::Map(inner);

        let signed_bytes = codec::to_vec(&inner)?;
        let signature = signer.sign(&signed_bytes).to_vec();

        let envelope = Ipld::List(vec![Ipld::Bytes(signature.clone()), inner]);
        let bytes = codec::to_vec(&envelope)?;
        let link = Link::of_dag_cbor(&bytes);

        Ok(Self {
            payload,
            signature,
            signed_bytes,
            bytes,
            link,
        })
    }

    /// Decode an envelope; the signature is not checked until [`Signed::verify`]
    pub fn decode(bytes: &[u8]) -> BerthResult<Self> {
        let malformed = |reason: String| BerthError::Encoding {
            message: format!("malformed {} envelope: {}", P::TAG, reason),
        };

        let envelope: Ipld = codec::from_slice(bytes)?;
        let Ipld::List(parts) = envelope else {
            return Err(malformed("expected a two element list".to_string()));
        };
        let [Ipld::Bytes(signature), inner] = <[Ipld; 2]>::try_from(parts)
            .map_err(|parts| malformed(format!("expected 2 elements, got {}", parts.len())))?
        else {
            return Err(malformed("first element must be signature bytes".to_string()));
        };

        let Ipld::Map(fields) = &inner else {
            return Err(malformed("second element must be a map".to_string()));
        };
        match fields.get(HEADER_KEY) {
            Some(Ipld::Bytes(header)) if header.as_slice() == VARSIG_HEADER => {},
            Some(_) => return Err(malformed("unsupported signature header".to_string())),
            None => return Err(malformed("missing signature header".to_string())),
        }
        let payload = fields
            .get(P::TAG)
            .ok_or_else(|| malformed(format!("missing '{}' payload", P::TAG)))?;
        let payload: P = codec::from_ipld(payload)?;

        Ok(Self {
            payload,
            signature,
            signed_bytes: codec::to_vec(&inner)?,
            bytes: bytes.to_vec(),
            link: Link::of_dag_cbor(bytes),
        })
    }

    /// Check the signature against the payload's issuer
    pub fn verify(&self) -> BerthResult<()> {
        signer::verify(self.payload.issuer(), &self.signed_bytes, &self.signature).map_err(|e| match e {
            BerthError::InvalidSignature { .. } => BerthError::InvalidSignature {
                what: format!("{} {}", P::TAG, self.link),
            },
            other => other,
        })
    }
}

impl<P> Signed<P> {
    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Encoded envelope bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// CID of the encoded envelope
    pub fn link(&self) -> &Link {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        iss: Did,
        text: String,
    }

    impl EnvelopePayload for Note {
        const TAG: &'static str = "test/note@1";

        fn issuer(&self) -> &Did {
            &self.iss
        }
    }

    fn note(signer: &Signer) -> Note {
        Note {
            iss: signer.did().clone(),
            text: "hello".to_string(),
        }
    }

    #[test]
    fn test_seal_decode_verify() {
        let signer = Signer::generate().unwrap();
        let sealed = Signed::seal(&signer, note(&signer)).unwrap();
        sealed.verify().unwrap();

        let decoded = Signed::<Note>::decode(sealed.as_bytes()).unwrap();
        assert_eq!(decoded.payload(), sealed.payload());
        assert_eq!(decoded.link(), sealed.link());
        assert_eq!(decoded.signature(), sealed.signature());
        decoded.verify().unwrap();
    }

    #[test]
    fn test_envelope_layout() {
        let signer = Signer::generate().unwrap();
        let sealed = Signed::seal(&signer, note(&signer)).unwrap();

        let ipld: Ipld = codec::from_slice(sealed.as_bytes()).unwrap();
        let Ipld::List(parts) = ipld else { panic!("not a list") };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Ipld::Bytes(sig) if sig.len() == 64));
        let Ipld::Map(inner) = &parts[1] else { panic!("not a map") };
        assert_eq!(inner.get("h"), Some(&Ipld::Bytes(VARSIG_HEADER.to_vec())));
        assert!(inner.contains_key("test/note@1"));
    }

    #[test]
    fn test_forged_issuer_fails_verification() {
        let signer = Signer::generate().unwrap();
        let impostor = Signer::generate().unwrap();

        // signed by the impostor but claiming to come from `signer`
        let sealed = Signed::seal(&impostor, note(&signer)).unwrap();
        let decoded = Signed::<Note>::decode(sealed.as_bytes()).unwrap();
        assert!(matches!(
            decoded.verify().unwrap_err(),
            BerthError::InvalidSignature { .. }
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_shapes() {
        let not_list = codec::to_vec(&Ipld::Integer(1)).unwrap();
        assert!(Signed::<Note>::decode(&not_list).is_err());

        let short = codec::to_vec(&Ipld::List(vec![Ipld::Bytes(vec![0; 64])])).unwrap();
        assert!(Signed::<Note>::decode(&short).is_err());

        let signer = Signer::generate().unwrap();
        let mut inner = BTreeMap::new();
        inner.insert("h".to_string(), Ipld::Bytes(vec![0x34, 0x00]));
        inner.insert(
            "test/note@1".to_string(),
            codec::to_ipld(&note(&signer)).unwrap(),
        );
        let wrong_header = codec::to_vec(&Ipld::List(vec![
            Ipld::Bytes(vec![0; 64]),
            Ipld::Map(inner),
        ]))
        .unwrap();
        let err = Signed::<Note>::decode(&wrong_header).unwrap_err();
        assert!(err.to_string().contains("unsupported signature header"));
    }
}
