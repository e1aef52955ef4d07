//! Location commitments.
//!
//! A location commitment is a delegation from the node to a space asserting
//! that the whole of a blob can be fetched from a URL. Its policy pins the
//! space, the content digest, the URL and the byte range; it never expires.

use berth_core::error::BerthResult;
use berth_core::{Did, Digest};
use tracing::debug;
use url::Url;

use crate::delegation::{Delegation, DelegationPayload};
use crate::policy::Statement;
use crate::signer::Signer;

/// Command asserted by a location commitment
pub const LOCATION_COMMAND: &str = "/assert/location";

/// Policy statements describing where a blob lives
pub fn location_policy(space: &Did, digest: &Digest, url: &Url, size: u64) -> Vec<Statement> {
    vec![
        Statement::equal(".space", space.as_str()),
        Statement::equal(".content", digest.to_multibase()),
        Statement::equal(".location[0].url", url.as_str()),
        Statement::equal(".range.offset", 0u64),
        Statement::equal(".range.length", size),
    ]
}

/// Sign a commitment that `digest` is retrievable in full at `url` for `space`
pub fn issue_location_commitment(
    signer: &Signer,
    space: &Did,
    digest: &Digest,
    url: &Url,
    size: u64,
) -> BerthResult<Delegation> {
    let payload = DelegationPayload::new(signer.did(), space, signer.did(), LOCATION_COMMAND)
        .with_policy(location_policy(space, digest, url, size));
    let commitment = Delegation::seal(signer, payload)?;
    debug!(space = %space, blob = %digest, site = %commitment.link(), "issued location commitment");
    Ok(commitment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy;
    use ipld_core::ipld::Ipld;
    use std::collections::BTreeMap;

    fn claim(space: &Did, digest: &Digest, url: &Url, offset: u64, length: u64) -> Ipld {
        let mut location = BTreeMap::new();
        location.insert("url".to_string(), Ipld::String(url.to_string()));
        let mut range = BTreeMap::new();
        range.insert("offset".to_string(), Ipld::from(offset));
        range.insert("length".to_string(), Ipld::from(length));

        let mut root = BTreeMap::new();
        root.insert("space".to_string(), Ipld::String(space.to_string()));
        root.insert("content".to_string(), Ipld::String(digest.to_multibase()));
        root.insert("location".to_string(), Ipld::List(vec![Ipld::Map(location)]));
        root.insert("range".to_string(), Ipld::Map(range));
        Ipld::Map(root)
    }

    #[test]
    fn test_commitment_shape() {
        let node = Signer::generate().unwrap();
        let space = Did::parse("did:key:z6MkSpace").unwrap();
        let digest = Digest::sha256(b"custody");
        let url = Url::parse(&format!("http://localhost:3000/blob/{}", digest)).unwrap();

        let commitment = issue_location_commitment(&node, &space, &digest, &url, 7).unwrap();
        commitment.verify().unwrap();

        let payload = commitment.payload();
        assert_eq!(payload.cmd, LOCATION_COMMAND);
        assert_eq!(&payload.iss, node.did());
        assert_eq!(&payload.sub, node.did());
        assert_eq!(payload.aud, space);
        assert_eq!(payload.exp, None);
        assert_eq!(payload.pol, location_policy(&space, &digest, &url, 7));

        let selectors: Vec<&str> = payload.pol.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(
            selectors,
            vec![".space", ".content", ".location[0].url", ".range.offset", ".range.length"]
        );

        // the policy admits exactly the whole blob at this url
        policy::check(&payload.pol, &claim(&space, &digest, &url, 0, 7), LOCATION_COMMAND).unwrap();
        assert!(policy::check(&payload.pol, &claim(&space, &digest, &url, 0, 6), LOCATION_COMMAND).is_err());
        assert!(policy::check(&payload.pol, &claim(&space, &digest, &url, 1, 7), LOCATION_COMMAND).is_err());
    }

    #[test]
    fn test_each_commitment_is_distinct() {
        let node = Signer::generate().unwrap();
        let space = Did::parse("did:key:z6MkSpace").unwrap();
        let digest = Digest::sha256(b"custody");
        let url = Url::parse("http://localhost:3000/blob/x").unwrap();

        let a = issue_location_commitment(&node, &space, &digest, &url, 7).unwrap();
        let b = issue_location_commitment(&node, &space, &digest, &url, 7).unwrap();
        assert_ne!(a.link(), b.link());
    }
}
