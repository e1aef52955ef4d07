//! Sharded on-disk layout shared by the filesystem stores.

use berth_core::Digest;
use camino::{Utf8Path, Utf8PathBuf};

/// Shard directory for hashes too short to split
const SHORT_SHARD: &str = "_";

/// Directory holding entries for a digest: root/ab/cd, or root/_ when the
/// hash has fewer than two bytes
pub(crate) fn shard_dir(root: &Utf8Path, digest: &Digest) -> Utf8PathBuf {
    let hex = digest.to_hex();
    match (hex.get(0..2), hex.get(2..4)) {
        (Some(outer), Some(inner)) => root.join(outer).join(inner),
        _ => root.join(SHORT_SHARD),
    }
}

/// Full path for a digest entry, with an optional file extension
pub(crate) fn shard_path(root: &Utf8Path, digest: &Digest, extension: Option<&str>) -> Utf8PathBuf {
    let name = match extension {
        Some(ext) => format!("{}.{}", digest.to_multibase(), ext),
        None => digest.to_multibase(),
    };
    shard_dir(root, digest).join(name)
}
