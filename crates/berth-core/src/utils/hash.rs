//! SHA2-256 hashing utilities for content integrity.
//!
//! Blobs are addressed by sha2-256 multihashes; uploads are hashed as they
//! stream so the payload store can verify content without buffering it.

use sha2::{Digest as _, Sha256};

/// Compute the SHA2-256 hash of data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Incremental SHA2-256 hasher that also counts the bytes it has seen
#[derive(Debug, Default, Clone)]
pub struct Sha256Stream {
    hasher: Sha256,
    len: u64,
}

impl Sha256Stream {
    /// Create a new streaming hasher
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of data
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Number of bytes hashed so far
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether no bytes have been hashed yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish hashing and return the digest bytes
    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"hello world");
        assert_eq!(
            hex::encode(hash),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_stream_matches_one_shot() {
        let mut stream = Sha256Stream::new();
        stream.update(b"hello ");
        stream.update(b"world");
        assert_eq!(stream.len(), 11);
        assert_eq!(stream.finalize(), sha256(b"hello world"));
    }
}
