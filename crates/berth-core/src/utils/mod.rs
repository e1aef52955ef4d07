//! Utility functions for berth operations.

pub mod hash;
pub mod multibase;
pub mod time;

// Re-export commonly used utilities
pub use hash::{sha256, Sha256Stream};
pub use multibase::{decode_base58btc, encode_base58btc};
pub use time::now_unix;
