//! A sparse Merkle tree core over 256-bit keys, with three interchangeable
//! node encodings (variants B, O and H) sharing one content-addressed
//! backing store and one zero-hash ladder.

pub mod error;
pub mod hash;
pub mod path;
pub mod store;
pub mod variant_b;
pub mod variant_h;
pub mod variant_o;
pub mod zero_hashes;

pub use error::{StoreError, TreeError};
pub use hash::{keccak256, keccak256_pair, Digest};
pub use store::{BackingStore, LmdbStore, MemoryStore};
pub use zero_hashes::ZeroHashes;
