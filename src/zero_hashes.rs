//! The zero-hash ladder `Z[0..=256]` (`spec.md` §4.3): precomputed digests of
//! all-zero subtrees at every depth, used both to detect empty subtrees and
//! to build compact proofs. Held as state of the store handle rather than as
//! process-wide global state (Design Note in `spec.md` §9), so that two
//! independently constructed stores in the same process never interfere.

use crate::error::StoreError;
use crate::hash::{keccak256_pair, Digest};
use crate::store::BackingStore;

#[derive(Debug, Clone)]
pub struct ZeroHashes {
    /// `z[d]` is the empty-tree root for a subtree of height `256 - d`.
    /// `z[256]` is the 32-byte zero word; `z[0]` is the empty-tree root.
    z: Vec<Digest>,
}

impl ZeroHashes {
    /// Build `Z[0..=256]` against `store`, writing each `Z[d-1] -> Z[d] ++
    /// Z[d]` entry (`d` from 256 down to 1) the way the original `NewDB`
    /// does. Run once per store; rebuilding is harmless but wasteful, since
    /// every `put` here is idempotent.
    pub fn build(store: &mut dyn BackingStore) -> Result<Self, StoreError> {
        let mut z = vec![[0u8; 32]; 257];
        z[256] = [0u8; 32];

        for d in (1..=256).rev() {
            let payload = [z[d].as_slice(), z[d].as_slice()].concat();
            let parent = keccak256_pair(&z[d], &z[d]);
            z[d - 1] = parent;
            store.put(parent, payload)?;
        }

        Ok(Self { z })
    }

    /// `Z[depth]`, the empty-subtree digest at `depth` (0..=256).
    pub fn at(&self, depth: usize) -> Digest {
        self.z[depth]
    }

    /// The empty-tree root, `Z[0]`.
    pub fn empty_root(&self) -> Digest {
        self.z[0]
    }
}
