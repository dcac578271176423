//! Variant B: the uncollapsed canonical binary tree (`spec.md` §4.4). Every
//! internal node is exactly 64 bytes (`left ++ right`); depth is always 256.
//! This is the only variant that exposes membership proofs.

use crate::error::TreeError;
use crate::hash::{keccak256_pair, Digest};
use crate::path::{msb, path_from_key, shl1};
use crate::store::BackingStore;
use crate::zero_hashes::ZeroHashes;
use serde::{Deserialize, Serialize};

/// A membership/non-membership proof: one sibling per level, depth 0 first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: Vec<Digest>,
}

/// The empty-tree root, `Z[0]`.
pub fn new_tree(zero_hashes: &ZeroHashes) -> Digest {
    zero_hashes.empty_root()
}

fn expect_internal(payload: &[u8]) -> Result<(&[u8], &[u8]), TreeError> {
    if payload.len() != 64 {
        return Err(TreeError::UnexpectedPayloadLength(payload.len()));
    }
    Ok((&payload[..32], &payload[32..]))
}

/// Read the 32-byte value stored at `key` under `root`.
pub fn get(
    store: &mut dyn BackingStore,
    root: Digest,
    key: &Digest,
) -> Result<Digest, TreeError> {
    let mut v = root;
    let mut path = path_from_key(key);

    for _ in 0..256 {
        let node = store
            .get(&v)?
            .ok_or(TreeError::MissingNode)?;
        let (left, right) = expect_internal(&node)?;
        v = if msb(path) == 1 {
            right.try_into().unwrap()
        } else {
            left.try_into().unwrap()
        };
        path = shl1(path);
    }

    Ok(v)
}

/// Write `value` at `key`, returning the new root. `value` must be exactly
/// 32 bytes — variant B's leaves live at depth 256 with no collapsing.
pub fn update(
    store: &mut dyn BackingStore,
    root: Digest,
    key: &Digest,
    value: &Digest,
) -> Result<Digest, TreeError> {
    let mut v = root;
    let mut path = path_from_key(key);
    // side_nodes[i] is the side-node at depth i, paired with the bit consumed
    // at depth i (1 = took the right child).
    let mut side_nodes = Vec::with_capacity(256);
    let mut bits = Vec::with_capacity(256);

    for _ in 0..256 {
        let node = store
            .get(&v)?
            .ok_or(TreeError::MissingNode)?;
        let (left, right) = expect_internal(&node)?;
        let bit = msb(path);
        let (side, next): (Digest, Digest) = if bit == 1 {
            (left.try_into().unwrap(), right.try_into().unwrap())
        } else {
            (right.try_into().unwrap(), left.try_into().unwrap())
        };
        side_nodes.push(side);
        bits.push(bit);
        v = next;
        path = shl1(path);
    }

    // Ascend from depth 255 back to depth 0, combining the running value
    // with each side-node in turn.
    let mut running: Digest = *value;
    for i in (0..256).rev() {
        let payload = if bits[i] == 1 {
            [side_nodes[i].as_slice(), running.as_slice()].concat()
        } else {
            [running.as_slice(), side_nodes[i].as_slice()].concat()
        };
        let digest = keccak256_pair(&payload[..32], &payload[32..]);
        store.put(digest, payload)?;
        running = digest;
    }

    Ok(running)
}

/// Record the side-node (non-taken child) at every depth while descending to `key`.
pub fn make_merkle_proof(
    store: &mut dyn BackingStore,
    root: Digest,
    key: &Digest,
) -> Result<MerkleProof, TreeError> {
    let mut v = root;
    let mut path = path_from_key(key);
    let mut siblings = Vec::with_capacity(256);

    for _ in 0..256 {
        let node = store
            .get(&v)?
            .ok_or(TreeError::MissingNode)?;
        let (left, right) = expect_internal(&node)?;
        let (side, next): (Digest, Digest) = if msb(path) == 1 {
            (left.try_into().unwrap(), right.try_into().unwrap())
        } else {
            (right.try_into().unwrap(), left.try_into().unwrap())
        };
        siblings.push(side);
        v = next;
        path = shl1(path);
    }

    Ok(MerkleProof { siblings })
}

/// Verify `proof` witnesses `value` at `key` under `root`.
pub fn verify_proof(proof: &MerkleProof, root: &Digest, key: &Digest, value: &Digest) -> bool {
    if proof.siblings.len() != 256 {
        return false;
    }

    let mut path = path_from_key(key);
    let mut running: Digest = *value;

    for i in 0..256 {
        let sibling = proof.siblings[255 - i];
        let bit = (path.low_u32() & 1) as u8;
        let payload = if bit == 1 {
            [sibling.as_slice(), running.as_slice()].concat()
        } else {
            [running.as_slice(), sibling.as_slice()].concat()
        };
        running = keccak256_pair(&payload[..32], &payload[32..]);
        path >>= 1;
    }

    &running == root
}

/// Pack a proof into a 32-byte omission bitmap followed by the
/// concatenation of every sibling that doesn't equal its depth's zero-hash.
pub fn compress_proof(proof: &MerkleProof, zero_hashes: &ZeroHashes) -> Vec<u8> {
    let mut bits = [0u8; 32];
    let mut out = Vec::new();

    for (i, sibling) in proof.siblings.iter().enumerate() {
        if *sibling == zero_hashes.at(i + 1) {
            bits[i / 8] |= 1 << (i % 8);
        } else {
            out.extend_from_slice(sibling);
        }
    }

    let mut compressed = bits.to_vec();
    compressed.extend(out);
    compressed
}

/// Inverse of [`compress_proof`].
pub fn decompress_proof(compressed: &[u8], zero_hashes: &ZeroHashes) -> Result<MerkleProof, TreeError> {
    if compressed.len() < 32 {
        return Err(TreeError::UnexpectedPayloadLength(compressed.len()));
    }
    let bits = &compressed[..32];
    let mut pos = 32;
    let mut siblings = Vec::with_capacity(256);

    for i in 0..256 {
        if bits[i / 8] & (1 << (i % 8)) != 0 {
            siblings.push(zero_hashes.at(i + 1));
        } else {
            if pos + 32 > compressed.len() {
                return Err(TreeError::UnexpectedPayloadLength(compressed.len()));
            }
            let mut d = [0u8; 32];
            d.copy_from_slice(&compressed[pos..pos + 32]);
            siblings.push(d);
            pos += 32;
        }
    }

    Ok(MerkleProof { siblings })
}
