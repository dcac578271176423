//! Keccak-256 wrapper. This is the pre-standardization variant (`sha3::Keccak256`),
//! not NIST SHA3-256 — the two differ in padding and produce different digests.

use sha3::{Digest as _, Keccak256};

/// A 32-byte digest: the output of [`keccak256`] and the identity of every tree node.
pub type Digest = [u8; 32];

/// `H(bytes) -> 32 bytes`.
pub fn keccak256(data: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `H(left ++ right)`, the internal-node combine used by every variant.
pub fn keccak256_pair(left: &[u8], right: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_digest_matches_known_constant() {
        let got = keccak256(b"");
        assert_eq!(hex::encode(got), "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");
    }
}
