//! Conversion between a 32-byte key and the 256-bit integer "path" used to
//! descend the tree, MSB-first. Mirrors the original `KeyToPath`/`PathToKey`
//! pair, but on a fixed-width `U256` instead of an arbitrary-precision
//! integer — `U256`'s shifts already truncate to 256 bits, which is exactly
//! what the spec's "left shift by 1 to advance" needs.

use crate::hash::Digest;
use primitive_types::U256;

/// Interpret a 32-byte key as a big-endian unsigned 256-bit path.
pub fn path_from_key(key: &Digest) -> U256 {
    U256::from_big_endian(key)
}

/// Zero-pad a path back out to a 32-byte big-endian key.
pub fn key_from_path(path: U256) -> Digest {
    let mut out = [0u8; 32];
    path.to_big_endian(&mut out);
    out
}

/// The most significant bit of `path` (bit 255), as 0 or 1.
#[inline]
pub fn msb(path: U256) -> u8 {
    ((path >> 255) & U256::one()).low_u32() as u8
}

/// Advance descent by one bit: drop the MSB, shift the remaining 255 bits up.
#[inline]
pub fn shl1(path: U256) -> U256 {
    path << 1
}

/// The top nibble of `path` (bits 255..252), as a value in `0..16`.
#[inline]
pub fn top_nibble(path: U256) -> usize {
    (((path >> 252) & U256::from(0xFu8)).low_u32()) as usize
}

/// Advance descent by one nibble (4 bits).
#[inline]
pub fn shl4(path: U256) -> U256 {
    path << 4
}
