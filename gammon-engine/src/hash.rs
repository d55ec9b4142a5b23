//! Bucket hashing for the evaluation cache.
//!
//! A MurmurHash3 x86_32 style hash. The evaluation context is mixed in first
//! as if it were a leading key word, followed by the 7 words of a PackedKey.

use crate::key::PackedKey;

/// HashKind is an alias for the type of a bucket hash.
pub type HashKind = u32;

const C1: HashKind = 0xcc9e2d51;
const C2: HashKind = 0x1b873593;
const N: HashKind = 0xe6546b64;

#[inline(always)]
fn scramble(k: HashKind) -> HashKind {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline(always)]
fn combine(hash: HashKind, k: HashKind) -> HashKind {
    (hash ^ k).rotate_left(13).wrapping_mul(5).wrapping_add(N)
}

#[inline(always)]
fn finalize(mut hash: HashKind) -> HashKind {
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^= hash >> 16;
    hash
}

/// Returns the bucket of `key` under `context`, masked with `hash_mask`.
#[inline]
pub fn hash_key(hash_mask: HashKind, key: &PackedKey, context: u32) -> HashKind {
    let hash = key
        .words()
        .iter()
        .fold(combine(0, scramble(context)), |hash, &word| combine(hash, scramble(word)));

    finalize(hash) & hash_mask
}
