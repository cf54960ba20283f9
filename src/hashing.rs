//! Shared hashing primitives: the 64-bit m-gram fingerprint used by the
//! bitmap cache and the bucketed trie, and the Szudzik pairing function used
//! by the context-map trie variants.
//!
//! Any 64-bit non-cryptographic hash with good avalanche is acceptable per
//! spec §9's open question; this uses `rustc_hash`'s `FxHasher`, the same
//! fast-hash idiom the retrieval pack reaches for elsewhere (e.g.
//! `rustc_hash::FxHasher` in the `libdatadog` string table). Consistency
//! within one build is the only hard requirement, so callers must not mix
//! fingerprints produced by different hasher configurations.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// 64-bit fingerprint of an ordered word-id sequence.
pub fn fingerprint64(word_ids: &[u32]) -> u64 {
    let mut hasher = FxHasher::default();
    for &id in word_ids {
        hasher.write_u32(id);
    }
    hasher.finish()
}

/// 64-bit fingerprint of a token string, used by the optimising word index's
/// fixed bucket table.
pub fn fingerprint_str(token: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(token.as_bytes());
    hasher.finish()
}

/// Szudzik's elegant pairing function, extended to `u64` so it can absorb a
/// context-id that has already grown past 32 bits (C2DM reuses its pairing
/// result directly as the next level's context-id).
pub fn szudzik_pair(a: u64, b: u64) -> u64 {
    if a >= b {
        a * a + a + b
    } else {
        a + b * b
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fingerprint_is_order_sensitive() {
        assert_ne!(fingerprint64(&[1, 2, 3]), fingerprint64(&[3, 2, 1]));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint64(&[7, 9, 2]), fingerprint64(&[7, 9, 2]));
    }

    #[test]
    fn str_fingerprint_is_deterministic() {
        assert_eq!(fingerprint_str("hello"), fingerprint_str("hello"));
        assert_ne!(fingerprint_str("hello"), fingerprint_str("world"));
    }

    #[test]
    fn szudzik_pair_is_injective_on_small_inputs() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..50u64 {
            for b in 0..50u64 {
                assert!(seen.insert(szudzik_pair(a, b)), "collision for ({a}, {b})");
            }
        }
    }
}
