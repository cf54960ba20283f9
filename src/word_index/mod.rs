//! Token-to-id mapping (spec §4.1).
//!
//! Grounded on `original_source/inc/AWordIndex.hpp` / `HashMapWordIndex.hpp`:
//! id 0 is reserved ("undefined"), id 1 is `<unk>`, real words start at 2 and
//! are dense. `register` is the ingest-time path (assigns on first sight),
//! `get` is the read-only path used during m-gram ingest (m > 1) and queries.

mod basic;
mod counting;
mod optimizing;

pub use basic::BasicWordIndex;
pub use counting::CountingWordIndex;
pub use optimizing::OptimizingWordIndex;

pub const UNDEFINED_WORD_ID: u32 = 0;
pub const UNKNOWN_WORD_ID: u32 = 1;
pub const MIN_KNOWN_WORD_ID: u32 = 2;
pub const UNKNOWN_WORD_TOKEN: &str = "<unk>";

/// Fallback vocabulary-size hint for [`crate::model::ModelBuilder`] callers
/// that don't know their model's vocabulary up front. Only consulted by the
/// G2DM trie variant, to size its byte-packed m-gram ids (spec §4.4); an
/// under-estimate only costs a wider id than necessary, never correctness.
pub const DEFAULT_VOCAB_SIZE_HINT: u32 = 1 << 20;

/// Common contract for the two id-issuing policies (§4.1) plus the
/// optimising wrapper. `register`/`get`/`count_words` are exactly the three
/// operations spec.md names; `token_for` and `finalize` are ambient
/// additions (diagnostics and the counting re-sort hook, respectively).
pub trait WordIndex {
    /// Pre-sizing hint, called before the 1-gram section is read.
    fn reserve(&mut self, num_words: usize);

    /// Registers `token`'s occurrence during 1-gram ingest, assigning a new
    /// id on first sight. Must only be called while ingesting level-1 lines.
    fn register(&mut self, token: &str) -> u32;

    /// Resolves a token to its id, or `UNKNOWN_WORD_ID` if never registered.
    /// Never allocates.
    fn get(&self, token: &str) -> u32;

    /// Upper bound on issued ids, used by the trie to size level-1 arrays.
    fn count_words(&self, total_1_grams_hint: usize) -> u32;

    /// Called once, immediately after the 1-gram section has been fully
    /// ingested and before any m-gram (m > 1) is inserted. The counting
    /// policy performs its frequency re-sort here; the basic policy is a
    /// no-op.
    fn finalize(&mut self) {}

    /// Notes one more occurrence of `token` as a constituent of some
    /// m-gram, at any level. The ARPA ingester calls this for every token in
    /// every section, ahead of `finalize`, so the counting policy can rank
    /// ids by total frequency rather than 1-gram first-sight order alone
    /// (see DESIGN.md decision D2). A no-op for policies that don't need it.
    fn observe_occurrence(&mut self, _token: &str) {}

    /// Reverse lookup, for diagnostics/vocabulary enumeration only; not used
    /// on the ingest or query hot path.
    fn token_for(&self, id: u32) -> Option<&str>;

    /// Dense `id - MIN_KNOWN_WORD_ID -> token` table, consumed by
    /// `OptimizingWordIndex::build` to freeze a completed index.
    fn tokens(&self) -> &[String];
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Universal invariant from spec §8: every registered token resolves to
    /// a non-unknown id after `finalize` (the counting index's equivalent of
    /// `post_level<1>`).
    pub fn assert_registered_tokens_resolve<W: WordIndex>(index: &mut W, tokens: &[&str]) {
        for &t in tokens {
            index.register(t);
        }
        index.finalize();
        for &t in tokens {
            assert_ne!(
                index.get(t),
                UNKNOWN_WORD_ID,
                "token {t:?} should not resolve to <unk> after registration"
            );
        }
    }
}
