//! Common trie contract shared by the six back-ends (spec §4.5).
//!
//! Every variant stores two payload shapes: [`ProbBackoff`] for levels
//! `1 <= m < order`, and a bare probability ([`NGramProb`]) for `m == order`
//! (there is nothing to back off to from inside the top level's own entry).
//! Context threading is uniform across variants: to insert or look up an
//! m-gram, a caller resolves the (m-1)-gram's [`ContextId`] first (via
//! repeated [`Trie::get_context`] calls from the root, where the root
//! context is always `0`), then inserts/looks up the last word against it.

pub mod ids;
mod c2dh;
mod c2dm;
mod c2wa;
mod g2dm;
mod w2ca;
mod w2ch;

pub use c2dh::ContextToDataHybridTrie;
pub use c2dm::ContextToDataMapTrie;
pub use c2wa::ContextToWordArrayTrie;
pub use g2dm::GramToDataMapTrie;
pub use w2ca::WordToContextArrayTrie;
pub use w2ch::WordToContextHybridTrie;

use crate::payload::{NGramProb, ProbBackoff};
use crate::word_index::{MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID};

/// Upper bound on m-gram order any trie variant in this crate supports; the
/// reference configuration uses 5 (spec §2).
pub const MAX_NGRAM_ORDER: usize = 5;

/// The context-id of the empty prefix, i.e. the implicit parent of every
/// 1-gram.
pub const ROOT_CONTEXT: ContextId = 0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("m-gram order {order} exceeds the configured maximum {max}")]
    OrderTooLarge { order: usize, max: usize },
    #[error("level {level} inserted before its order was set")]
    OrderNotConfigured { level: usize },
    #[error("duplicate m-gram at level {level} for word id {word_id} under context {parent_ctx}")]
    DuplicateEntry {
        level: usize,
        parent_ctx: ContextId,
        word_id: u32,
    },
}

/// Opaque handle identifying a trie position. Each variant packs its own
/// notion of "where this m-gram lives" into it (a Szudzik pairing, a freshly
/// issued dense id, or an array position); callers must never interpret the
/// bits, only thread the value back into the next `get_context`/`insert_*`
/// call.
pub type ContextId = u64;

/// Uniform construction surface for the six variants, used by
/// [`crate::model::ModelBuilder`] to stay generic over the chosen trie type.
/// `vocab_size_hint` is `WordIndex::count_words`'s upper bound on word ids;
/// every variant but G2DM ignores it, since only G2DM's byte-packed m-gram
/// ids need to know the id width up front. `growth` is likewise only
/// consulted by W2CA.
pub trait TrieBuilder: Trie + Sized {
    fn build(order: usize, vocab_size_hint: u32, growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError>;
}

/// Read/write surface every trie back-end implements.
pub trait Trie {
    /// Highest m-gram order this trie was built for.
    fn order(&self) -> usize;

    /// Reserves storage for `count` m-grams at `level`, called once per
    /// level from the ARPA count header before any insert at that level.
    fn preallocate(&mut self, level: usize, count: usize);

    /// Inserts the back-off payload for the m-gram of length `level`
    /// (`1 <= level < order`) formed by extending `parent_ctx` with
    /// `word_id`.
    fn insert_backoff(
        &mut self,
        level: usize,
        parent_ctx: ContextId,
        word_id: u32,
        payload: ProbBackoff,
    ) -> Result<(), TrieError>;

    /// Inserts the final-level (`level == order`) probability-only payload.
    fn insert_final(
        &mut self,
        parent_ctx: ContextId,
        word_id: u32,
        prob: NGramProb,
    ) -> Result<(), TrieError>;

    /// Called once every m-gram at `level` has been inserted; variants that
    /// buffer entries (C2WA, G2DM) sort and commit here. A no-op for
    /// variants that commit on every insert.
    fn post_level(&mut self, level: usize);

    /// Resolves the context-id of the m-gram of length `level` formed by
    /// extending `parent_ctx` with `word_id`, for use as the `parent_ctx` of
    /// the next level. `None` means that path isn't in the trie.
    fn get_context(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ContextId>;

    /// Looks up the back-off payload at a non-final level.
    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff>;

    /// Looks up the final-level probability.
    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb>;
}

/// Shared unigram storage: dense array indexed by `word_id - MIN_KNOWN_WORD_ID`,
/// plus a dedicated `<unk>` slot. Every variant embeds one of these for
/// level 1, since none of the six designs differ on how the unigram level is
/// laid out (spec §4.5).
#[derive(Debug, Clone)]
pub(crate) struct UnigramLevel {
    entries: Vec<ProbBackoff>,
    unk: ProbBackoff,
}

impl UnigramLevel {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            unk: ProbBackoff::unknown(),
        }
    }

    pub(crate) fn reserve(&mut self, count: usize) {
        self.entries.reserve(count);
    }

    fn slot(word_id: u32) -> usize {
        (word_id - MIN_KNOWN_WORD_ID) as usize
    }

    pub(crate) fn insert(&mut self, word_id: u32, payload: ProbBackoff) {
        if word_id == UNKNOWN_WORD_ID {
            self.unk = payload;
            return;
        }
        let slot = Self::slot(word_id);
        if slot >= self.entries.len() {
            self.entries.resize(slot + 1, ProbBackoff::UNDEFINED);
        }
        self.entries[slot] = payload;
    }

    pub(crate) fn get(&self, word_id: u32) -> Option<ProbBackoff> {
        if word_id == UNKNOWN_WORD_ID {
            return Some(self.unk);
        }
        self.entries
            .get(Self::slot(word_id))
            .copied()
            .filter(|p| *p != ProbBackoff::UNDEFINED)
    }

    pub(crate) fn contains(&self, word_id: u32) -> bool {
        self.get(word_id).is_some()
    }
}
