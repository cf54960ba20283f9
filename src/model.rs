//! Ties the word index, trie, bitmap cache and query engine together behind
//! one construction/query surface (spec §6), mirroring `twuebi-kenlm-rs`'s
//! `model::{Model, builder::ModelBuilder}` split: a builder that accumulates
//! configuration, and a read-only `Model` that owns the finished pieces and
//! exposes scoring.

use std::io::BufRead;

use crate::arpa::{ingest_arpa, ArpaError, IngestReport};
use crate::bitmap_cache::BitmapHashCache;
use crate::mem_growth::MemoryGrowthStrategy;
use crate::query::{QueryEngine, QueryError};
use crate::trie::{Trie, TrieBuilder, TrieError};
use crate::word_index::{
    BasicWordIndex, CountingWordIndex, OptimizingWordIndex, WordIndex, DEFAULT_VOCAB_SIZE_HINT,
};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Arpa(#[from] ArpaError),
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("query has {len} words, which exceeds the model's order {order}")]
    QueryTooLong { len: usize, order: usize },
}

/// A word index ready to ingest (`Basic` or `Counting`), or the frozen
/// post-build wrapper (`Optimized`). Spec §6's `word_index_kind` names four
/// configurations; the two "optimising(...)" ones are this enum's `Raw`
/// variant ingesting normally, then [`ModelBuilder::optimize`] swapping it
/// for `Optimized` once `finalize` has already run.
#[derive(Debug)]
enum ResolvedWordIndex<W: WordIndex> {
    Raw(W),
    Optimized(OptimizingWordIndex),
}

impl<W: WordIndex> WordIndex for ResolvedWordIndex<W> {
    fn reserve(&mut self, num_words: usize) {
        match self {
            Self::Raw(w) => w.reserve(num_words),
            Self::Optimized(w) => w.reserve(num_words),
        }
    }

    fn register(&mut self, token: &str) -> u32 {
        match self {
            Self::Raw(w) => w.register(token),
            Self::Optimized(w) => w.register(token),
        }
    }

    fn get(&self, token: &str) -> u32 {
        match self {
            Self::Raw(w) => w.get(token),
            Self::Optimized(w) => w.get(token),
        }
    }

    fn count_words(&self, total_1_grams_hint: usize) -> u32 {
        match self {
            Self::Raw(w) => w.count_words(total_1_grams_hint),
            Self::Optimized(w) => w.count_words(total_1_grams_hint),
        }
    }

    fn finalize(&mut self) {
        match self {
            Self::Raw(w) => w.finalize(),
            Self::Optimized(w) => w.finalize(),
        }
    }

    fn observe_occurrence(&mut self, token: &str) {
        match self {
            Self::Raw(w) => w.observe_occurrence(token),
            Self::Optimized(w) => w.observe_occurrence(token),
        }
    }

    fn token_for(&self, id: u32) -> Option<&str> {
        match self {
            Self::Raw(w) => w.token_for(id),
            Self::Optimized(w) => w.token_for(id),
        }
    }

    fn tokens(&self) -> &[String] {
        match self {
            Self::Raw(w) => w.tokens(),
            Self::Optimized(w) => w.tokens(),
        }
    }
}

/// A fresh, empty instance of one of the two id-issuing policies. Glue trait
/// so [`ModelBuilder`] can stay generic over which policy it ingests with;
/// `OptimizingWordIndex` deliberately doesn't implement it, since it is only
/// ever produced by [`OptimizingWordIndex::build`] from a finished index.
pub trait FreshWordIndex: WordIndex + Sized {
    fn fresh() -> Self;
}

impl FreshWordIndex for BasicWordIndex {
    fn fresh() -> Self {
        BasicWordIndex::new()
    }
}

impl FreshWordIndex for CountingWordIndex {
    fn fresh() -> Self {
        CountingWordIndex::new()
    }
}

/// Accumulates the configuration options of spec §6 before ingesting an ARPA
/// file. `W` selects the id-issuing policy, `T` the trie back-end; both are
/// fixed at compile time per spec's "no runtime mutation" rule, and resolved
/// via static dispatch per the "favour static dispatch" design note (§9).
pub struct ModelBuilder<W, T> {
    order: usize,
    vocab_size_hint: u32,
    buckets_factor: f32,
    growth: MemoryGrowthStrategy,
    optimize_word_index: bool,
    _word_index: std::marker::PhantomData<W>,
    _trie: std::marker::PhantomData<T>,
}

impl<W: FreshWordIndex, T: TrieBuilder> ModelBuilder<W, T> {
    pub fn new(order: usize) -> Self {
        Self {
            order,
            vocab_size_hint: DEFAULT_VOCAB_SIZE_HINT,
            buckets_factor: 20.0,
            growth: MemoryGrowthStrategy::default(),
            optimize_word_index: false,
            _word_index: std::marker::PhantomData,
            _trie: std::marker::PhantomData,
        }
    }

    /// Upper bound on the vocabulary size, used to size G2DM's byte-packed
    /// m-gram ids up front (spec §4.4). Ignored by the other five variants.
    pub fn vocab_size_hint(mut self, hint: u32) -> Self {
        self.vocab_size_hint = hint;
        self
    }

    /// Sizing multiplier for the bitmap hash cache (spec §4.2); ~20 by
    /// default.
    pub fn buckets_factor(mut self, factor: f32) -> Self {
        self.buckets_factor = factor;
        self
    }

    /// Growth policy for dynamic trie variants (spec §4.3); ignored by the
    /// four fixed-size variants.
    pub fn mem_growth(mut self, growth: MemoryGrowthStrategy) -> Self {
        self.growth = growth;
        self
    }

    /// Freezes the word index into its optimising wrapper after ingest
    /// completes (spec §4.1's "optimising(basic)"/"optimising(counting)").
    pub fn optimize_word_index(mut self, optimize: bool) -> Self {
        self.optimize_word_index = optimize;
        self
    }

    /// Ingests `reader` as an ARPA file and returns the finished model
    /// alongside its per-level ingest diagnostics.
    pub fn build<R: BufRead>(self, reader: R) -> Result<(Model<W, T>, IngestReport), ModelError> {
        let mut word_index = W::fresh();
        let mut trie = T::build(self.order, self.vocab_size_hint, &self.growth)?;
        let mut cache = BitmapHashCache::new(self.order, self.buckets_factor);

        let report = ingest_arpa(reader, self.order, &mut word_index, &mut trie, &mut cache)?;

        let word_index = if self.optimize_word_index {
            ResolvedWordIndex::Optimized(OptimizingWordIndex::build(&word_index))
        } else {
            ResolvedWordIndex::Raw(word_index)
        };

        Ok((
            Model {
                word_index,
                trie,
                cache,
                order: self.order,
            },
            report,
        ))
    }
}

/// A completed, read-only language model: a word index, one trie back-end,
/// and the bitmap cache recorded during ingest. Immutable after
/// [`ModelBuilder::build`] returns (spec §5's "logically immutable bundle");
/// any number of queries may run concurrently against a shared `&Model`.
#[derive(Debug)]
pub struct Model<W: WordIndex, T: Trie> {
    word_index: ResolvedWordIndex<W>,
    trie: T,
    cache: BitmapHashCache,
    order: usize,
}

impl<W: WordIndex, T: Trie> Model<W, T> {
    pub fn order(&self) -> usize {
        self.order
    }

    /// Resolves a token to its id, or `UNKNOWN_WORD_ID` if it was never
    /// seen at ingest time.
    pub fn word_id(&self, token: &str) -> u32 {
        self.word_index.get(token)
    }

    fn engine(&self) -> QueryEngine<'_, T> {
        QueryEngine::new(&self.trie, &self.cache)
    }

    /// `log P(words.last() | words[..words.len() - 1])`, up to `order - 1`
    /// words of left context. Rejects sequences longer than `order` (spec §6
    /// "Query length > N: error"); use [`Self::cumulative_log_prob`] for
    /// whole sentences.
    pub fn conditional_log_prob(&self, words: &[&str]) -> Result<f32, ModelError> {
        if words.len() > self.order {
            return Err(ModelError::QueryTooLong {
                len: words.len(),
                order: self.order,
            });
        }
        let ids: Vec<u32> = words.iter().map(|w| self.word_index.get(w)).collect();
        Ok(self.engine().conditional_log_prob(&ids)?)
    }

    /// Sum of each word's conditional log-probability given its preceding
    /// words, windowed to `order` (the standard chain-rule sentence score).
    /// Unlike [`Self::conditional_log_prob`], any sentence length is valid.
    pub fn cumulative_log_prob(&self, words: &[&str]) -> Result<f32, ModelError> {
        let ids: Vec<u32> = words.iter().map(|w| self.word_index.get(w)).collect();
        Ok(self.engine().cumulative_log_prob(&ids)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trie::ContextToDataMapTrie;
    use std::io::Cursor;

    const TINY_ARPA: &str = "\\data\\\n\
ngram 1=3\n\
ngram 2=2\n\
\n\
\\1-grams:\n\
-1.0 <unk>\n\
-0.5 the\n\
-0.3 cat\t-0.2\n\
\n\
\\2-grams:\n\
-0.1 the cat\n\
-0.05 cat cat\n\
\n\
\\end\\\n";

    #[test]
    fn builder_ingests_and_scores() {
        let (model, report) = ModelBuilder::<BasicWordIndex, ContextToDataMapTrie>::new(2)
            .build(Cursor::new(TINY_ARPA))
            .unwrap();

        assert_eq!(report.declared_counts, vec![3, 2]);
        assert_eq!(model.order(), 2);
        assert_eq!(model.conditional_log_prob(&["the", "cat"]).unwrap(), -0.1);
    }

    #[test]
    fn query_longer_than_order_is_rejected() {
        let (model, _) = ModelBuilder::<BasicWordIndex, ContextToDataMapTrie>::new(2)
            .build(Cursor::new(TINY_ARPA))
            .unwrap();

        assert!(matches!(
            model.conditional_log_prob(&["the", "cat", "cat"]),
            Err(ModelError::QueryTooLong { len: 3, order: 2 })
        ));
    }

    #[test]
    fn cumulative_handles_sentences_longer_than_order() {
        let (model, _) = ModelBuilder::<BasicWordIndex, ContextToDataMapTrie>::new(2)
            .build(Cursor::new(TINY_ARPA))
            .unwrap();

        let score = model.cumulative_log_prob(&["the", "cat", "cat", "cat"]).unwrap();
        let expected = model.conditional_log_prob(&["the"]).unwrap()
            + model.conditional_log_prob(&["the", "cat"]).unwrap()
            + model.conditional_log_prob(&["cat", "cat"]).unwrap()
            + model.conditional_log_prob(&["cat", "cat"]).unwrap();
        assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn optimizing_wrapper_still_resolves_every_token() {
        let (model, _) = ModelBuilder::<CountingWordIndex, ContextToDataMapTrie>::new(2)
            .optimize_word_index(true)
            .build(Cursor::new(TINY_ARPA))
            .unwrap();

        assert_ne!(model.word_id("the"), crate::word_index::UNKNOWN_WORD_ID);
        assert_ne!(model.word_id("cat"), crate::word_index::UNKNOWN_WORD_ID);
        assert_eq!(model.word_id("never-seen"), crate::word_index::UNKNOWN_WORD_ID);
    }
}
