//! Query engine (spec §4.7): resolves a conditional log-probability for a
//! single m-gram, or the cumulative log-probability of a whole sequence, by
//! walking trie contexts and backing off left-to-right on a miss.
//!
//! The back-off state machine is grounded on
//! `original_source/inc/MGramCumulativeQuery.hpp`'s `execute`: on a found
//! payload, advance; on a missing payload, add the dropped context's
//! back-off weight and retry with one fewer conditioning word; an unknown
//! word falls through the same machinery and bottoms out at whatever
//! `<unk>` unigram payload the model ingested (or the fixed
//! [`crate::payload::ZERO_LOG_PROB`] default if none was).

use crate::bitmap_cache::BitmapHashCache;
use crate::payload::ZERO_BACK_OFF;
use crate::trie::{ContextId, Trie, ROOT_CONTEXT};
use crate::word_index::UNKNOWN_WORD_ID;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("query word sequence must not be empty")]
    EmptySequence,
}

/// Read-only handle combining a word index and trie for scoring. Borrows
/// both, so it's cheap to construct per query and never outlives the model
/// that owns them.
pub struct QueryEngine<'a, T: Trie> {
    trie: &'a T,
    cache: &'a BitmapHashCache,
    order: usize,
}

impl<'a, T: Trie> QueryEngine<'a, T> {
    pub fn new(trie: &'a T, cache: &'a BitmapHashCache) -> Self {
        Self {
            trie,
            cache,
            order: trie.order(),
        }
    }

    /// Resolves `token_ids` (already passed through [`WordIndex::get`]) to
    /// `P(last | rest)`, using up to `order - 1` words of left context.
    pub fn conditional_log_prob(&self, word_ids: &[u32]) -> Result<f32, QueryError> {
        if word_ids.is_empty() {
            return Err(QueryError::EmptySequence);
        }
        Ok(self.score_suffix(word_ids))
    }

    /// Resolves the cumulative log-probability of a whole sequence: the sum
    /// of each word's conditional probability given up to `order - 1`
    /// preceding words — i.e. the standard chain-rule sentence score.
    ///
    /// As long as consecutive positions stay within one `order`-sized
    /// window and each lookup hits, the context resolved for position `end`
    /// is reused directly as the parent context for position `end + 1`
    /// instead of re-walking from the root (spec §4.7's triangular cache).
    /// A miss or a window shift (once the sentence is longer than `order`)
    /// falls back to [`Self::score_suffix`]'s full back-off recursion.
    pub fn cumulative_log_prob(&self, word_ids: &[u32]) -> Result<f32, QueryError> {
        if word_ids.is_empty() {
            return Err(QueryError::EmptySequence);
        }

        let mut total = 0.0f32;
        let mut begin = 0usize;
        let mut running_ctx = Some(ROOT_CONTEXT);
        let mut running_len = 0usize;

        for end in 0..word_ids.len() {
            let desired_begin = end.saturating_sub(self.order - 1);
            if desired_begin != begin {
                begin = desired_begin;
                running_ctx = Some(ROOT_CONTEXT);
                running_len = 0;
            }

            let last = word_ids[end];
            let level = end - begin + 1;
            let fresh = running_len == end - begin;
            // No m-gram of level >= 2 contains `<unk>`; never spend a trie
            // lookup on one (spec §4.7).
            let has_unknown = level > 1 && word_ids[begin..=end].contains(&UNKNOWN_WORD_ID);

            let hit = fresh
                .then(|| running_ctx)
                .flatten()
                .filter(|_| !has_unknown)
                .filter(|_| self.cache.may_contain(level.min(self.order), &word_ids[begin..=end]))
                .and_then(|ctx| {
                    if level >= self.order {
                        self.trie.get_final_prob(ctx, last)
                    } else {
                        self.trie.get_backoff_payload(level, ctx, last).map(|p| p.prob)
                    }
                });

            total += hit.unwrap_or_else(|| self.score_suffix(&word_ids[begin..=end]));

            if fresh {
                running_ctx = if has_unknown {
                    None
                } else {
                    running_ctx.and_then(|ctx| self.trie.get_context(level, ctx, last))
                };
                running_len += 1;
            }
        }
        Ok(total)
    }

    fn resolve_context(&self, words: &[u32]) -> Option<ContextId> {
        let mut ctx = ROOT_CONTEXT;
        for (i, &w) in words.iter().enumerate() {
            ctx = self.trie.get_context(i + 1, ctx, w)?;
        }
        Some(ctx)
    }

    fn backoff_weight(&self, context: &[u32]) -> f32 {
        if context.is_empty() || context.contains(&UNKNOWN_WORD_ID) {
            return ZERO_BACK_OFF;
        }
        let (&last, prefix) = context.split_last().expect("checked non-empty above");
        match self.resolve_context(prefix) {
            Some(parent) => self
                .trie
                .get_backoff_payload(context.len(), parent, last)
                .map(|p| p.back)
                .unwrap_or(ZERO_BACK_OFF),
            None => ZERO_BACK_OFF,
        }
    }

    /// Core back-off recursion, operating on the tail of `word_ids` (the
    /// target word never changes across recursive calls; only the
    /// conditioning context shrinks from the left).
    fn score_suffix(&self, word_ids: &[u32]) -> f32 {
        let level = word_ids.len().min(self.order);
        let gram = &word_ids[word_ids.len() - level..];
        let (&last, context) = gram.split_last().expect("gram is non-empty");

        if level == 1 {
            return self
                .trie
                .get_backoff_payload(1, ROOT_CONTEXT, last)
                .map(|p| p.prob)
                .unwrap_or(crate::payload::ZERO_LOG_PROB);
        }

        // No m-gram of level >= 2 ever contains `<unk>`; skip the trie (and
        // the bitmap cache) entirely and fall straight through to back-off
        // rather than waste a lookup that can only miss (spec §4.7).
        let has_unknown = gram.contains(&UNKNOWN_WORD_ID);
        if !has_unknown && self.cache.may_contain(level, gram) {
            if let Some(parent_ctx) = self.resolve_context(context) {
                if level == self.order {
                    if let Some(prob) = self.trie.get_final_prob(parent_ctx, last) {
                        return prob;
                    }
                } else if let Some(payload) = self.trie.get_backoff_payload(level, parent_ctx, last) {
                    return payload.prob;
                }
            }
        }

        self.backoff_weight(context) + self.score_suffix(&word_ids[1..])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arpa::ingest_arpa;
    use crate::bitmap_cache::BitmapHashCache;
    use crate::trie::ContextToDataMapTrie;
    use crate::word_index::{BasicWordIndex, WordIndex};
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

    fn build_model() -> (BasicWordIndex, ContextToDataMapTrie, BitmapHashCache) {
        let mut index = BasicWordIndex::new();
        let mut trie = ContextToDataMapTrie::new(2).unwrap();
        let mut cache = BitmapHashCache::new(2, 20.0);
        ingest_arpa(Cursor::new(TINY_ARPA), 2, &mut index, &mut trie, &mut cache).unwrap();
        (index, trie, cache)
    }

    #[test]
    fn modeled_bigram_returns_its_exact_probability() {
        let (index, trie, cache) = build_model();
        let engine = QueryEngine::new(&trie, &cache);
        let ids = [index.get("the"), index.get("cat")];
        assert_eq!(engine.conditional_log_prob(&ids).unwrap(), -0.1);
    }

    #[test]
    fn unmodeled_bigram_backs_off_through_unigram() {
        let (index, trie, cache) = build_model();
        let engine = QueryEngine::new(&trie, &cache);
        // "cat the" was never seen as a bigram; must back off to
        // backoff(cat) + P(the).
        let ids = [index.get("cat"), index.get("the")];
        let expected = -0.2 /* cat's back-off */ + -0.5 /* unigram P(the) */;
        assert_eq!(engine.conditional_log_prob(&ids).unwrap(), expected);
    }

    #[test]
    fn out_of_vocabulary_word_bottoms_out_at_unk_unigram() {
        let (index, trie, cache) = build_model();
        let engine = QueryEngine::new(&trie, &cache);
        let ids = [index.get("the"), index.get("never-seen-token")];
        assert_eq!(engine.conditional_log_prob(&ids).unwrap(), -1.0);
    }

    #[test]
    fn empty_query_is_rejected() {
        let (_, trie, cache) = build_model();
        let engine = QueryEngine::new(&trie, &cache);
        assert_eq!(engine.conditional_log_prob(&[]), Err(QueryError::EmptySequence));
    }

    #[test]
    fn cumulative_score_matches_sum_of_conditionals() {
        let (index, trie, cache) = build_model();
        let engine = QueryEngine::new(&trie, &cache);
        let sentence = [index.get("the"), index.get("cat"), index.get("cat")];

        let cumulative = engine.cumulative_log_prob(&sentence).unwrap();

        let expected = engine.conditional_log_prob(&sentence[0..1]).unwrap()
            + engine.conditional_log_prob(&sentence[0..2]).unwrap()
            + engine.conditional_log_prob(&sentence[1..3]).unwrap();
        assert!((cumulative - expected).abs() < 1e-6);
    }

    #[test]
    fn cumulative_score_of_a_modeled_bigram_sums_unigram_and_bigram_logprob() {
        let arpa = "\\data\\\nngram 1=3\nngram 2=1\n\n\\1-grams:\n-10.0 <unk>\n-1.0 a\n-2.0 b\n\n\\2-grams:\n-0.5 a b -0.1\n\n\\end\\\n";
        let mut index = BasicWordIndex::new();
        let mut trie = ContextToDataMapTrie::new(2).unwrap();
        let mut cache = BitmapHashCache::new(2, 20.0);
        ingest_arpa(Cursor::new(arpa), 2, &mut index, &mut trie, &mut cache).unwrap();
        let engine = QueryEngine::new(&trie, &cache);

        let a = index.get("a");
        let b = index.get("b");
        assert_eq!(engine.cumulative_log_prob(&[a, b]).unwrap(), -1.5);
    }

    #[test]
    fn cumulative_score_backs_off_through_the_default_zero_backoff() {
        let arpa = "\\data\\\nngram 1=3\nngram 2=1\n\n\\1-grams:\n-10.0 <unk>\n-1.0 a\n-2.0 b\n\n\\2-grams:\n-0.5 a b -0.1\n\n\\end\\\n";
        let mut index = BasicWordIndex::new();
        let mut trie = ContextToDataMapTrie::new(2).unwrap();
        let mut cache = BitmapHashCache::new(2, 20.0);
        ingest_arpa(Cursor::new(arpa), 2, &mut index, &mut trie, &mut cache).unwrap();
        let engine = QueryEngine::new(&trie, &cache);

        let a = index.get("a");
        let b = index.get("b");
        // "b a" was never seen; P(b) + [back(b)=0 + P(a)] = -2.0 + (0.0 + -1.0).
        assert_eq!(engine.cumulative_log_prob(&[b, a]).unwrap(), -3.0);
    }

    #[test]
    fn single_conditional_backs_off_two_levels_down_a_three_gram_model() {
        let arpa = "\\data\\\nngram 1=4\nngram 2=2\nngram 3=0\n\n\\1-grams:\n-10.0 <unk>\n-3.0 x\n-4.0 y\n-5.0 z\n\n\\2-grams:\n-1.0 x y -0.2\n-1.5 y z 0.0\n\n\\3-grams:\n\n\\end\\\n";
        let mut index = BasicWordIndex::new();
        let mut trie = ContextToDataMapTrie::new(3).unwrap();
        let mut cache = BitmapHashCache::new(3, 20.0);
        ingest_arpa(Cursor::new(arpa), 3, &mut index, &mut trie, &mut cache).unwrap();
        let engine = QueryEngine::new(&trie, &cache);

        let ids = [index.get("x"), index.get("y"), index.get("z")];
        // P(z|x,y) is absent; back off to back(x,y) + P(z|y) = -0.2 + -1.5.
        assert_eq!(engine.conditional_log_prob(&ids).unwrap(), -1.7);
    }

    #[test]
    fn unknown_mid_query_token_never_touches_trie_beyond_its_own_unigram() {
        let arpa = "\\data\\\nngram 1=4\nngram 2=2\nngram 3=0\n\n\\1-grams:\n-10.0 <unk>\n-3.0 x\n-4.0 y\n-5.0 z\n\n\\2-grams:\n-1.0 x y -0.2\n-1.5 y z 0.0\n\n\\3-grams:\n\n\\end\\\n";
        let mut index = BasicWordIndex::new();
        let mut trie = ContextToDataMapTrie::new(3).unwrap();
        let mut cache = BitmapHashCache::new(3, 20.0);
        ingest_arpa(Cursor::new(arpa), 3, &mut index, &mut trie, &mut cache).unwrap();
        let engine = QueryEngine::new(&trie, &cache);

        let x = index.get("x");
        let z = index.get("z");
        let q = index.get("never-registered");
        assert_eq!(q, crate::word_index::UNKNOWN_WORD_ID);

        // P(x) = -3.0; P(q|x) streams straight to <unk>'s unigram (-10.0,
        // with back(x)=0.0 since x's own back-off is unspecified); P(z|x,q)
        // streams down through two zero back-offs to z's unigram (-5.0).
        let score = engine.cumulative_log_prob(&[x, q, z]).unwrap();
        assert_eq!(score, -3.0 + -10.0 + -5.0);
    }
}
