//! Context-to-Data Map: every mid/final level is a hash map keyed by the
//! Szudzik pairing of `(word_id, parent_ctx)`. The pairing result doubles as
//! the context-id handed to the next level, so there is no separate id
//! issuance step (spec §4.5 "C2DM").

use rustc_hash::FxHashMap;

use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::hashing::szudzik_pair;
use crate::payload::{NGramProb, ProbBackoff};

fn key(parent_ctx: ContextId, word_id: u32) -> u64 {
    szudzik_pair(word_id as u64, parent_ctx)
}

#[derive(Debug)]
pub struct ContextToDataMapTrie {
    order: usize,
    unigrams: UnigramLevel,
    mid: Vec<FxHashMap<u64, ProbBackoff>>,
    finals: FxHashMap<u64, NGramProb>,
}

impl ContextToDataMapTrie {
    pub fn new(order: usize) -> Result<Self, TrieError> {
        if order == 0 || order > MAX_NGRAM_ORDER {
            return Err(TrieError::OrderTooLarge {
                order,
                max: MAX_NGRAM_ORDER,
            });
        }
        let mid_levels = order.saturating_sub(2);
        Ok(Self {
            order,
            unigrams: UnigramLevel::new(),
            mid: (0..mid_levels).map(|_| FxHashMap::default()).collect(),
            finals: FxHashMap::default(),
        })
    }
}

impl Trie for ContextToDataMapTrie {
    fn order(&self) -> usize {
        self.order
    }

    fn preallocate(&mut self, level: usize, count: usize) {
        if level == 1 {
            self.unigrams.reserve(count);
        } else if level < self.order {
            self.mid[level - 2].reserve(count);
        } else {
            self.finals.reserve(count);
        }
    }

    fn insert_backoff(
        &mut self,
        level: usize,
        parent_ctx: ContextId,
        word_id: u32,
        payload: ProbBackoff,
    ) -> Result<(), TrieError> {
        if level == 1 {
            self.unigrams.insert(word_id, payload);
            return Ok(());
        }
        let map = &mut self.mid[level - 2];
        let k = key(parent_ctx, word_id);
        if map.insert(k, payload).is_some() {
            return Err(TrieError::DuplicateEntry {
                level,
                parent_ctx,
                word_id,
            });
        }
        Ok(())
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        let k = key(parent_ctx, word_id);
        if self.finals.insert(k, prob).is_some() {
            return Err(TrieError::DuplicateEntry {
                level: self.order,
                parent_ctx,
                word_id,
            });
        }
        Ok(())
    }

    fn post_level(&mut self, _level: usize) {}

    fn get_context(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ContextId> {
        if level == 1 {
            return self.unigrams.contains(word_id).then_some(word_id as u64);
        }
        let k = key(parent_ctx, word_id);
        self.mid[level - 2].contains_key(&k).then_some(k)
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        self.mid[level - 2].get(&key(parent_ctx, word_id)).copied()
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        self.finals.get(&key(parent_ctx, word_id)).copied()
    }
}

impl TrieBuilder for ContextToDataMapTrie {
    fn build(order: usize, _vocab_size_hint: u32, _growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::new(order)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::ROOT_CONTEXT;

    #[test]
    fn walks_a_trigram_prefix_to_its_context() {
        let mut trie = ContextToDataMapTrie::new(3).unwrap();
        trie.insert_backoff(1, ROOT_CONTEXT, 2, ProbBackoff::new(-1.0, -0.1)).unwrap();
        let ctx1 = trie.get_context(1, ROOT_CONTEXT, 2).unwrap();
        trie.insert_backoff(2, ctx1, 3, ProbBackoff::new(-2.0, -0.2)).unwrap();
        let ctx2 = trie.get_context(2, ctx1, 3).unwrap();
        trie.insert_final(ctx2, 4, -3.0).unwrap();

        assert_eq!(trie.get_final_prob(ctx2, 4), Some(-3.0));
        assert_eq!(trie.get_backoff_payload(2, ctx1, 3), Some(ProbBackoff::new(-2.0, -0.2)));
    }

    #[test]
    fn missing_path_returns_none() {
        let trie = ContextToDataMapTrie::new(3).unwrap();
        assert_eq!(trie.get_context(1, ROOT_CONTEXT, 99), None);
    }

    #[test]
    fn duplicate_insert_at_same_level_errors() {
        let mut trie = ContextToDataMapTrie::new(2).unwrap();
        trie.insert_final(ROOT_CONTEXT, 2, -1.0).unwrap();
        assert!(trie.insert_final(ROOT_CONTEXT, 2, -2.0).is_err());
    }
}
