//! Context-to-Data Hybrid: a hash map from `(word_id, parent_ctx)` to a
//! freshly issued dense context-id, backed by a payload array indexed by
//! that id. Unlike C2DM the context-id is not derived from the key itself,
//! so lookups of payload are O(1) array access instead of a second hash
//! probe (spec §4.5 "C2DH").

use rustc_hash::FxHashMap;

use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::hashing::szudzik_pair;
use crate::payload::{NGramProb, ProbBackoff};

fn key(parent_ctx: ContextId, word_id: u32) -> u64 {
    szudzik_pair(word_id as u64, parent_ctx)
}

#[derive(Debug)]
pub struct ContextToDataHybridTrie {
    order: usize,
    unigrams: UnigramLevel,
    mid_index: Vec<FxHashMap<u64, u32>>,
    mid_payload: Vec<Vec<ProbBackoff>>,
    final_index: FxHashMap<u64, NGramProb>,
}

impl ContextToDataHybridTrie {
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
            mid_index: (0..mid_levels).map(|_| FxHashMap::default()).collect(),
            mid_payload: (0..mid_levels).map(|_| Vec::new()).collect(),
            final_index: FxHashMap::default(),
        })
    }
}

impl Trie for ContextToDataHybridTrie {
    fn order(&self) -> usize {
        self.order
    }

    fn preallocate(&mut self, level: usize, count: usize) {
        if level == 1 {
            self.unigrams.reserve(count);
        } else if level < self.order {
            self.mid_index[level - 2].reserve(count);
            self.mid_payload[level - 2].reserve(count);
        } else {
            self.final_index.reserve(count);
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
        let idx = level - 2;
        let k = key(parent_ctx, word_id);
        if self.mid_index[idx].contains_key(&k) {
            return Err(TrieError::DuplicateEntry {
                level,
                parent_ctx,
                word_id,
            });
        }
        let issued = self.mid_payload[idx].len() as u32;
        self.mid_index[idx].insert(k, issued);
        self.mid_payload[idx].push(payload);
        Ok(())
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        let k = key(parent_ctx, word_id);
        if self.final_index.insert(k, prob).is_some() {
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
        self.mid_index[level - 2].get(&key(parent_ctx, word_id)).map(|&id| id as u64)
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        let idx = level - 2;
        let id = *self.mid_index[idx].get(&key(parent_ctx, word_id))?;
        self.mid_payload[idx].get(id as usize).copied()
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        self.final_index.get(&key(parent_ctx, word_id)).copied()
    }
}

impl TrieBuilder for ContextToDataHybridTrie {
    fn build(order: usize, _vocab_size_hint: u32, _growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::new(order)
    }
}
