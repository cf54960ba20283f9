//! Context-to-Word Array: each level's entries are buffered during ingest
//! and sorted by `(parent_ctx, word_id)` in `post_level`, then looked up by
//! binary search. A sorted entry's position in the finalized array is its
//! context-id (spec §4.5 "C2WA"; ordering resolved by DESIGN.md decision
//! D1 rather than requiring pre-sorted ARPA input, grounded on
//! `original_source/inc/C2WArrayTrie.hpp`'s `post_m_gram_level`).

use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::payload::{NGramProb, ProbBackoff};

#[derive(Debug, Clone, Copy)]
struct BackoffEntry {
    parent_ctx: ContextId,
    word_id: u32,
    payload: ProbBackoff,
}

#[derive(Debug, Clone, Copy)]
struct FinalEntry {
    parent_ctx: ContextId,
    word_id: u32,
    prob: NGramProb,
}

#[derive(Debug)]
pub struct ContextToWordArrayTrie {
    order: usize,
    unigrams: UnigramLevel,
    mid_buffer: Vec<Vec<BackoffEntry>>,
    mid_sorted: Vec<Vec<BackoffEntry>>,
    final_buffer: Vec<FinalEntry>,
    final_sorted: Vec<FinalEntry>,
}

impl ContextToWordArrayTrie {
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
            mid_buffer: (0..mid_levels).map(|_| Vec::new()).collect(),
            mid_sorted: (0..mid_levels).map(|_| Vec::new()).collect(),
            final_buffer: Vec::new(),
            final_sorted: Vec::new(),
        })
    }

    fn find_mid(&self, idx: usize, parent_ctx: ContextId, word_id: u32) -> Option<usize> {
        self.mid_sorted[idx]
            .binary_search_by_key(&(parent_ctx, word_id), |e| (e.parent_ctx, e.word_id))
            .ok()
    }

    fn find_final(&self, parent_ctx: ContextId, word_id: u32) -> Option<usize> {
        self.final_sorted
            .binary_search_by_key(&(parent_ctx, word_id), |e| (e.parent_ctx, e.word_id))
            .ok()
    }
}

impl Trie for ContextToWordArrayTrie {
    fn order(&self) -> usize {
        self.order
    }

    fn preallocate(&mut self, level: usize, count: usize) {
        if level == 1 {
            self.unigrams.reserve(count);
        } else if level < self.order {
            self.mid_buffer[level - 2].reserve(count);
        } else {
            self.final_buffer.reserve(count);
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
        self.mid_buffer[level - 2].push(BackoffEntry {
            parent_ctx,
            word_id,
            payload,
        });
        Ok(())
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        self.final_buffer.push(FinalEntry {
            parent_ctx,
            word_id,
            prob,
        });
        Ok(())
    }

    fn post_level(&mut self, level: usize) {
        if level == 1 || level >= self.order {
            if level == self.order {
                self.final_buffer.sort_by_key(|e| (e.parent_ctx, e.word_id));
                self.final_buffer.shrink_to_fit();
                self.final_sorted = std::mem::take(&mut self.final_buffer);
            }
            return;
        }
        let idx = level - 2;
        self.mid_buffer[idx].sort_by_key(|e| (e.parent_ctx, e.word_id));
        self.mid_buffer[idx].shrink_to_fit();
        self.mid_sorted[idx] = std::mem::take(&mut self.mid_buffer[idx]);
    }

    fn get_context(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ContextId> {
        if level == 1 {
            return self.unigrams.contains(word_id).then_some(word_id as u64);
        }
        self.find_mid(level - 2, parent_ctx, word_id).map(|pos| pos as u64)
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        let idx = level - 2;
        self.find_mid(idx, parent_ctx, word_id).map(|pos| self.mid_sorted[idx][pos].payload)
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        self.find_final(parent_ctx, word_id).map(|pos| self.final_sorted[pos].prob)
    }
}

impl TrieBuilder for ContextToWordArrayTrie {
    fn build(order: usize, _vocab_size_hint: u32, _growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::new(order)
    }
}
