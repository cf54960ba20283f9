//! Word-to-Context Array: like W2CH, bucketed by the last word, but each
//! bucket is a dynamically growable array kept sorted by context-id via
//! binary-search insertion rather than a hash map (spec §4.5 "W2CA"),
//! grounded on `original_source/inc/W2COrderedArrayTrieMem.hpp`'s
//! `MemIncreaseStrategy`.

use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::mem_growth::{GrowableArray, MemoryGrowthStrategy};
use crate::payload::{NGramProb, ProbBackoff};
use crate::word_index::{MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID};

fn bucket_of(word_id: u32) -> usize {
    if word_id == UNKNOWN_WORD_ID {
        0
    } else {
        (word_id - MIN_KNOWN_WORD_ID + 1) as usize
    }
}

fn pack(bucket: usize, local_id: u32) -> ContextId {
    ((bucket as u64) << 32) | local_id as u64
}

#[derive(Debug)]
pub struct WordToContextArrayTrie {
    order: usize,
    growth: MemoryGrowthStrategy,
    unigrams: UnigramLevel,
    mid: Vec<Vec<GrowableArray<(ContextId, ProbBackoff)>>>,
    finals: Vec<GrowableArray<(ContextId, NGramProb)>>,
}

impl WordToContextArrayTrie {
    pub fn new(order: usize) -> Result<Self, TrieError> {
        Self::with_growth(order, MemoryGrowthStrategy::default())
    }

    pub fn with_growth(order: usize, growth: MemoryGrowthStrategy) -> Result<Self, TrieError> {
        if order == 0 || order > MAX_NGRAM_ORDER {
            return Err(TrieError::OrderTooLarge {
                order,
                max: MAX_NGRAM_ORDER,
            });
        }
        let mid_levels = order.saturating_sub(2);
        Ok(Self {
            order,
            growth,
            unigrams: UnigramLevel::new(),
            mid: (0..mid_levels).map(|_| Vec::new()).collect(),
            finals: Vec::new(),
        })
    }

    fn ensure_mid_bucket(buckets: &mut Vec<GrowableArray<(ContextId, ProbBackoff)>>, bucket: usize) {
        if bucket >= buckets.len() {
            buckets.resize_with(bucket + 1, GrowableArray::new);
        }
    }

    fn ensure_final_bucket(&mut self, bucket: usize) {
        if bucket >= self.finals.len() {
            self.finals.resize_with(bucket + 1, GrowableArray::new);
        }
    }
}

impl Trie for WordToContextArrayTrie {
    fn order(&self) -> usize {
        self.order
    }

    fn preallocate(&mut self, level: usize, count: usize) {
        if level == 1 {
            self.unigrams.reserve(count);
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
        let bucket = bucket_of(word_id);
        Self::ensure_mid_bucket(&mut self.mid[idx], bucket);
        self.mid[idx][bucket]
            .insert_sorted_by_key((parent_ctx, payload), parent_ctx, |&(ctx, _)| ctx, &self.growth)
            .map(|_| ())
            .map_err(|_| TrieError::DuplicateEntry {
                level,
                parent_ctx,
                word_id,
            })
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        let bucket = bucket_of(word_id);
        self.ensure_final_bucket(bucket);
        self.finals[bucket]
            .insert_sorted_by_key((parent_ctx, prob), parent_ctx, |&(ctx, _)| ctx, &self.growth)
            .map(|_| ())
            .map_err(|_| TrieError::DuplicateEntry {
                level: self.order,
                parent_ctx,
                word_id,
            })
    }

    fn post_level(&mut self, level: usize) {
        if level == 1 {
            return;
        }
        if level == self.order {
            for array in &mut self.finals {
                array.shrink_to_fit();
            }
            return;
        }
        for array in &mut self.mid[level - 2] {
            array.shrink_to_fit();
        }
    }

    fn get_context(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ContextId> {
        if level == 1 {
            return self.unigrams.contains(word_id).then_some(pack(bucket_of(word_id), 0));
        }
        let bucket = bucket_of(word_id);
        let array = self.mid[level - 2].get(bucket)?;
        let pos = array.binary_search_by_key(&parent_ctx, |&(ctx, _)| ctx).ok()?;
        Some(pack(bucket, pos as u32))
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        let bucket = bucket_of(word_id);
        let array = self.mid[level - 2].get(bucket)?;
        let pos = array.binary_search_by_key(&parent_ctx, |&(ctx, _)| ctx).ok()?;
        Some(array.as_slice()[pos].1)
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        let bucket = bucket_of(word_id);
        let array = self.finals.get(bucket)?;
        let pos = array.binary_search_by_key(&parent_ctx, |&(ctx, _)| ctx).ok()?;
        Some(array.as_slice()[pos].1)
    }
}

impl TrieBuilder for WordToContextArrayTrie {
    fn build(order: usize, _vocab_size_hint: u32, growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::with_growth(order, *growth)
    }
}
