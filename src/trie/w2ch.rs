//! Word-to-Context Hybrid: the trie is indexed first by the *last* word of
//! the m-gram, then by a hash map from the preceding context to a freshly
//! issued dense id backed by a per-word payload array (spec §4.5 "W2CH").
//! Context-ids returned to the caller pack `(word bucket, local id)` so a
//! later level can recover which per-word table to look in.

use rustc_hash::FxHashMap;

use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::payload::{NGramProb, ProbBackoff};
use crate::word_index::{MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID};

/// Bucket 0 is reserved for `<unk>`; real words start at bucket 1, keeping
/// the mapping total without requiring a signed/offset id type.
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

#[derive(Debug, Default)]
struct WordBucket {
    index: FxHashMap<ContextId, u32>,
    payload: Vec<ProbBackoff>,
}

#[derive(Debug, Default)]
struct FinalWordBucket {
    index: FxHashMap<ContextId, NGramProb>,
}

#[derive(Debug)]
pub struct WordToContextHybridTrie {
    order: usize,
    unigrams: UnigramLevel,
    mid: Vec<Vec<WordBucket>>,
    finals: Vec<FinalWordBucket>,
}

impl WordToContextHybridTrie {
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
            mid: (0..mid_levels).map(|_| Vec::new()).collect(),
            finals: Vec::new(),
        })
    }

    fn ensure_bucket(buckets: &mut Vec<WordBucket>, bucket: usize) {
        if bucket >= buckets.len() {
            buckets.resize_with(bucket + 1, WordBucket::default);
        }
    }

    fn ensure_final_bucket(&mut self, bucket: usize) {
        if bucket >= self.finals.len() {
            self.finals.resize_with(bucket + 1, FinalWordBucket::default);
        }
    }
}

impl Trie for WordToContextHybridTrie {
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
        Self::ensure_bucket(&mut self.mid[idx], bucket);
        let table = &mut self.mid[idx][bucket];
        if table.index.contains_key(&parent_ctx) {
            return Err(TrieError::DuplicateEntry {
                level,
                parent_ctx,
                word_id,
            });
        }
        let local_id = table.payload.len() as u32;
        table.index.insert(parent_ctx, local_id);
        table.payload.push(payload);
        Ok(())
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        let bucket = bucket_of(word_id);
        self.ensure_final_bucket(bucket);
        let table = &mut self.finals[bucket];
        if table.index.insert(parent_ctx, prob).is_some() {
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
            return self.unigrams.contains(word_id).then_some(pack(bucket_of(word_id), 0));
        }
        let bucket = bucket_of(word_id);
        let table = self.mid[level - 2].get(bucket)?;
        table.index.get(&parent_ctx).map(|&local_id| pack(bucket, local_id))
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        let bucket = bucket_of(word_id);
        let table = self.mid[level - 2].get(bucket)?;
        let local_id = *table.index.get(&parent_ctx)?;
        table.payload.get(local_id as usize).copied()
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        let bucket = bucket_of(word_id);
        self.finals.get(bucket)?.index.get(&parent_ctx).copied()
    }
}

impl TrieBuilder for WordToContextHybridTrie {
    fn build(order: usize, _vocab_size_hint: u32, _growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::new(order)
    }
}
