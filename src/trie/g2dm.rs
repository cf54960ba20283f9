//! Gram-to-Data Map: a single trie level is not layered by context at all.
//! Every m-gram of a given level is hashed as a whole sequence into a
//! bucket, then stored inside that bucket as a compact byte-packed id
//! (`trie::ids`) so lookup within the bucket is a binary search rather than
//! another hash probe (spec §4.5 "G2DM").
//!
//! Keeping `ContextId` an opaque scalar like every other variant means
//! extending a context still needs the actual prefix word-ids to hash the
//! next level's full sequence; those are kept in a side table keyed by the
//! fingerprint so a layered caller never has to know this variant is
//! bucketed underneath.

use rustc_hash::FxHashMap;

use super::ids::{self, IdWidth};
use super::{ContextId, Trie, TrieBuilder, TrieError, UnigramLevel, MAX_NGRAM_ORDER};
use crate::hashing::fingerprint64;
use crate::payload::{NGramProb, ProbBackoff};

const DEFAULT_WORDS_PER_BUCKET: f32 = 2.0;

fn num_buckets(count_at_level: usize) -> usize {
    ((count_at_level.max(1) as f32) / DEFAULT_WORDS_PER_BUCKET).ceil() as usize
}

#[derive(Debug)]
pub struct GramToDataMapTrie {
    order: usize,
    id_width: IdWidth,
    unigrams: UnigramLevel,
    mid_buckets: Vec<Vec<Vec<(Vec<u8>, ProbBackoff)>>>,
    final_buckets: Vec<Vec<(Vec<u8>, NGramProb)>>,
    prefixes: FxHashMap<ContextId, Vec<u32>>,
}

impl GramToDataMapTrie {
    pub fn new(order: usize, max_word_id: u32) -> Result<Self, TrieError> {
        if order == 0 || order > MAX_NGRAM_ORDER {
            return Err(TrieError::OrderTooLarge {
                order,
                max: MAX_NGRAM_ORDER,
            });
        }
        let mid_levels = order.saturating_sub(2);
        Ok(Self {
            order,
            id_width: IdWidth::for_max_word_id(max_word_id),
            unigrams: UnigramLevel::new(),
            mid_buckets: (0..mid_levels).map(|_| Vec::new()).collect(),
            final_buckets: Vec::new(),
            prefixes: FxHashMap::default(),
        })
    }

    fn full_sequence(&self, parent_ctx: ContextId, word_id: u32) -> Vec<u32> {
        let mut seq = self.prefixes.get(&parent_ctx).cloned().unwrap_or_default();
        seq.push(word_id);
        seq
    }
}

impl Trie for GramToDataMapTrie {
    fn order(&self) -> usize {
        self.order
    }

    fn preallocate(&mut self, level: usize, count: usize) {
        if level == 1 {
            self.unigrams.reserve(count);
            return;
        }
        let buckets = num_buckets(count);
        if level < self.order {
            self.mid_buckets[level - 2] = (0..buckets).map(|_| Vec::new()).collect();
        } else {
            self.final_buckets = (0..buckets).map(|_| Vec::new()).collect();
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
            self.prefixes.insert(word_id as u64, vec![word_id]);
            return Ok(());
        }
        let seq = self.full_sequence(parent_ctx, word_id);
        let fp = fingerprint64(&seq);
        let idx = level - 2;
        let buckets = &mut self.mid_buckets[idx];
        if buckets.is_empty() {
            buckets.push(Vec::new());
        }
        let bucket_idx = (fp as usize) % buckets.len();
        let packed = ids::build(&seq, self.id_width);
        if buckets[bucket_idx].iter().any(|(id, _)| *id == packed) {
            return Err(TrieError::DuplicateEntry {
                level,
                parent_ctx,
                word_id,
            });
        }
        buckets[bucket_idx].push((packed, payload));
        self.prefixes.insert(fp, seq);
        Ok(())
    }

    fn insert_final(&mut self, parent_ctx: ContextId, word_id: u32, prob: NGramProb) -> Result<(), TrieError> {
        let seq = self.full_sequence(parent_ctx, word_id);
        let fp = fingerprint64(&seq);
        if self.final_buckets.is_empty() {
            self.final_buckets.push(Vec::new());
        }
        let bucket_idx = (fp as usize) % self.final_buckets.len();
        let packed = ids::build(&seq, self.id_width);
        if self.final_buckets[bucket_idx].iter().any(|(id, _)| *id == packed) {
            return Err(TrieError::DuplicateEntry {
                level: self.order,
                parent_ctx,
                word_id,
            });
        }
        self.final_buckets[bucket_idx].push((packed, prob));
        Ok(())
    }

    fn post_level(&mut self, level: usize) {
        if level == 1 || level >= self.order {
            if level == self.order {
                for bucket in &mut self.final_buckets {
                    bucket.sort_by(|a, b| ids::compare(&a.0, &b.0));
                    bucket.shrink_to_fit();
                }
            }
            return;
        }
        for bucket in &mut self.mid_buckets[level - 2] {
            bucket.sort_by(|a, b| ids::compare(&a.0, &b.0));
            bucket.shrink_to_fit();
        }
    }

    fn get_context(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ContextId> {
        if level == 1 {
            return self.unigrams.contains(word_id).then_some(word_id as u64);
        }
        let seq = self.full_sequence(parent_ctx, word_id);
        let fp = fingerprint64(&seq);
        let buckets = &self.mid_buckets[level - 2];
        if buckets.is_empty() {
            return None;
        }
        let bucket_idx = (fp as usize) % buckets.len();
        let packed = ids::build(&seq, self.id_width);
        buckets[bucket_idx]
            .binary_search_by(|(id, _)| ids::compare(id, &packed))
            .ok()
            .map(|_| fp)
    }

    fn get_backoff_payload(&self, level: usize, parent_ctx: ContextId, word_id: u32) -> Option<ProbBackoff> {
        if level == 1 {
            return self.unigrams.get(word_id);
        }
        let seq = self.full_sequence(parent_ctx, word_id);
        let fp = fingerprint64(&seq);
        let buckets = &self.mid_buckets[level - 2];
        if buckets.is_empty() {
            return None;
        }
        let bucket_idx = (fp as usize) % buckets.len();
        let packed = ids::build(&seq, self.id_width);
        let pos = buckets[bucket_idx].binary_search_by(|(id, _)| ids::compare(id, &packed)).ok()?;
        Some(buckets[bucket_idx][pos].1)
    }

    fn get_final_prob(&self, parent_ctx: ContextId, word_id: u32) -> Option<NGramProb> {
        let seq = self.full_sequence(parent_ctx, word_id);
        let fp = fingerprint64(&seq);
        if self.final_buckets.is_empty() {
            return None;
        }
        let bucket_idx = (fp as usize) % self.final_buckets.len();
        let packed = ids::build(&seq, self.id_width);
        let pos = self.final_buckets[bucket_idx]
            .binary_search_by(|(id, _)| ids::compare(id, &packed))
            .ok()?;
        Some(self.final_buckets[bucket_idx][pos].1)
    }
}

impl TrieBuilder for GramToDataMapTrie {
    fn build(order: usize, vocab_size_hint: u32, _growth: &crate::mem_growth::MemoryGrowthStrategy) -> Result<Self, TrieError> {
        Self::new(order, vocab_size_hint)
    }
}
