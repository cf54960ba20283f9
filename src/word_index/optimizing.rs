use crate::hashing::fingerprint_str;

use super::{WordIndex, MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID, UNKNOWN_WORD_TOKEN};

const BUCKETS_PER_WORD: usize = 10;

/// Post-build wrapper that freezes a completed `BasicWordIndex` or
/// `CountingWordIndex` into a fixed-capacity hash-bucketed table (spec §4.1
/// "Optimizing"). Built once, never resized; `register` is unreachable.
#[derive(Debug)]
pub struct OptimizingWordIndex {
    tokens: Vec<String>,
    buckets: Vec<Vec<(Box<str>, u32)>>,
}

impl OptimizingWordIndex {
    pub fn build<W: WordIndex>(source: &W) -> Self {
        let tokens: Vec<String> = source.tokens().to_vec();
        let num_buckets = (tokens.len().max(1) * BUCKETS_PER_WORD).max(1);
        let mut buckets: Vec<Vec<(Box<str>, u32)>> = vec![Vec::new(); num_buckets];
        for (offset, token) in tokens.iter().enumerate() {
            let id = MIN_KNOWN_WORD_ID + offset as u32;
            let bucket = (fingerprint_str(token) as usize) % num_buckets;
            buckets[bucket].push((token.clone().into_boxed_str(), id));
        }
        Self { tokens, buckets }
    }
}

impl WordIndex for OptimizingWordIndex {
    fn reserve(&mut self, _num_words: usize) {}

    fn register(&mut self, _token: &str) -> u32 {
        panic!("OptimizingWordIndex is read-only; build it from a completed index instead")
    }

    fn get(&self, token: &str) -> u32 {
        if token == UNKNOWN_WORD_TOKEN {
            return UNKNOWN_WORD_ID;
        }
        if self.buckets.is_empty() {
            return UNKNOWN_WORD_ID;
        }
        let bucket = (fingerprint_str(token) as usize) % self.buckets.len();
        self.buckets[bucket]
            .iter()
            .find(|(t, _)| t.as_ref() == token)
            .map(|&(_, id)| id)
            .unwrap_or(UNKNOWN_WORD_ID)
    }

    fn count_words(&self, total_1_grams_hint: usize) -> u32 {
        MIN_KNOWN_WORD_ID + self.tokens.len().max(total_1_grams_hint) as u32
    }

    fn token_for(&self, id: u32) -> Option<&str> {
        if id == UNKNOWN_WORD_ID {
            return Some(UNKNOWN_WORD_TOKEN);
        }
        if id < MIN_KNOWN_WORD_ID {
            return None;
        }
        self.tokens
            .get((id - MIN_KNOWN_WORD_ID) as usize)
            .map(|s| s.as_str())
    }

    fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::word_index::BasicWordIndex;

    #[test]
    fn frozen_index_resolves_every_source_token() {
        let mut source = BasicWordIndex::new();
        for t in ["the", "quick", "brown", "fox"] {
            source.register(t);
        }
        let frozen = OptimizingWordIndex::build(&source);
        for t in ["the", "quick", "brown", "fox"] {
            assert_eq!(frozen.get(t), source.get(t));
        }
    }

    #[test]
    fn unknown_token_maps_to_unk() {
        let source = BasicWordIndex::new();
        let frozen = OptimizingWordIndex::build(&source);
        assert_eq!(frozen.get("never-seen"), UNKNOWN_WORD_ID);
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn register_panics() {
        let source = BasicWordIndex::new();
        let mut frozen = OptimizingWordIndex::build(&source);
        frozen.register("nope");
    }

    #[test]
    fn token_for_round_trips() {
        let mut source = BasicWordIndex::new();
        let id = source.register("hello");
        let frozen = OptimizingWordIndex::build(&source);
        assert_eq!(frozen.token_for(id), Some("hello"));
    }
}
