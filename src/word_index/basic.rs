use rustc_hash::FxHashMap;

use super::{WordIndex, MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID, UNKNOWN_WORD_TOKEN};

/// Ids assigned in first-sight order. O(1) insert and lookup via an open
/// hash map from token to id (spec §4.1 "Basic").
#[derive(Debug, Default)]
pub struct BasicWordIndex {
    ids: FxHashMap<String, u32>,
    tokens: Vec<String>,
    next_id: u32,
}

impl BasicWordIndex {
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            tokens: Vec::new(),
            next_id: MIN_KNOWN_WORD_ID,
        }
    }
}

impl WordIndex for BasicWordIndex {
    fn reserve(&mut self, num_words: usize) {
        self.ids.reserve(num_words);
        self.tokens.reserve(num_words);
    }

    fn register(&mut self, token: &str) -> u32 {
        if token == UNKNOWN_WORD_TOKEN {
            return UNKNOWN_WORD_ID;
        }
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(token.to_string(), id);
        let slot = (id - MIN_KNOWN_WORD_ID) as usize;
        if slot >= self.tokens.len() {
            self.tokens.resize(slot + 1, String::new());
        }
        self.tokens[slot] = token.to_string();
        id
    }

    fn get(&self, token: &str) -> u32 {
        if token == UNKNOWN_WORD_TOKEN {
            return UNKNOWN_WORD_ID;
        }
        self.ids.get(token).copied().unwrap_or(UNKNOWN_WORD_ID)
    }

    fn count_words(&self, total_1_grams_hint: usize) -> u32 {
        (self.next_id).max(MIN_KNOWN_WORD_ID + total_1_grams_hint as u32)
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
    use crate::word_index::test_support::assert_registered_tokens_resolve;

    #[test]
    fn ids_are_dense_from_min_known() {
        let mut idx = BasicWordIndex::new();
        assert_eq!(idx.register("a"), MIN_KNOWN_WORD_ID);
        assert_eq!(idx.register("b"), MIN_KNOWN_WORD_ID + 1);
        assert_eq!(idx.register("a"), MIN_KNOWN_WORD_ID, "repeat registration is idempotent");
    }

    #[test]
    fn unknown_token_maps_to_unk() {
        let idx = BasicWordIndex::new();
        assert_eq!(idx.get("never-seen"), UNKNOWN_WORD_ID);
    }

    #[test]
    fn registered_tokens_resolve_after_finalize() {
        let mut idx = BasicWordIndex::new();
        assert_registered_tokens_resolve(&mut idx, &["dog", "cat", "fish"]);
    }

    #[test]
    fn token_for_is_the_inverse_of_register() {
        let mut idx = BasicWordIndex::new();
        let id = idx.register("hello");
        assert_eq!(idx.token_for(id), Some("hello"));
    }
}
