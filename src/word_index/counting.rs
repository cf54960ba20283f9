use rustc_hash::FxHashMap;

use super::{WordIndex, MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID, UNKNOWN_WORD_TOKEN};

/// Ids re-assigned by descending occurrence frequency after the 1-gram
/// section (spec §4.1 "Counting"). Because ARPA carries no raw corpus
/// frequency, "frequency" here is the number of m-gram lines (at any level)
/// that mention the token; see DESIGN.md decision D2 for how the ARPA
/// ingester gathers those counts before this index's ids are considered
/// final.
#[derive(Debug, Default)]
pub struct CountingWordIndex {
    ids: FxHashMap<String, u32>,
    tokens: Vec<String>,
    frequency: FxHashMap<String, u64>,
    next_id: u32,
    finalized: bool,
}

impl CountingWordIndex {
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            tokens: Vec::new(),
            frequency: FxHashMap::default(),
            next_id: MIN_KNOWN_WORD_ID,
            finalized: false,
        }
    }

    /// Records one more occurrence of `token` as a constituent of some
    /// m-gram. Called by the ARPA ingester for every token in every section,
    /// including the 1-gram section, before `finalize` is invoked.
    pub fn bump_frequency(&mut self, token: &str) {
        *self.frequency.entry(token.to_string()).or_insert(0) += 1;
    }

    pub fn frequency_of(&self, token: &str) -> u64 {
        self.frequency.get(token).copied().unwrap_or(0)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl WordIndex for CountingWordIndex {
    fn reserve(&mut self, num_words: usize) {
        self.ids.reserve(num_words);
        self.tokens.reserve(num_words);
        self.frequency.reserve(num_words);
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

    /// Re-assigns every id in descending frequency order (ties broken by
    /// the original first-sight id, for determinism), exactly once. Must
    /// run before any m-gram (m > 1) is committed to the trie.
    fn finalize(&mut self) {
        assert!(!self.finalized, "CountingWordIndex::finalize must run exactly once");
        self.finalized = true;

        let mut by_first_sight: Vec<(String, u32)> =
            self.ids.iter().map(|(t, &id)| (t.clone(), id)).collect();
        by_first_sight.sort_by_key(|(_, id)| *id);

        let mut ranked = by_first_sight;
        ranked.sort_by(|(token_a, id_a), (token_b, id_b)| {
            let freq_a = self.frequency.get(token_a).copied().unwrap_or(0);
            let freq_b = self.frequency.get(token_b).copied().unwrap_or(0);
            freq_b.cmp(&freq_a).then_with(|| id_a.cmp(id_b))
        });

        self.ids.clear();
        self.tokens = vec![String::new(); ranked.len()];
        for (new_offset, (token, _old_id)) in ranked.into_iter().enumerate() {
            let new_id = MIN_KNOWN_WORD_ID + new_offset as u32;
            self.tokens[new_offset] = token.clone();
            self.ids.insert(token, new_id);
        }
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

    fn observe_occurrence(&mut self, token: &str) {
        self.bump_frequency(token);
    }
}
