#![doc = include_str!("../README.md")]

pub mod arpa;
pub mod bitmap_cache;
mod hashing;
pub mod mem_growth;
pub mod model;
pub mod payload;
pub mod query;
pub mod trie;
pub mod word_index;

pub use model::{Model, ModelBuilder, ModelError};
pub use query::{QueryEngine, QueryError};
pub use trie::{
    ContextId, ContextToDataHybridTrie, ContextToDataMapTrie, ContextToWordArrayTrie,
    GramToDataMapTrie, Trie, TrieBuilder, TrieError, WordToContextArrayTrie,
    WordToContextHybridTrie, ROOT_CONTEXT,
};
pub use word_index::{
    BasicWordIndex, CountingWordIndex, OptimizingWordIndex, WordIndex, MIN_KNOWN_WORD_ID,
    UNDEFINED_WORD_ID, UNKNOWN_WORD_ID,
};
