//! Memory growth strategy for dynamic, array-backed trie variants (spec §4.3).
//!
//! Grounded on `original_source/inc/W2COrderedArrayTrieMem.hpp`'s
//! `MemIncreaseStrategy`, which picks an increment function of the current
//! capacity and scales it by a caller-chosen factor, with a hard floor on the
//! minimum number of elements added per grow.

/// The shape of the capacity-increase curve, `f(c)` in spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthFunction {
    /// `f(c) = 0`; all growth comes from `min_increment`.
    Constant,
    /// `f(c) = c`.
    Linear,
    /// `f(c) = c / log2(c)`.
    Log2,
    /// `f(c) = c / log10(c)`.
    Log10,
}

impl GrowthFunction {
    fn eval(self, capacity: f32) -> f32 {
        // Guard against capacity <= 1, where log2/log10 are non-positive or zero.
        let c = capacity.max(2.0);
        match self {
            GrowthFunction::Constant => 0.0,
            GrowthFunction::Linear => c,
            GrowthFunction::Log2 => c / c.log2(),
            GrowthFunction::Log10 => c / c.log10(),
        }
    }
}

/// Policy object used by `W2CA` and `G2DM` to size per-word / per-bucket
/// growable arrays.
#[derive(Debug, Clone, Copy)]
pub struct MemoryGrowthStrategy {
    min_increment: usize,
    factor: f32,
    function: GrowthFunction,
}

impl MemoryGrowthStrategy {
    pub fn new(function: GrowthFunction, min_increment: usize, factor: f32) -> Self {
        assert!(min_increment >= 1, "minimum growth must be at least one element");
        Self {
            min_increment,
            factor,
            function,
        }
    }

    /// Given the current capacity, returns the new capacity to grow to.
    pub fn grow(&self, capacity: usize) -> usize {
        let fcap = if capacity > 0 { capacity as f32 } else { 1.0 };
        let computed = (self.factor * self.function.eval(fcap)) as usize;
        capacity + computed.max(self.min_increment)
    }
}

impl Default for MemoryGrowthStrategy {
    /// Matches the original's default for `W2COrderedArrayTrie`: a mild log10
    /// curve with a small minimum bump, so early growth doesn't thrash small
    /// per-word arrays while large ones still taper off.
    fn default() -> Self {
        Self::new(GrowthFunction::Log10, 4, 0.3)
    }
}

/// A growable, shrink-on-demand array driven by a [`MemoryGrowthStrategy`].
///
/// Plain `Vec` already amortises growth, but the spec calls for a policy
/// object whose curve is swappable and whose capacity changes are explicit
/// allocator events (so total churn is predictable for huge models) — so we
/// drive `Vec::reserve_exact` ourselves instead of letting `Vec` double on
/// its own.
#[derive(Debug, Clone, Default)]
pub struct GrowableArray<T> {
    data: Vec<T>,
}

impl<T> GrowableArray<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn push(&mut self, value: T, strategy: &MemoryGrowthStrategy) {
        if self.data.len() == self.data.capacity() {
            let extra = strategy.grow(self.data.capacity()) - self.data.capacity();
            self.data.reserve_exact(extra.max(1));
        }
        self.data.push(value);
    }

    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
        self.data.sort_by_key(|v| key(v));
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Finds `key` via binary search over a key already kept sorted by
    /// every prior call to `insert_sorted_by_key`.
    pub fn binary_search_by_key<K: Ord>(&self, key: &K, mut key_fn: impl FnMut(&T) -> K) -> Result<usize, usize> {
        self.data.binary_search_by(|v| key_fn(v).cmp(key))
    }

    /// Inserts `value` at the position that keeps the array sorted by
    /// `key_fn`, growing capacity through `strategy` first if needed.
    /// Returns `Err(existing_index)` without inserting if `key` is already
    /// present (m-grams are unique; a repeat means malformed ARPA input).
    pub fn insert_sorted_by_key<K: Ord>(
        &mut self,
        value: T,
        key: K,
        mut key_fn: impl FnMut(&T) -> K,
        strategy: &MemoryGrowthStrategy,
    ) -> Result<usize, usize> {
        match self.data.binary_search_by(|v| key_fn(v).cmp(&key)) {
            Ok(existing) => Err(existing),
            Err(pos) => {
                if self.data.len() == self.data.capacity() {
                    let extra = strategy.grow(self.data.capacity()) - self.data.capacity();
                    self.data.reserve_exact(extra.max(1));
                }
                self.data.insert(pos, value);
                Ok(pos)
            }
        }
    }
}
