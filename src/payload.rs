//! M-gram payload types and the reserved log-probability constants (spec §3).

/// Base-10 log-probability used for an out-of-vocabulary unigram and as the
/// floor any back-off chain can reach.
pub const ZERO_LOG_PROB: f32 = -10.0;

/// Sentinel for "this payload was never written".
pub const UNDEF_LOG_PROB: f32 = f32::INFINITY;

/// Default back-off weight for an m-gram whose ARPA line had no `back` field.
pub const ZERO_BACK_OFF: f32 = 0.0;

/// Payload stored for m-grams of level `1 <= m < N`: a log-probability plus a
/// log back-off weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbBackoff {
    pub prob: f32,
    pub back: f32,
}

impl ProbBackoff {
    pub const UNDEFINED: ProbBackoff = ProbBackoff {
        prob: UNDEF_LOG_PROB,
        back: ZERO_BACK_OFF,
    };

    pub fn new(prob: f32, back: f32) -> Self {
        Self { prob, back }
    }

    /// The `<unk>` payload used whenever a query hits an out-of-vocabulary
    /// word and no 1-gram entry was ever registered for it.
    pub fn unknown() -> Self {
        Self {
            prob: ZERO_LOG_PROB,
            back: ZERO_BACK_OFF,
        }
    }
}

impl Default for ProbBackoff {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

/// Payload stored for the highest m-gram level, `m == N`: probability only,
/// no back-off (there is nothing shorter than N to back off from within the
/// same entry; back-off at level N falls through to the (N-1)-gram's `back`).
pub type NGramProb = f32;
