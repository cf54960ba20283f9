//! ARPA file ingestion (spec §4.6).
//!
//! Grounded on `twuebi-kenlm-rs`'s `reader::arpa::ArpaReader` state machine
//! (header → per-level section → footer) and its per-line parsing idiom
//! (`split_ascii_whitespace`, then decide on a trailing back-off field by
//! field count). The whole file is read into memory up front rather than
//! streamed: `CountingWordIndex` needs every token's total occurrence count
//! before it can assign final ids, and the simplest way to gather that
//! without two physical passes over the reader is to pre-scan the buffered
//! lines (DESIGN.md decision D2). `BasicWordIndex`'s `observe_occurrence` is
//! a no-op, so it pays the same pre-scan for free.

use std::io::BufRead;

use tracing::{debug, warn};

use crate::bitmap_cache::BitmapHashCache;
use crate::payload::{ProbBackoff, ZERO_BACK_OFF};
use crate::trie::{Trie, ROOT_CONTEXT};
use crate::word_index::WordIndex;

#[derive(Debug, thiserror::Error)]
pub enum ArpaError {
    #[error("missing \\data\\ header")]
    DataHeaderMissing,
    #[error("ngram count line malformed: {0:?}")]
    CountLineMalformed(String),
    #[error("missing section header for level {0}")]
    SectionHeaderMissing(usize),
    #[error("section header mismatch: expected level {expected}, found level {found}")]
    SectionHeaderMismatch { expected: usize, found: usize },
    #[error("missing \\end\\ marker")]
    MissingEndMarker,
    #[error(transparent)]
    Trie(#[from] crate::trie::TrieError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-level ingest diagnostics, surfaced to the caller rather than only
/// logged (spec.md's distillation drops this; `original_source`'s
/// `ARPAGramBuilders`/`ARPATrieBuilder` track the same per-section counters
/// internally — see DESIGN.md section C).
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Index 0 is level 1. Count declared in the `\data\` header.
    pub declared_counts: Vec<usize>,
    /// Count actually committed to the trie.
    pub inserted_counts: Vec<usize>,
    /// Lines tolerated (skipped) per level due to a parse error.
    pub skipped_lines: Vec<usize>,
}

impl IngestReport {
    fn with_order(order: usize) -> Self {
        Self {
            declared_counts: vec![0; order],
            inserted_counts: vec![0; order],
            skipped_lines: vec![0; order],
        }
    }
}

struct ParsedLine {
    log_prob: f32,
    words: Vec<String>,
    back_off: Option<f32>,
}

fn parse_line(level: usize, line: &str) -> Option<ParsedLine> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    if fields.len() < level + 1 {
        return None;
    }
    let log_prob: f32 = fields[0].parse().ok()?;
    let words: Vec<String> = fields[1..=level].iter().map(|s| s.to_string()).collect();
    let remainder = &fields[level + 1..];
    let back_off = match remainder.len() {
        0 => None,
        1 => Some(remainder[0].parse().ok()?),
        _ => return None,
    };
    Some(ParsedLine { log_prob, words, back_off })
}

fn section_header_level(line: &str) -> Option<usize> {
    let inner = line.strip_prefix('\\')?.strip_suffix(":")?;
    inner.strip_suffix("-grams")?.parse().ok()
}

/// Ingests an ARPA-formatted model into `word_index` and `trie`, recording
/// per-m-gram fingerprints into `cache` as it goes. `order` is the highest
/// m-gram level the caller's trie was built for; sections beyond it are an
/// error, not silently dropped, since a truncated top level would silently
/// change the model's back-off behaviour.
pub fn ingest_arpa<R, W, T>(
    reader: R,
    order: usize,
    word_index: &mut W,
    trie: &mut T,
    cache: &mut BitmapHashCache,
) -> Result<IngestReport, ArpaError>
where
    R: BufRead,
    W: WordIndex,
    T: Trie,
{
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut iter = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());

    if iter.next() != Some("\\data\\") {
        return Err(ArpaError::DataHeaderMissing);
    }

    let mut report = IngestReport::with_order(order);
    let mut next_header: Option<&str> = None;
    for line in iter.by_ref() {
        if let Some(rest) = line.strip_prefix("ngram ") {
            let (level_str, count_str) = rest.split_once('=').ok_or_else(|| ArpaError::CountLineMalformed(line.to_string()))?;
            let level: usize = level_str.trim().parse().map_err(|_| ArpaError::CountLineMalformed(line.to_string()))?;
            let count: usize = count_str.trim().parse().map_err(|_| ArpaError::CountLineMalformed(line.to_string()))?;
            if level >= 1 && level <= order {
                report.declared_counts[level - 1] = count;
            }
        } else {
            next_header = Some(line);
            break;
        }
    }

    word_index.reserve(report.declared_counts.first().copied().unwrap_or(0));
    for level in 1..=order {
        cache.reserve_level(level, report.declared_counts.get(level - 1).copied().unwrap_or(0));
        trie.preallocate(level, report.declared_counts.get(level - 1).copied().unwrap_or(0));
    }

    // Gather every section's raw lines first so we can pre-scan token
    // occurrences across the whole file before any id is finalized. The
    // file may declare fewer levels than `order` (a 3-gram file loaded
    // into a 5-gram model): stop cleanly the moment `\end\` turns up or
    // the file runs out, leaving the remaining levels' sections empty
    // rather than demanding exactly `order` of them (spec §4.6 step 4).
    let mut sections: Vec<Vec<&str>> = vec![Vec::new(); order];
    let mut pending_header = next_header;
    for level in 1..=order {
        let header = match pending_header.take().or_else(|| iter.next()) {
            Some("\\end\\") => {
                pending_header = Some("\\end\\");
                break;
            }
            Some(h) => h,
            None => break,
        };
        let found_level = section_header_level(header).ok_or(ArpaError::SectionHeaderMissing(level))?;
        if found_level != level {
            return Err(ArpaError::SectionHeaderMismatch {
                expected: level,
                found: found_level,
            });
        }
        let mut body = Vec::new();
        for line in iter.by_ref() {
            if line.starts_with('\\') {
                pending_header = Some(line);
                break;
            }
            body.push(line);
        }
        sections[level - 1] = body;
    }

    if pending_header != Some("\\end\\") && iter.next() != Some("\\end\\") {
        return Err(ArpaError::MissingEndMarker);
    }

    for level in 1..=order {
        for raw in &sections[level - 1] {
            if let Some(parsed) = parse_line(level, raw) {
                for word in &parsed.words {
                    word_index.observe_occurrence(word);
                }
            }
        }
    }

    for raw in &sections[0] {
        match parse_line(1, raw) {
            Some(parsed) => {
                word_index.register(&parsed.words[0]);
            }
            None => {
                report.skipped_lines[0] += 1;
                warn!(line = raw, "skipping malformed 1-gram line");
            }
        }
    }
    word_index.finalize();

    for level in 1..=order {
        let mut committed = 0usize;
        for raw in &sections[level - 1] {
            let parsed = match parse_line(level, raw) {
                Some(p) => p,
                None => {
                    if level != 1 {
                        report.skipped_lines[level - 1] += 1;
                        warn!(level, line = raw, "skipping malformed m-gram line");
                    }
                    continue;
                }
            };
            let ids: Vec<u32> = parsed.words.iter().map(|w| word_index.get(w)).collect();
            let mut parent_ctx = ROOT_CONTEXT;
            let mut resolvable = true;
            for (i, &id) in ids[..ids.len() - 1].iter().enumerate() {
                let prefix_level = i + 1;
                match trie.get_context(prefix_level, parent_ctx, id) {
                    Some(ctx) => parent_ctx = ctx,
                    None => {
                        resolvable = false;
                        break;
                    }
                }
            }
            if !resolvable {
                report.skipped_lines[level - 1] += 1;
                warn!(level, line = raw, "skipping m-gram whose prefix isn't in the trie");
                continue;
            }
            let last_word = *ids.last().unwrap();

            if level == order {
                trie.insert_final(parent_ctx, last_word, parsed.log_prob)?;
            } else {
                let payload = ProbBackoff::new(parsed.log_prob, parsed.back_off.unwrap_or(ZERO_BACK_OFF));
                trie.insert_backoff(level, parent_ctx, last_word, payload)?;
            }
            cache.record(level, &ids);
            committed += 1;
        }
        trie.post_level(level);
        report.inserted_counts[level - 1] = committed;
        debug!(level, committed, declared = report.declared_counts[level - 1], "ingested level");
    }

    Ok(report)
}
