//! Sentence segmentation.
//!
//! Both the chunker and the reassembler need "sentence-like units". Finding
//! real sentences is hard:
//!
//! ```text
//! "Dr. Smith flew to Washington D.C. It rained."
//!     ^                            ^
//!     false boundary               real boundary, same shape
//! ```
//!
//! The segmenters here are heuristics and are documented as such. They are
//! kept behind [`SentenceSegmenter`] so a stricter one can be swapped in
//! without touching the chunker or reassembler.
//!
//! | Segmenter | Boundary | Known failure modes |
//! |-----------|----------|--------------------|
//! | [`PeriodSegmenter`] | `". "` | Abbreviations, initials; ignores `!`/`?` |
//! | [`RegexSegmenter`] | `[.!?]+` then whitespace | Abbreviations, initials |
//! | [`UnicodeSegmenter`] | UAX #29 | Abbreviations before a capital, e.g. "Dr. Smith" |
//!
//! Decimals survive all three because the period is not followed by
//! whitespace.
//!
//! ## Exact Coverage
//!
//! Segments carry their delimiter and trailing whitespace, so concatenating
//! them gives back the input byte for byte. Whitespace-only pieces are folded
//! into a neighbour rather than emitted on their own.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, Result};

static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]+\s+").expect("sentence boundary pattern is valid")
});

/// Splits text into sentence-like units.
pub trait SentenceSegmenter: Send + Sync {
    /// Split `text` into raw pieces.
    ///
    /// The pieces must concatenate back to `text`. They may be
    /// whitespace-only; [`segment`](SentenceSegmenter::segment) cleans those up.
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str>;

    /// Byte ranges of the sentences in `text`.
    ///
    /// Ranges are contiguous and cover `text` exactly, and none is
    /// whitespace-only. Blank input yields no ranges.
    fn segment(&self, text: &str) -> Vec<Range<usize>> {
        fold_blank_pieces(text, self.split(text))
    }
}

/// Fold whitespace-only pieces into the previous sentence (or the next one,
/// for leading whitespace).
fn fold_blank_pieces(text: &str, pieces: Vec<&str>) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(pieces.len());
    let mut offset = 0;
    let mut pending_start: Option<usize> = None;

    for piece in pieces {
        let start = offset;
        offset += piece.len();

        if piece.trim().is_empty() {
            match ranges.last_mut() {
                Some(last) => last.end = offset,
                None => {
                    pending_start.get_or_insert(start);
                }
            }
            continue;
        }

        ranges.push(pending_start.take().unwrap_or(start)..offset);
    }

    debug_assert!(offset == text.len(), "segmenter pieces must cover the input");
    ranges
}

/// Splits after every `". "`.
///
/// The simplest heuristic: a period followed by a space ends a sentence.
/// `!` and `?` are not boundaries, and neither is a period followed by a
/// newline.
///
/// ```rust
/// use condense::{PeriodSegmenter, SentenceSegmenter};
///
/// let text = "One. Two! Three. Four";
/// let spans: Vec<&str> = PeriodSegmenter
///     .segment(text)
///     .into_iter()
///     .map(|r| &text[r])
///     .collect();
/// assert_eq!(spans, ["One. ", "Two! Three. ", "Four"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodSegmenter;

impl SentenceSegmenter for PeriodSegmenter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_inclusive(". ").collect()
    }
}

/// Splits after a run of `.`, `!` or `?` followed by whitespace.
#[derive(Debug, Clone)]
pub struct RegexSegmenter {
    boundary: Regex,
}

impl RegexSegmenter {
    /// Use a custom boundary pattern. Each match ends a sentence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern does not compile.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let boundary = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid sentence boundary pattern: {e}")))?;
        Ok(Self { boundary })
    }
}

impl Default for RegexSegmenter {
    fn default() -> Self {
        Self {
            boundary: SENTENCE_BOUNDARY.clone(),
        }
    }
}

impl SentenceSegmenter for RegexSegmenter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for m in self.boundary.find_iter(text) {
            if m.end() > start {
                pieces.push(&text[start..m.end()]);
                start = m.end();
            }
        }
        if start < text.len() {
            pieces.push(&text[start..]);
        }
        pieces
    }
}

/// Unicode Standard Annex #29 sentence boundaries.
///
/// Stricter than the punctuation heuristics: a period followed by a
/// lowercase word ("e.g. the") is not a boundary, and closing quotes stay
/// with their sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl SentenceSegmenter for UnicodeSegmenter {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_sentence_bounds().collect()
    }
}

/// Selects a segmenter by name, for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    /// [`PeriodSegmenter`].
    #[default]
    Period,
    /// [`RegexSegmenter`] with the default boundary.
    Regex,
    /// [`UnicodeSegmenter`].
    Unicode,
}

impl SegmenterKind {
    /// Instantiate the selected segmenter.
    #[must_use]
    pub fn build(self) -> Arc<dyn SentenceSegmenter> {
        match self {
            Self::Period => Arc::new(PeriodSegmenter),
            Self::Regex => Arc::new(RegexSegmenter::default()),
            Self::Unicode => Arc::new(UnicodeSegmenter),
        }
    }
}
