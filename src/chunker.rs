//! Token-budgeted chunking.
//!
//! Splits a document into pieces the summarization model can take whole,
//! without cutting through sentences where it can avoid it.
//!
//! ## The Algorithm
//!
//! ```text
//! max_tokens = 10
//!
//! Sentences:  [S1: 4] [S2: 5] [S3: 3] [S4: 23]          [S5: 2]
//!
//! S1       -> current = S1                 (4)
//! S1+S2    -> current = S1 S2              (9)
//! S1+S2+S3 -> 12 > 10: flush [S1 S2], current = S3
//! S4       -> 23 > 10 on its own: flush [S3],
//!             force-split S4 by words: [10w] [10w] [3w]
//! S5       -> current = S5
//! end      -> flush [S5]
//!
//! Chunks: [S1 S2] [S3] [S4a] [S4b] [S4c] [S5]
//! ```
//!
//! The overflow test re-counts the whole candidate (`current + sentence`)
//! rather than adding per-sentence counts, because subword tokenizers are not
//! additive across a join.
//!
//! ## The Forced-Split Approximation
//!
//! A sentence longer than the budget is cut into groups of `max_tokens`
//! whitespace-delimited *words*. With a subword tokenizer a group of N words
//! is usually more than N tokens, so a forced chunk can exceed the budget.
//! Such chunks are tagged [`ChunkKind::Forced`] so callers can tell.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::segment::SentenceSegmenter;
use crate::span::{Chunk, ChunkKind, TextSpan};
use crate::tokens::TokenCounter;
use crate::{Error, Result};

/// Greedy sentence packer with a token budget.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{Chunker, PeriodSegmenter, WordCounter};
///
/// let chunker = Chunker::new(6, Arc::new(WordCounter::default()), Arc::new(PeriodSegmenter));
/// let text = "One two three. Four five. Six seven eight nine.";
/// let chunks = chunker.chunk(text);
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].text, "One two three. Four five. ");
/// assert_eq!(chunks[1].text, "Six seven eight nine.");
/// ```
#[derive(Clone)]
pub struct Chunker {
    max_tokens: usize,
    counter: Arc<dyn TokenCounter>,
    segmenter: Arc<dyn SentenceSegmenter>,
}

/// The chunk being grown.
struct Pending {
    range: Range<usize>,
    tokens: usize,
}

impl Chunker {
    /// Create a new chunker.
    ///
    /// # Arguments
    ///
    /// * `max_tokens` - Token budget per chunk
    /// * `counter` - Token counter for the target model
    /// * `segmenter` - Sentence heuristic used to find packing units
    ///
    /// # Panics
    ///
    /// Panics if `max_tokens == 0` or `max_tokens >= counter.context_length()`.
    #[must_use]
    pub fn new(
        max_tokens: usize,
        counter: Arc<dyn TokenCounter>,
        segmenter: Arc<dyn SentenceSegmenter>,
    ) -> Self {
        match Self::try_new(max_tokens, counter, segmenter) {
            Ok(chunker) => chunker,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a new chunker, validating the budget.
    ///
    /// The budget must be strictly below the counter's context length:
    /// counts are truncated there, so a budget at the limit could never
    /// detect an overflow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTokenBudget`] if the budget is out of range.
    pub fn try_new(
        max_tokens: usize,
        counter: Arc<dyn TokenCounter>,
        segmenter: Arc<dyn SentenceSegmenter>,
    ) -> Result<Self> {
        let context_length = counter.context_length();
        if max_tokens == 0 || max_tokens >= context_length {
            return Err(Error::InvalidTokenBudget {
                max_tokens,
                context_length,
            });
        }
        Ok(Self {
            max_tokens,
            counter,
            segmenter,
        })
    }

    /// The token budget per chunk.
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split `text` into chunks.
    ///
    /// Chunks are contiguous, in document order, and never blank. Blank
    /// input yields no chunks. The result depends only on `text` and the
    /// chunker's configuration.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut pending: Option<Pending> = None;

        for range in self.segmenter.segment(text) {
            let sentence = &text[range.clone()];
            let span = TextSpan::new(sentence, range.start, self.counter.count(sentence));

            if span.tokens() > self.max_tokens {
                Self::flush(text, pending.take(), &mut chunks);
                self.force_split(text, span, &mut chunks);
                continue;
            }

            pending = Some(match pending.take() {
                None => Pending {
                    range,
                    tokens: span.tokens(),
                },
                Some(current) => {
                    let candidate = current.range.start..range.end;
                    let tokens = self.counter.count(&text[candidate.clone()]);
                    if tokens > self.max_tokens {
                        Self::flush(text, Some(current), &mut chunks);
                        Pending {
                            range,
                            tokens: span.tokens(),
                        }
                    } else {
                        Pending {
                            range: candidate,
                            tokens,
                        }
                    }
                }
            });
        }

        Self::flush(text, pending, &mut chunks);
        chunks
    }

    fn flush(text: &str, pending: Option<Pending>, chunks: &mut Vec<Chunk>) {
        let Some(Pending { range, tokens }) = pending else {
            return;
        };
        debug!(
            index = chunks.len(),
            start = range.start,
            end = range.end,
            tokens,
            "flushing chunk"
        );
        chunks.push(Chunk::new(
            &text[range.clone()],
            range.start,
            chunks.len(),
            tokens,
            ChunkKind::Packed,
        ));
    }

    /// Cut an oversized sentence into groups of `max_tokens` words.
    ///
    /// Group boundaries sit at word starts, so the groups still tile the
    /// sentence exactly (whitespace travels with the preceding group).
    fn force_split(&self, text: &str, span: TextSpan<'_>, chunks: &mut Vec<Chunk>) {
        let sentence = span.text();
        let base = span.range().start;
        let starts = word_starts(sentence);

        let mut cuts: Vec<usize> = starts
            .iter()
            .step_by(self.max_tokens)
            .skip(1)
            .copied()
            .collect();
        cuts.push(sentence.len());

        debug!(
            start = base,
            tokens = span.tokens(),
            words = starts.len(),
            groups = cuts.len(),
            max_tokens = self.max_tokens,
            "sentence exceeds budget, splitting by words"
        );

        let mut from = 0;
        for to in cuts {
            let group = &text[base + from..base + to];
            chunks.push(Chunk::new(
                group,
                base + from,
                chunks.len(),
                self.counter.count(group),
                ChunkKind::Forced,
            ));
            from = to;
        }
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Byte offsets where whitespace-delimited words begin.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut after_space = true;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if !space && after_space {
            starts.push(i);
        }
        after_space = space;
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{PeriodSegmenter, RegexSegmenter};
    use crate::tokens::WordCounter;

    fn chunker(max_tokens: usize) -> Chunker {
        Chunker::new(
            max_tokens,
            Arc::new(WordCounter::default()),
            Arc::new(PeriodSegmenter),
        )
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(chunker(10).chunk("").is_empty());
        assert!(chunker(10).chunk("  \n\t ").is_empty());
    }

    #[test]
    fn test_single_short_sentence() {
        let chunks = chunker(10).chunk("Just one sentence.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Just one sentence.");
        assert_eq!(chunks[0].kind, ChunkKind::Packed);
        assert_eq!(chunks[0].tokens, 3);
    }

    #[test]
    fn test_overflow_starts_new_chunk_with_trigger() {
        let text = "a b c d. e f g. h i j k l.";
        let chunks = chunker(7).chunk(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a b c d. e f g. ");
        assert_eq!(chunks[1].text, "h i j k l.");
    }

    #[test]
    fn test_many_short_sentences() {
        let text = "The cat sat right here. ".repeat(40);
        let chunks = chunker(10).chunk(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.is_forced());
            assert!(chunk.text.split_whitespace().count() <= 10, "{chunk}");
        }
    }

    #[test]
    fn test_forced_split() {
        let text = format!("Short one. {}. Tail.", words(25));
        let chunks = chunker(10).chunk(&text);

        let forced: Vec<_> = chunks.iter().filter(|c| c.is_forced()).collect();
        assert_eq!(forced.len(), 3);
        assert_eq!(forced[0].text.split_whitespace().count(), 10);
        assert_eq!(forced[1].text.split_whitespace().count(), 10);
        assert_eq!(forced[2].text.split_whitespace().count(), 5);

        assert_eq!(chunks.first().map(|c| c.text.as_str()), Some("Short one. "));
        assert_eq!(chunks.last().map(|c| c.text.as_str()), Some("Tail."));
    }

    #[test]
    fn test_forced_split_exact_multiple() {
        let text = words(20);
        let chunks = chunker(10).chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(Chunk::is_forced));
    }

    #[test]
    fn test_chunks_tile_input() {
        let text = format!("  Lead in. {} and more. Last bit here.  ", words(31));
        let chunks = chunker(8).chunk(&text);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(&text[chunk.span()], chunk.text);
        }
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_packed_chunks_respect_budget() {
        let text = "One two three! Four five six? Seven eight. Nine ten eleven twelve. ".repeat(5);
        let chunker = Chunker::new(
            9,
            Arc::new(WordCounter::default()),
            Arc::new(RegexSegmenter::default()),
        );
        for chunk in chunker.chunk(&text) {
            assert!(chunk.tokens <= 9, "{chunk}");
        }
    }

    #[test]
    fn test_deterministic() {
        let text = format!("Alpha beta. {}. Gamma delta epsilon.", words(17));
        let c = chunker(6);
        assert_eq!(c.chunk(&text), c.chunk(&text));
    }

    #[test]
    fn test_word_starts() {
        assert_eq!(word_starts("  ab c\n d"), vec![2, 5, 8]);
        assert!(word_starts("   ").is_empty());
    }

    #[test]
    fn test_invalid_budget() {
        let counter: Arc<dyn TokenCounter> = Arc::new(WordCounter::new(100));
        let segmenter: Arc<dyn SentenceSegmenter> = Arc::new(PeriodSegmenter);
        assert!(Chunker::try_new(0, counter.clone(), segmenter.clone()).is_err());
        assert!(Chunker::try_new(100, counter.clone(), segmenter.clone()).is_err());
        assert!(Chunker::try_new(99, counter, segmenter).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_zero_budget_panics() {
        let _ = chunker(0);
    }
}
