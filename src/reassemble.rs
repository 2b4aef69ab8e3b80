//! Reassembly of chunk summaries into paragraphs.
//!
//! Chunk summaries come back as independent blurbs whose boundaries reflect
//! where the chunker cut, not where the topic changes. Reassembly throws
//! those boundaries away and regroups by sentence count:
//!
//! ```text
//! summaries: ["A. B.", "C.", "D. E. F. G. H.", "I."]
//! flat:      "A. B. C. D. E. F. G. H. I."
//! groups:    [A B C D] [E F G H] [I]
//! orphan:    [A B C D] [E F G H I]      <- single leftover joins the previous
//!
//! "A. B. C. D.\n\nE. F. G. H. I."
//! ```

use std::sync::Arc;

use crate::segment::SentenceSegmenter;
use crate::summarizer::SummaryResult;
use crate::{Error, Result};

/// Default number of sentences per paragraph.
pub const DEFAULT_SENTENCES_PER_PARAGRAPH: usize = 4;

/// Joins chunk summaries and regroups them into paragraphs.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{PeriodSegmenter, Reassembler};
///
/// let reassembler = Reassembler::new(2, Arc::new(PeriodSegmenter));
/// let text = reassembler.assemble(["One. Two.", "Three. Four. Five."]);
/// assert_eq!(text, "One. Two.\n\nThree. Four. Five.");
/// ```
#[derive(Clone)]
pub struct Reassembler {
    sentences_per_paragraph: usize,
    segmenter: Arc<dyn SentenceSegmenter>,
}

impl Reassembler {
    /// Create a new reassembler.
    ///
    /// # Panics
    ///
    /// Panics if `sentences_per_paragraph == 0`.
    #[must_use]
    pub fn new(sentences_per_paragraph: usize, segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        match Self::try_new(sentences_per_paragraph, segmenter) {
            Ok(reassembler) => reassembler,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a new reassembler, validating the paragraph size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParagraphSize`] if `sentences_per_paragraph == 0`.
    pub fn try_new(
        sentences_per_paragraph: usize,
        segmenter: Arc<dyn SentenceSegmenter>,
    ) -> Result<Self> {
        if sentences_per_paragraph == 0 {
            return Err(Error::InvalidParagraphSize(sentences_per_paragraph));
        }
        Ok(Self {
            sentences_per_paragraph,
            segmenter,
        })
    }

    /// Sentences per paragraph.
    #[must_use]
    pub fn sentences_per_paragraph(&self) -> usize {
        self.sentences_per_paragraph
    }

    /// Assemble summaries, in chunk order, into paragraphed text.
    ///
    /// Blank summaries are ignored. No summaries gives an empty string.
    pub fn assemble<I, S>(&self, summaries: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flat = String::new();
        for summary in summaries {
            let summary = summary.as_ref().trim();
            if summary.is_empty() {
                continue;
            }
            if !flat.is_empty() {
                flat.push(' ');
            }
            flat.push_str(summary);
        }

        let sentences: Vec<&str> = self
            .segmenter
            .segment(&flat)
            .into_iter()
            .map(|range| flat[range].trim())
            .collect();

        let n = self.sentences_per_paragraph;
        let mut paragraphs: Vec<Vec<&str>> = Vec::with_capacity(sentences.len().div_ceil(n));
        for group in sentences.chunks(n) {
            match paragraphs.last_mut() {
                Some(previous) if group.len() == 1 && n > 1 => previous.extend_from_slice(group),
                _ => paragraphs.push(group.to_vec()),
            }
        }

        paragraphs
            .iter()
            .map(|p| p.join(" "))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Assemble per-chunk results, skipping absent ones.
    pub fn assemble_results(&self, results: &[Option<SummaryResult>]) -> String {
        self.assemble(results.iter().flatten().map(|r| r.text.as_str()))
    }
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("sentences_per_paragraph", &self.sentences_per_paragraph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{PeriodSegmenter, RegexSegmenter};
    use crate::summarizer::LengthBounds;

    fn reassembler(n: usize) -> Reassembler {
        Reassembler::new(n, Arc::new(PeriodSegmenter))
    }

    fn numbered(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Sentence number {i}.")).collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(reassembler(4).assemble(Vec::<String>::new()), "");
        assert_eq!(reassembler(4).assemble(["", "  "]), "");
    }

    #[test]
    fn test_four_or_fewer_is_one_paragraph() {
        for n in 1..=4 {
            let text = reassembler(4).assemble(&numbered(n));
            assert!(!text.contains("\n\n"), "{n} sentences: {text:?}");
        }
    }

    #[test]
    fn test_nine_sentences_orphan_rule() {
        let text = reassembler(4).assemble(&numbered(9));
        let paragraphs: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].ends_with("number 4."));
        assert!(paragraphs[1].starts_with("Sentence number 5."));
        assert!(paragraphs[1].ends_with("number 9."));
    }

    #[test]
    fn test_two_leftovers_stay_separate() {
        let text = reassembler(4).assemble(&numbered(10));
        assert_eq!(text.split("\n\n").count(), 3);
    }

    #[test]
    fn test_single_sentence_paragraphs() {
        let text = reassembler(1).assemble(&numbered(3));
        assert_eq!(
            text,
            "Sentence number 1.\n\nSentence number 2.\n\nSentence number 3."
        );
    }

    #[test]
    fn test_regroups_across_summaries() {
        let r = Reassembler::new(3, Arc::new(RegexSegmenter::default()));
        let text = r.assemble(["A one. B two!", "C three? D four.", "E five. F six."]);
        assert_eq!(text, "A one. B two! C three?\n\nD four. E five. F six.");
    }

    #[test]
    fn test_assemble_results_skips_absent() {
        let bounds = LengthBounds { min: 1, max: 10 };
        let result = |text: &str| {
            Some(SummaryResult {
                text: text.to_string(),
                tokens: 2,
                source_tokens: 40,
                bounds,
                truncated: false,
            })
        };
        let results = vec![result("First one."), None, result("Second one.")];
        assert_eq!(
            reassembler(4).assemble_results(&results),
            "First one. Second one."
        );
    }

    #[test]
    fn test_zero_paragraph_size() {
        assert!(matches!(
            Reassembler::try_new(0, Arc::new(PeriodSegmenter)),
            Err(Error::InvalidParagraphSize(0))
        ));
    }
}
