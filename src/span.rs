//! Spans and chunks: pieces of the source text with position metadata.

use std::ops::Range;

/// A sentence-like unit of the source text with its token count.
///
/// Produced by segmentation and never mutated. `text` borrows from the
/// document, so spans cannot outlive the run that made them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    text: &'a str,
    start: usize,
    tokens: usize,
}

impl<'a> TextSpan<'a> {
    /// Create a span of `text` starting at byte `start` of the document.
    #[must_use]
    pub const fn new(text: &'a str, start: usize, tokens: usize) -> Self {
        Self {
            text,
            start,
            tokens,
        }
    }

    /// The span text, including its delimiter and trailing whitespace.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Token count of the span on its own.
    #[must_use]
    pub const fn tokens(&self) -> usize {
        self.tokens
    }

    /// Byte range of the span in the document.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }
}

/// How a chunk was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Whole sentences packed greedily under the token budget.
    Packed,
    /// A word group cut out of a single sentence that exceeded the budget
    /// on its own.
    ///
    /// Bounded by word count, not token count, so `tokens` may exceed the
    /// budget.
    Forced,
}

/// A contiguous piece of the document that goes to the summarizer.
///
/// ## Byte Offsets
///
/// `start` and `end` are byte offsets into the original text, and `text` is
/// exactly `&original[start..end]`. Chunks of one document are contiguous:
///
/// ```text
/// Original: "One two. Three four. Five six seven."
/// Chunk 0:  "One two. Three four. "  [0..21]
/// Chunk 1:  "Five six seven."        [21..36]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Byte offset where this chunk starts in the original document.
    pub start: usize,
    /// Byte offset where this chunk ends (exclusive) in the original document.
    pub end: usize,
    /// Zero-based index of this chunk in the sequence.
    pub index: usize,
    /// Token count of `text`.
    pub tokens: usize,
    /// Whether the chunk was packed or force-split.
    pub kind: ChunkKind,
}

impl Chunk {
    /// Create a new chunk.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        start: usize,
        index: usize,
        tokens: usize,
        kind: ChunkKind,
    ) -> Self {
        let text = text.into();
        let end = start + text.len();
        Self {
            text,
            start,
            end,
            index,
            tokens,
            kind,
        }
    }

    /// The byte span of this chunk in the original document.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether this chunk came from the oversized-sentence fallback.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.kind == ChunkKind::Forced
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ index: {}, span: {}..{}, tokens: {}, kind: {:?} }}",
            self.index, self.start, self.end, self.tokens, self.kind
        )
    }
}
