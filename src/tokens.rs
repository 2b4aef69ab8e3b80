//! Token counting against the summarization model's vocabulary.
//!
//! Every budget in the pipeline is expressed in tokens: the chunk budget, the
//! short-chunk threshold, the summary floor and ceiling. A token is not a word.
//! BPE vocabularies split rare words into several pieces and glue punctuation
//! onto neighbours, so the ratio drifts with the text:
//!
//! ```text
//! "The cat sat."            -> 3 words, 4 tokens  ["The", " cat", " sat", "."]
//! "Antidisestablishmentarianism" -> 1 word, 6 tokens
//! ```
//!
//! Two counters are provided:
//!
//! - [`WordCounter`]: whitespace-delimited words. Cheap, dependency-free and
//!   deterministic; the default.
//! - `HfTokenCounter` (feature `tokenizers`): the real model tokenizer loaded
//!   from a `tokenizer.json`.
//!
//! Both truncate at the model's context length, so a count never exceeds what
//! the model would actually see.

use std::sync::Arc;

/// Maximum context length of the summarization model, in tokens.
pub const MODEL_MAX_LENGTH: usize = 1024;

/// Measures how many model tokens a span of text consumes.
///
/// Implementations must be deterministic and side-effect free: the chunker
/// calls [`count`](TokenCounter::count) once per candidate append.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` occupies, truncated at
    /// [`context_length`](TokenCounter::context_length). Empty text is 0.
    fn count(&self, text: &str) -> usize;

    /// The truncation limit applied by [`count`](TokenCounter::count).
    fn context_length(&self) -> usize {
        MODEL_MAX_LENGTH
    }
}

impl<T: TokenCounter + ?Sized> TokenCounter for Arc<T> {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }

    fn context_length(&self) -> usize {
        (**self).context_length()
    }
}

/// Counts whitespace-delimited words as tokens.
///
/// ## Example
///
/// ```rust
/// use condense::{TokenCounter, WordCounter};
///
/// let counter = WordCounter::default();
/// assert_eq!(counter.count("The quick  brown\nfox"), 4);
/// assert_eq!(counter.count(""), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCounter {
    context_length: usize,
}

impl WordCounter {
    /// Create a word counter truncating at `context_length`.
    ///
    /// # Panics
    ///
    /// Panics if `context_length == 0`.
    #[must_use]
    pub fn new(context_length: usize) -> Self {
        assert!(context_length > 0, "context_length must be > 0");
        Self { context_length }
    }
}

impl Default for WordCounter {
    fn default() -> Self {
        Self::new(MODEL_MAX_LENGTH)
    }
}

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().take(self.context_length).count()
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

#[cfg(feature = "tokenizers")]
pub use hf::HfTokenCounter;

#[cfg(feature = "tokenizers")]
mod hf {
    use std::path::Path;

    use tokenizers::tokenizer::{
        Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy,
    };

    use super::TokenCounter;
    use crate::{Error, Result};

    /// Counts tokens with the model's own HuggingFace tokenizer.
    ///
    /// Special tokens (BOS/EOS) are not counted, so the empty string is 0.
    pub struct HfTokenCounter {
        tokenizer: Tokenizer,
        context_length: usize,
    }

    impl HfTokenCounter {
        /// Load a tokenizer from a `tokenizer.json` file.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Tokenizer`] if the file cannot be read or parsed,
        /// or truncation cannot be configured.
        pub fn from_file(path: impl AsRef<Path>, context_length: usize) -> Result<Self> {
            let tokenizer = Tokenizer::from_file(path.as_ref()).map_err(|e| {
                Error::Tokenizer(format!(
                    "failed to load {}: {e}",
                    path.as_ref().display()
                ))
            })?;
            Self::with_tokenizer(tokenizer, context_length)
        }

        /// Build a counter from serialized tokenizer JSON.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Tokenizer`] if deserialization or truncation setup fails.
        pub fn from_bytes(bytes: impl AsRef<[u8]>, context_length: usize) -> Result<Self> {
            let tokenizer = Tokenizer::from_bytes(bytes)
                .map_err(|e| Error::Tokenizer(format!("failed to deserialize tokenizer: {e}")))?;
            Self::with_tokenizer(tokenizer, context_length)
        }

        fn with_tokenizer(mut tokenizer: Tokenizer, context_length: usize) -> Result<Self> {
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length: context_length,
                    stride: 0,
                    strategy: TruncationStrategy::LongestFirst,
                    direction: TruncationDirection::Right,
                }))
                .map_err(|e| Error::Tokenizer(format!("failed to configure truncation: {e}")))?;

            Ok(Self {
                tokenizer,
                context_length,
            })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count(&self, text: &str) -> usize {
            if text.is_empty() {
                return 0;
            }
            self.tokenizer
                .encode(text, false)
                .map(|encoding| encoding.len())
                .unwrap_or(0)
        }

        fn context_length(&self) -> usize {
            self.context_length
        }
    }

    impl std::fmt::Debug for HfTokenCounter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HfTokenCounter")
                .field("context_length", &self.context_length)
                .finish_non_exhaustive()
        }
    }
}
