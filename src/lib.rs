//! # condense
//!
//! Abstractive summaries of arbitrarily long text, with a model whose context
//! window is not.
//!
//! ## The Problem
//!
//! Summarization models take a bounded input (1024 tokens for the BART
//! family). Web articles don't fit. Truncating throws away everything past
//! the window; feeding the whole thing fails outright.
//!
//! The workaround is to split, summarize each piece, and stitch the pieces
//! back together. Each step has its own trap:
//!
//! - Splitting on a fixed size cuts sentences in half
//! - A fixed summary length over-compresses short pieces and pads long ones
//! - Stitched summaries read as a list of disconnected blurbs
//!
//! ## The Pipeline
//!
//! ```text
//! raw text
//!    │
//!    ▼
//! Chunker ───────── sentences packed greedily under `max_tokens`;
//!    │              an oversized sentence is cut by words
//!    ▼
//! [Chunk, Chunk, ...]
//!    │
//!    ▼
//! Summarizer ────── per chunk: skip if < 30 tokens, else ask the model for
//!    │              30..=min(upper_bound, round(0.7 * tokens)) tokens
//!    ▼
//! [summary?, summary?, ...]
//!    │
//!    ▼
//! Reassembler ───── join, re-split into sentences, group 4 per paragraph,
//!    │              fold a single leftover sentence into the last paragraph
//!    ▼
//! Document
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use condense::{Config, LengthBounds, ModelError, Pipeline, Profile};
//!
//! // Any `Fn(&str, LengthBounds) -> Result<String, ModelError>` is a model.
//! let model = |text: &str, bounds: LengthBounds| -> Result<String, ModelError> {
//!     Ok(text.split_whitespace().take(bounds.max).collect::<Vec<_>>().join(" "))
//! };
//!
//! let config = Config::profile(Profile::Balanced);
//! let pipeline = Pipeline::with_word_counter(&config, Arc::new(model))?;
//!
//! let doc = pipeline.run("https://example.com/post", "Too short to summarize.");
//! assert!(doc.summary.is_empty());
//! assert_eq!(doc.stats.skipped_short, 1);
//! # Ok::<(), condense::Error>(())
//! ```
//!
//! ## Heuristics, Documented
//!
//! Sentence detection is a heuristic (see [`SentenceSegmenter`]).
//! Abbreviations like "Dr. Smith" produce false boundaries. Word-count
//! fallback chunks can exceed the token budget with a subword tokenizer.
//! Both are tagged or documented, not silently patched.
//!
//! ## Features
//!
//! | Feature | Adds |
//! |---------|------|
//! | `tokenizers` | `HfTokenCounter`: counts with the model's `tokenizer.json` |
//! | `http` | `HttpSummaryModel`: blocking client for an inference endpoint |

mod chunker;
mod config;
mod error;
mod pipeline;
mod reassemble;
mod segment;
mod span;
mod store;
mod summarizer;
mod tokens;

#[cfg(feature = "http")]
mod http;

pub use chunker::Chunker;
pub use config::{Config, Profile};
pub use error::{Error, ModelError, Result};
pub use pipeline::{Document, Pipeline, RunStats};
pub use reassemble::{Reassembler, DEFAULT_SENTENCES_PER_PARAGRAPH};
pub use segment::{
    PeriodSegmenter, RegexSegmenter, SegmenterKind, SentenceSegmenter, UnicodeSegmenter,
};
pub use span::{Chunk, ChunkKind, TextSpan};
pub use store::{Record, SummaryLog};
pub use summarizer::{
    LengthBounds, SerializedModel, SkipReason, Summarizer, SummaryBudget, SummaryModel,
    SummaryOutcome, SummaryResult, TimeoutModel,
};
pub use tokens::{TokenCounter, WordCounter, MODEL_MAX_LENGTH};

#[cfg(feature = "tokenizers")]
pub use tokens::HfTokenCounter;

#[cfg(feature = "http")]
pub use http::{HttpSummaryModel, DEFAULT_TIMEOUT};
