//! Per-chunk abstractive summarization with a computed length budget.
//!
//! ## Length Budget
//!
//! A summary should be shorter than its source, but not so short that it is
//! useless. For a chunk of `n` tokens:
//!
//! ```text
//! ceiling = min(upper_bound, round(0.7 * n))
//! floor   = 30
//!
//! n = 300, upper_bound = 130  ->  30..=130
//! n = 100, upper_bound = 130  ->  30..=70
//! n =  35, upper_bound = 130  ->  30..=30   (ceiling raised to the floor)
//! n =  29                      ->  skipped, too short to compress
//! ```
//!
//! The model is called once per chunk with these bounds and deterministic
//! (non-sampled) decoding. Models treat the bounds as a request, not a
//! guarantee, so the answer is checked:
//!
//! - Over the ceiling: cut back at a word end to at most `max` tokens, and
//!   flagged [`SummaryResult::truncated`].
//! - Under the floor: kept as is (there is no text to pad with), and visible
//!   through [`SummaryResult::within_bounds`].
//!
//! Both are logged at `warn`.
//!
//! ## Failures Are Skips
//!
//! A chunk below the threshold, a model error and a timeout all yield "no
//! summary for this chunk". The run continues; [`SummaryOutcome`] records
//! why, so the pipeline can report the loss instead of swallowing it.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::ModelError;
use crate::tokens::TokenCounter;
use crate::{Error, Result};

/// Minimum and maximum summary length, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    /// Minimum summary length.
    pub min: usize,
    /// Maximum summary length.
    pub max: usize,
}

impl LengthBounds {
    /// Whether `tokens` lies within the bounds (inclusive).
    #[must_use]
    pub fn contains(&self, tokens: usize) -> bool {
        (self.min..=self.max).contains(&tokens)
    }
}

/// The summarization capability: give text and a length budget, get a summary.
///
/// Implementations are shared across chunks (and across threads when the
/// pipeline runs a worker pool). A model that cannot run concurrent
/// inference should be wrapped in [`SerializedModel`].
pub trait SummaryModel: Send + Sync {
    /// Summarize `text` into roughly `bounds.min..=bounds.max` tokens.
    ///
    /// # Errors
    ///
    /// Any [`ModelError`]; the caller treats it as a skipped chunk.
    fn generate(&self, text: &str, bounds: LengthBounds) -> std::result::Result<String, ModelError>;
}

impl<F> SummaryModel for F
where
    F: Fn(&str, LengthBounds) -> std::result::Result<String, ModelError> + Send + Sync,
{
    fn generate(&self, text: &str, bounds: LengthBounds) -> std::result::Result<String, ModelError> {
        self(text, bounds)
    }
}

/// Serializes calls into a model that must not run concurrently, such as
/// one bound to a single compute device.
#[derive(Debug, Default)]
pub struct SerializedModel<M> {
    inner: M,
    lock: Mutex<()>,
}

impl<M: SummaryModel> SerializedModel<M> {
    /// Wrap `inner` behind a lock.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    /// Unwrap the model.
    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: SummaryModel> SummaryModel for SerializedModel<M> {
    fn generate(&self, text: &str, bounds: LengthBounds) -> std::result::Result<String, ModelError> {
        let _guard = self.lock.lock();
        self.inner.generate(text, bounds)
    }
}

/// Gives up on a model call after a deadline.
///
/// The call runs on a helper thread; if it does not answer in time the
/// result is [`ModelError::Timeout`] and the late answer is dropped.
///
/// The helper thread is not interrupted: an abandoned call keeps running
/// until the inner model returns. Anything it holds stays held. In
/// particular, a [`SerializedModel`] wrapped here keeps its lock for the
/// rest of the stalled call, so the next chunks wait behind it and can time
/// out too. Pick a deadline well above the model's normal latency, so that
/// only a truly stuck call trips it.
pub struct TimeoutModel<M: ?Sized> {
    inner: Arc<M>,
    timeout: Duration,
}

impl<M: SummaryModel + 'static> TimeoutModel<M> {
    /// Wrap `inner` with a per-call deadline.
    pub fn new(inner: M, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(inner), timeout)
    }
}

impl<M: SummaryModel + ?Sized + 'static> TimeoutModel<M> {
    /// Wrap an already shared model with a per-call deadline.
    pub fn from_arc(inner: Arc<M>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The per-call deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<M: ?Sized> std::fmt::Debug for TimeoutModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutModel")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<M: SummaryModel + ?Sized + 'static> SummaryModel for TimeoutModel<M> {
    fn generate(&self, text: &str, bounds: LengthBounds) -> std::result::Result<String, ModelError> {
        let (tx, rx) = mpsc::channel();
        let model = Arc::clone(&self.inner);
        let text = text.to_owned();
        std::thread::Builder::new()
            .name("condense-summarize".into())
            .spawn(move || {
                // The receiver is gone if we already timed out.
                let _ = tx.send(model.generate(&text, bounds));
            })
            .map_err(|e| ModelError::Inference(format!("failed to spawn model thread: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ModelError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ModelError::Inference(
                "model thread panicked".to_string(),
            )),
        }
    }
}

/// Length-budget parameters for the summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryBudget {
    /// Cap on the summary ceiling.
    pub upper_bound: usize,
    /// Minimum summary length.
    pub floor: usize,
    /// Chunks with fewer tokens than this are skipped.
    pub skip_below: usize,
    /// Ceiling as a fraction of the chunk's token count.
    pub ratio: f64,
}

impl Default for SummaryBudget {
    fn default() -> Self {
        Self {
            upper_bound: 130,
            floor: 30,
            skip_below: 30,
            ratio: 0.7,
        }
    }
}

impl SummaryBudget {
    /// Check the budget is usable.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLengthBounds`] if `floor > upper_bound`,
    /// [`Error::Config`] if `ratio` is not in `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.floor > self.upper_bound {
            return Err(Error::InvalidLengthBounds {
                floor: self.floor,
                upper_bound: self.upper_bound,
            });
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::Config(format!(
                "compression ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        Ok(())
    }

    /// Summary bounds for a chunk of `source_tokens` tokens.
    ///
    /// The ceiling is never below the floor.
    #[must_use]
    pub fn bounds(&self, source_tokens: usize) -> LengthBounds {
        let scaled = (self.ratio * source_tokens as f64).round() as usize;
        let ceiling = self.upper_bound.min(scaled).max(self.floor);
        LengthBounds {
            min: self.floor,
            max: ceiling,
        }
    }
}

/// A chunk summary with its token statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    /// The summary text, trimmed.
    pub text: String,
    /// Token count of the summary.
    pub tokens: usize,
    /// Token count of the chunk it summarizes.
    pub source_tokens: usize,
    /// Bounds the model was asked to respect.
    pub bounds: LengthBounds,
    /// The model overshot `bounds.max` and the summary was cut back.
    pub truncated: bool,
}

impl SummaryResult {
    /// Whether the model kept to the requested length.
    #[must_use]
    pub fn within_bounds(&self) -> bool {
        self.bounds.contains(self.tokens)
    }
}

/// Why a chunk contributed no summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer tokens than the skip threshold.
    TooShort {
        /// Token count of the chunk.
        tokens: usize,
    },
    /// The model call failed.
    ModelFailed(String),
    /// The model call did not finish in time.
    TimedOut,
}

/// Result of summarizing one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The model produced a summary.
    Summarized(SummaryResult),
    /// No summary; the chunk is left out of the document.
    Skipped(SkipReason),
}

impl SummaryOutcome {
    /// The summary, if any.
    #[must_use]
    pub fn into_summary(self) -> Option<SummaryResult> {
        match self {
            Self::Summarized(result) => Some(result),
            Self::Skipped(_) => None,
        }
    }

    /// Borrow the summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&SummaryResult> {
        match self {
            Self::Summarized(result) => Some(result),
            Self::Skipped(_) => None,
        }
    }
}

/// Summarizes chunks one at a time through an injected [`SummaryModel`].
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{LengthBounds, ModelError, Summarizer, SummaryBudget, WordCounter};
///
/// let model = |text: &str, bounds: LengthBounds| -> Result<String, ModelError> {
///     Ok(text.split_whitespace().take(bounds.max).collect::<Vec<_>>().join(" "))
/// };
/// let summarizer = Summarizer::new(
///     Arc::new(WordCounter::default()),
///     Arc::new(model),
///     SummaryBudget::default(),
/// );
///
/// assert!(summarizer.summarize("Too short to bother with.").is_none());
///
/// let long = "word ".repeat(100);
/// let summary = summarizer.summarize(&long).unwrap();
/// assert_eq!(summary.bounds, LengthBounds { min: 30, max: 70 });
/// assert_eq!(summary.tokens, 70);
/// ```
#[derive(Clone)]
pub struct Summarizer {
    counter: Arc<dyn TokenCounter>,
    model: Arc<dyn SummaryModel>,
    budget: SummaryBudget,
}

impl Summarizer {
    /// Create a summarizer.
    ///
    /// # Panics
    ///
    /// Panics if the budget fails [`SummaryBudget::validate`].
    #[must_use]
    pub fn new(
        counter: Arc<dyn TokenCounter>,
        model: Arc<dyn SummaryModel>,
        budget: SummaryBudget,
    ) -> Self {
        match Self::try_new(counter, model, budget) {
            Ok(summarizer) => summarizer,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a summarizer, validating the budget.
    ///
    /// # Errors
    ///
    /// See [`SummaryBudget::validate`].
    pub fn try_new(
        counter: Arc<dyn TokenCounter>,
        model: Arc<dyn SummaryModel>,
        budget: SummaryBudget,
    ) -> Result<Self> {
        budget.validate()?;
        Ok(Self {
            counter,
            model,
            budget,
        })
    }

    /// The length budget in use.
    #[must_use]
    pub fn budget(&self) -> &SummaryBudget {
        &self.budget
    }

    /// Summarize one chunk, or `None` if it was skipped for any reason.
    pub fn summarize(&self, chunk_text: &str) -> Option<SummaryResult> {
        self.summarize_chunk(chunk_text).into_summary()
    }

    /// Summarize one chunk, reporting why it was skipped.
    pub fn summarize_chunk(&self, chunk_text: &str) -> SummaryOutcome {
        let source_tokens = self.counter.count(chunk_text);
        if source_tokens < self.budget.skip_below {
            debug!(tokens = source_tokens, "chunk too short to summarize");
            return SummaryOutcome::Skipped(SkipReason::TooShort {
                tokens: source_tokens,
            });
        }

        let bounds = self.budget.bounds(source_tokens);
        match self.model.generate(chunk_text.trim(), bounds) {
            Ok(summary) => {
                let text = summary.trim();
                if text.is_empty() {
                    error!(tokens = source_tokens, "model returned an empty summary");
                    return SummaryOutcome::Skipped(SkipReason::ModelFailed(
                        "empty summary".to_string(),
                    ));
                }
                let mut text = text;
                let mut tokens = self.counter.count(text);
                let truncated = tokens > bounds.max;
                if truncated {
                    text = self.truncate(text, bounds.max);
                    warn!(
                        tokens,
                        max = bounds.max,
                        kept = self.counter.count(text),
                        "summary over the requested maximum, truncating"
                    );
                    tokens = self.counter.count(text);
                }
                if tokens < bounds.min {
                    warn!(
                        tokens,
                        min = bounds.min,
                        "summary shorter than the requested minimum"
                    );
                }
                SummaryOutcome::Summarized(SummaryResult {
                    text: text.to_string(),
                    tokens,
                    source_tokens,
                    bounds,
                    truncated,
                })
            }
            Err(ModelError::Timeout) => {
                warn!(tokens = source_tokens, "summarization timed out, skipping chunk");
                SummaryOutcome::Skipped(SkipReason::TimedOut)
            }
            Err(e) => {
                error!(tokens = source_tokens, error = %e, "summarization failed, skipping chunk");
                SummaryOutcome::Skipped(SkipReason::ModelFailed(e.to_string()))
            }
        }
    }
}

impl Summarizer {
    /// Longest prefix of `text`, cut at a word end, that counts at most
    /// `max` tokens. Never shorter than the first word.
    fn truncate<'a>(&self, text: &'a str, max: usize) -> &'a str {
        let ends = word_ends(text);
        let fit = ends.partition_point(|&end| self.counter.count(&text[..end]) <= max);
        ends.get(fit.saturating_sub(1))
            .map_or(text, |&end| &text[..end])
    }
}

/// Byte offsets where whitespace-delimited words end.
fn word_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if space && in_word {
            ends.push(i);
        }
        in_word = !space;
    }
    if in_word {
        ends.push(text.len());
    }
    ends
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
