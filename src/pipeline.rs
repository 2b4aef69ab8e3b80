//! The chunk, summarize, reassemble pipeline.
//!
//! ```text
//! raw text ──▶ Chunker ──▶ [Chunk] ──▶ Summarizer (per chunk) ──▶ [SummaryOutcome]
//!                                                                      │
//!                          Document ◀── Reassembler ◀── summaries ◀────┘
//! ```
//!
//! Chunking completes before any summarization starts, and reassembly waits
//! for every chunk. Chunks are independent of each other, so with
//! [`Pipeline::with_workers`] they are summarized on a pool of threads and
//! put back in chunk order before reassembly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunker::Chunker;
use crate::config::Config;
use crate::reassemble::Reassembler;
use crate::span::Chunk;
use crate::store::SummaryLog;
use crate::summarizer::{SkipReason, Summarizer, SummaryModel, SummaryOutcome, TimeoutModel};
use crate::tokens::{TokenCounter, WordCounter};
use crate::{Error, Result};

/// Per-run counts, so lost chunks are visible rather than silent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Chunks produced.
    pub chunks: usize,
    /// Chunks from the oversized-sentence fallback.
    pub forced_chunks: usize,
    /// Chunks that contributed a summary.
    pub summarized: usize,
    /// Chunks below the token threshold.
    pub skipped_short: usize,
    /// Chunks whose model call failed.
    pub failed: usize,
    /// Chunks whose model call timed out.
    pub timed_out: usize,
    /// Summaries cut back to the requested maximum.
    pub truncated: usize,
    /// Summaries shorter than the requested minimum.
    pub below_floor: usize,
}

impl RunStats {
    fn tally(chunks: &[Chunk], outcomes: &[SummaryOutcome]) -> Self {
        let mut stats = Self {
            chunks: chunks.len(),
            forced_chunks: chunks.iter().filter(|c| c.is_forced()).count(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                SummaryOutcome::Summarized(result) => {
                    stats.summarized += 1;
                    stats.truncated += usize::from(result.truncated);
                    stats.below_floor += usize::from(result.tokens < result.bounds.min);
                }
                SummaryOutcome::Skipped(SkipReason::TooShort { .. }) => stats.skipped_short += 1,
                SummaryOutcome::Skipped(SkipReason::ModelFailed(_)) => stats.failed += 1,
                SummaryOutcome::Skipped(SkipReason::TimedOut) => stats.timed_out += 1,
            }
        }
        stats
    }

    /// Chunks that contributed nothing.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_short + self.failed + self.timed_out
    }

    /// Whether chunks reached the model but none produced a summary.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.summarized == 0 && self.failed + self.timed_out > 0
    }
}

/// Everything one run produced for one input.
#[derive(Debug, Clone)]
pub struct Document {
    /// Where the text came from (e.g. the page URL).
    pub source_id: String,
    /// The chunks, in document order.
    pub chunks: Vec<Chunk>,
    /// One outcome per chunk, in chunk order.
    pub outcomes: Vec<SummaryOutcome>,
    /// The final paragraphed summary. Empty if nothing was summarized.
    pub summary: String,
    /// Counts for this run.
    pub stats: RunStats,
}

impl Document {
    /// Append this document's summary to `log`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](crate::Error::Persistence) if the write fails.
    pub fn persist(&self, log: &SummaryLog) -> Result<()> {
        log.append(&self.source_id, &self.summary)
    }
}

/// Chunker, summarizer and reassembler wired together.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use condense::{Config, LengthBounds, ModelError, Pipeline};
///
/// // Stand-in model: keep the first `bounds.max` words.
/// let model = |text: &str, bounds: LengthBounds| -> Result<String, ModelError> {
///     Ok(text.split_whitespace().take(bounds.max).collect::<Vec<_>>().join(" "))
/// };
///
/// let pipeline = Pipeline::with_word_counter(&Config::default(), Arc::new(model))?;
/// let doc = pipeline.run("https://example.com", &"A sentence with several words. ".repeat(200));
///
/// assert!(doc.stats.chunks > 1);
/// assert!(!doc.summary.is_empty());
/// # Ok::<(), condense::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    chunker: Chunker,
    summarizer: Summarizer,
    reassembler: Reassembler,
    workers: usize,
}

impl Pipeline {
    /// Assemble a pipeline from its stages. Summarization runs on the
    /// caller's thread.
    #[must_use]
    pub fn new(chunker: Chunker, summarizer: Summarizer, reassembler: Reassembler) -> Self {
        Self {
            chunker,
            summarizer,
            reassembler,
            workers: 1,
        }
    }

    /// Build every stage from `config`, sharing `counter` and `model`.
    ///
    /// If the config sets a timeout, `model` is wrapped in a
    /// [`TimeoutModel`].
    ///
    /// # Errors
    ///
    /// Any error from [`Config::validate`], or [`Error::InvalidTokenBudget`](crate::Error::InvalidTokenBudget)
    /// if `max_tokens` does not fit the counter's context length.
    pub fn from_config(
        config: &Config,
        counter: Arc<dyn TokenCounter>,
        model: Arc<dyn SummaryModel>,
    ) -> Result<Self> {
        config.validate()?;

        let model: Arc<dyn SummaryModel> = match config.timeout() {
            Some(timeout) => Arc::new(TimeoutModel::from_arc(model, timeout)),
            None => model,
        };
        let segmenter = config.segmenter.build();

        let chunker = Chunker::try_new(config.max_tokens, Arc::clone(&counter), Arc::clone(&segmenter))?;
        let summarizer = Summarizer::try_new(counter, model, config.budget())?;
        let reassembler = Reassembler::try_new(config.sentences_per_paragraph, segmenter)?;

        Ok(Self::new(chunker, summarizer, reassembler).with_workers(config.workers))
    }

    /// [`from_config`](Pipeline::from_config) with a [`WordCounter`]
    /// truncating at the configured context length.
    ///
    /// # Errors
    ///
    /// As [`from_config`](Pipeline::from_config).
    pub fn with_word_counter(config: &Config, model: Arc<dyn SummaryModel>) -> Result<Self> {
        config.validate()?;
        let counter = Arc::new(WordCounter::new(config.context_length));
        Self::from_config(config, counter, model)
    }

    /// Summarize chunks on `workers` threads. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The chunking stage.
    #[must_use]
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// The summarization stage.
    #[must_use]
    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// The reassembly stage.
    #[must_use]
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Run the whole pipeline over `text`.
    ///
    /// Never fails: blank input gives an empty summary, and chunks the model
    /// cannot handle are left out and counted in [`RunStats`].
    pub fn run(&self, source_id: impl Into<String>, text: &str) -> Document {
        let source_id = source_id.into();

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            warn!(source_id = %source_id, "no text to summarize");
        }

        let outcomes = self.summarize_all(&chunks);
        let stats = RunStats::tally(&chunks, &outcomes);

        if stats.skipped_short > 0 {
            warn!(
                source_id = %source_id,
                skipped = stats.skipped_short,
                threshold = self.summarizer.budget().skip_below,
                "chunks too short to summarize were left out"
            );
        }
        if stats.failed + stats.timed_out > 0 {
            warn!(
                source_id = %source_id,
                failed = stats.failed,
                timed_out = stats.timed_out,
                "summary is incomplete"
            );
        }

        let summary = self.reassembler.assemble(
            outcomes
                .iter()
                .filter_map(SummaryOutcome::summary)
                .map(|r| r.text.as_str()),
        );

        info!(
            source_id = %source_id,
            chunks = stats.chunks,
            forced = stats.forced_chunks,
            summarized = stats.summarized,
            skipped = stats.skipped(),
            truncated = stats.truncated,
            below_floor = stats.below_floor,
            summary_bytes = summary.len(),
            "run complete"
        );

        Document {
            source_id,
            chunks,
            outcomes,
            summary,
            stats,
        }
    }

    /// Run the pipeline and append the result to `log`.
    ///
    /// A run with nothing to say (blank input, or only short chunks) is
    /// still recorded, with an empty summary. A run where every model call
    /// failed is not: the log is left untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::RunFailed`](crate::Error::RunFailed) if chunks reached
    ///   the model and none was summarized
    /// - [`Error::Persistence`](crate::Error::Persistence) if the append
    ///   fails. The log's earlier records are untouched.
    pub fn run_and_persist(
        &self,
        source_id: impl Into<String>,
        text: &str,
        log: &SummaryLog,
    ) -> Result<Document> {
        let document = self.run(source_id, text);
        if document.stats.all_failed() {
            error!(
                source_id = %document.source_id,
                failed = document.stats.failed,
                timed_out = document.stats.timed_out,
                "every chunk failed, nothing persisted"
            );
            return Err(Error::RunFailed {
                source_id: document.source_id,
                failed: document.stats.failed,
                timed_out: document.stats.timed_out,
            });
        }
        document.persist(log)?;
        Ok(document)
    }

    fn summarize_all(&self, chunks: &[Chunk]) -> Vec<SummaryOutcome> {
        let workers = self.workers.min(chunks.len());
        if workers <= 1 {
            return chunks
                .iter()
                .map(|chunk| self.summarizer.summarize_chunk(&chunk.text))
                .collect();
        }

        // Workers pull the next chunk index until none are left, then the
        // results are put back in chunk order.
        let next = AtomicUsize::new(0);
        let mut indexed: Vec<(usize, SummaryOutcome)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(chunk) = chunks.get(i) else { break };
                            done.push((i, self.summarizer.summarize_chunk(&chunk.text)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        indexed.sort_unstable_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::segment::PeriodSegmenter;
    use crate::summarizer::{LengthBounds, SummaryBudget};

    type ModelResult = std::result::Result<String, ModelError>;

    /// Echoes the first word of the chunk as a one-sentence summary.
    fn first_word(text: &str, _: LengthBounds) -> ModelResult {
        let word = text.split_whitespace().next().unwrap_or_default();
        Ok(format!("Chunk starting {word}."))
    }

    fn pipeline(max_tokens: usize) -> Pipeline {
        let counter: Arc<dyn TokenCounter> = Arc::new(WordCounter::default());
        let segmenter = Arc::new(PeriodSegmenter);
        Pipeline::new(
            Chunker::new(max_tokens, Arc::clone(&counter), segmenter.clone()),
            Summarizer::new(counter, Arc::new(first_word), SummaryBudget::default()),
            Reassembler::new(4, segmenter),
        )
    }

    fn sentences(n: usize) -> String {
        (0..n)
            .map(|i| format!("s{i} has exactly six words here. "))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let doc = pipeline(60).run("empty", "");
        assert!(doc.chunks.is_empty());
        assert!(doc.summary.is_empty());
        assert_eq!(doc.stats, RunStats::default());
    }

    #[test]
    fn test_short_tail_is_counted() {
        // 11 sentences of 6 words with budget 60: one chunk of 60, one of 6.
        let doc = pipeline(60).run("doc", &sentences(11));
        assert_eq!(doc.stats.chunks, 2);
        assert_eq!(doc.stats.summarized, 1);
        assert_eq!(doc.stats.skipped_short, 1);
        assert_eq!(doc.summary, "Chunk starting s0.");
    }

    #[test]
    fn test_stats_count_out_of_bounds_summaries() {
        // Each 60-token chunk asks for 30..=42; a one-sentence answer is short.
        let doc = pipeline(60).run("doc", &sentences(30));
        assert_eq!(doc.stats.summarized, 3);
        assert_eq!(doc.stats.below_floor, 3);
        assert_eq!(doc.stats.truncated, 0);
    }

    #[test]
    fn test_all_failed() {
        let failed = RunStats {
            chunks: 2,
            failed: 1,
            timed_out: 1,
            ..RunStats::default()
        };
        assert!(failed.all_failed());

        let short_only = RunStats {
            chunks: 1,
            skipped_short: 1,
            ..RunStats::default()
        };
        assert!(!short_only.all_failed());
        assert!(!RunStats::default().all_failed());
    }

    #[test]
    fn test_workers_preserve_order() {
        let text = sentences(100);
        let sequential = pipeline(36).run("doc", &text);
        let parallel = pipeline(36).with_workers(4).run("doc", &text);

        assert_eq!(sequential.outcomes, parallel.outcomes);
        assert_eq!(sequential.summary, parallel.summary);
        assert!(parallel.stats.summarized > 4);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_tokens: 50,
            workers: 2,
            ..Config::default()
        };
        let p = Pipeline::with_word_counter(&config, Arc::new(first_word)).unwrap();
        assert_eq!(p.chunker().max_tokens(), 50);
        assert_eq!(p.reassembler().sentences_per_paragraph(), 4);
        assert_eq!(p.summarizer().budget().upper_bound, 130);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = Config {
            max_tokens: 0,
            ..Config::default()
        };
        assert!(Pipeline::with_word_counter(&config, Arc::new(first_word)).is_err());
    }
}
