//! Error types for condense.

/// Errors that can occur while configuring or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid chunk token budget (must be > 0 and fit the context window).
    #[error("invalid token budget: {max_tokens} (must be in 1..{context_length})")]
    InvalidTokenBudget {
        /// The requested budget.
        max_tokens: usize,
        /// The model's context length.
        context_length: usize,
    },

    /// Invalid paragraph size (must be > 0).
    #[error("invalid paragraph size: {0} (must be > 0)")]
    InvalidParagraphSize(usize),

    /// Summary length bounds are inconsistent.
    #[error("invalid summary bounds: floor {floor} exceeds upper bound {upper_bound}")]
    InvalidLengthBounds {
        /// The minimum summary length.
        floor: usize,
        /// The configured ceiling cap.
        upper_bound: usize,
    },

    /// Configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Tokenizer could not be loaded or configured.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Every chunk that reached the model failed, so there is nothing to
    /// persist.
    #[error("no summary for {source_id}: {failed} chunks failed, {timed_out} timed out")]
    RunFailed {
        /// Identifier of the input.
        source_id: String,
        /// Chunks whose model call failed.
        failed: usize,
        /// Chunks whose model call timed out.
        timed_out: usize,
    },

    /// Appending to the summary log failed.
    #[error("failed to persist summary for {source_id}: {source}")]
    Persistence {
        /// Identifier of the record that could not be written.
        source_id: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a summarization model call.
///
/// These never abort a run: the pipeline records the failing chunk as
/// absent and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model raised during inference.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The call did not finish in time.
    #[error("inference timed out")]
    Timeout,

    /// The model answered, but not with a summary.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Transport failure talking to a remote model.
    #[cfg(feature = "http")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for condense operations.
pub type Result<T> = std::result::Result<T, Error>;
