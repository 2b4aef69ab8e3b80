//! Pipeline configuration.
//!
//! ## Profiles
//!
//! Deployments differ in how much text they feed the model per call and how
//! long they let summaries run. Rather than separate code paths, the
//! differences are named presets:
//!
//! | Profile | `max_tokens` | `upper_bound` | Segmenter |
//! |---------|--------------|---------------|-----------|
//! | Compact | 300 | 130 | `". "` |
//! | Balanced | 350 | 150 | regex |
//! | Detailed | 400 | 180 | regex |
//!
//! Every field can be overridden, in code or from TOML:
//!
//! ```toml
//! max_tokens = 350
//! upper_bound = 150
//! segmenter = "unicode"
//! sentences_per_paragraph = 3
//! timeout_secs = 60
//! ```
//!
//! Missing keys take the Compact defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reassemble::DEFAULT_SENTENCES_PER_PARAGRAPH;
use crate::segment::SegmenterKind;
use crate::summarizer::SummaryBudget;
use crate::tokens::MODEL_MAX_LENGTH;
use crate::{Error, Result};

/// Named configuration presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Short chunks, short summaries.
    #[default]
    Compact,
    /// Middle ground.
    Balanced,
    /// Long chunks, long summaries.
    Detailed,
}

/// Settings for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Token budget per chunk.
    pub max_tokens: usize,
    /// Cap on the per-chunk summary ceiling.
    pub upper_bound: usize,
    /// Minimum summary length (the floor).
    pub min_summary_tokens: usize,
    /// Chunks with fewer tokens are skipped.
    pub skip_below: usize,
    /// Summary ceiling as a fraction of chunk length.
    pub compression_ratio: f64,
    /// Sentences per output paragraph.
    pub sentences_per_paragraph: usize,
    /// Sentence heuristic for chunking and reassembly.
    pub segmenter: SegmenterKind,
    /// Model context length; token counts truncate here.
    pub context_length: usize,
    /// Summarization threads. 1 runs chunks in order on the caller's thread.
    pub workers: usize,
    /// Per-chunk summarization deadline, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::profile(Profile::default())
    }
}

impl Config {
    /// Settings for a named preset.
    #[must_use]
    pub fn profile(profile: Profile) -> Self {
        let (max_tokens, upper_bound, segmenter) = match profile {
            Profile::Compact => (300, 130, SegmenterKind::Period),
            Profile::Balanced => (350, 150, SegmenterKind::Regex),
            Profile::Detailed => (400, 180, SegmenterKind::Regex),
        };
        Self {
            max_tokens,
            upper_bound,
            min_summary_tokens: 30,
            skip_below: 30,
            compression_ratio: 0.7,
            sentences_per_paragraph: DEFAULT_SENTENCES_PER_PARAGRAPH,
            segmenter,
            context_length: MODEL_MAX_LENGTH,
            workers: 1,
            timeout_secs: None,
        }
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or unknown keys, or any
    /// error from [`validate`](Config::validate).
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Config::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check that the settings describe a runnable pipeline.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTokenBudget`] if `max_tokens` is 0 or not below
    ///   `context_length`
    /// - [`Error::InvalidParagraphSize`] if `sentences_per_paragraph` is 0
    /// - [`Error::InvalidLengthBounds`] / [`Error::Config`] from
    ///   [`SummaryBudget::validate`]
    /// - [`Error::Config`] if `workers` or `timeout_secs` is 0
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 || self.max_tokens >= self.context_length {
            return Err(Error::InvalidTokenBudget {
                max_tokens: self.max_tokens,
                context_length: self.context_length,
            });
        }
        if self.sentences_per_paragraph == 0 {
            return Err(Error::InvalidParagraphSize(0));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be > 0".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Config("timeout_secs must be > 0".to_string()));
        }
        self.budget().validate()
    }

    /// The summary length budget described by these settings.
    #[must_use]
    pub fn budget(&self) -> SummaryBudget {
        SummaryBudget {
            upper_bound: self.upper_bound,
            floor: self.min_summary_tokens,
            skip_below: self.skip_below,
            ratio: self.compression_ratio,
        }
    }

    /// The per-chunk deadline, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
