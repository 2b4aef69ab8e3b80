//! Append-only summary log.
//!
//! Each finished document becomes one self-contained record:
//!
//! ```text
//!
//! URL: https://example.com/article
//! First paragraph of the summary.
//!
//! Second paragraph of the summary.
//! ```
//!
//! A blank line, an identifier line, then the summary. Records are only
//! ever appended, each with a single write, so a failure cannot damage what
//! is already in the file.
//!
//! Summary lines that would read as an identifier line (`URL: ...`) are
//! written with a leading backslash, as are lines that already start with
//! one. Reading strips exactly one, so bodies round-trip unchanged.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{Error, Result};

const ID_PREFIX: &str = "URL: ";
const ESCAPE: char = '\\';

/// One persisted summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Where the summarized text came from.
    pub source_id: String,
    /// The assembled summary.
    pub summary: String,
}

/// A durable, append-only text log of summaries.
#[derive(Debug, Clone)]
pub struct SummaryLog {
    path: PathBuf,
}

impl SummaryLog {
    /// Use the log at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file cannot be opened or written.
    pub fn append(&self, source_id: &str, summary: &str) -> Result<()> {
        // Newlines in the identifier would break record framing.
        let source_id = source_id.replace(['\r', '\n'], " ");
        let record = format!("\n{ID_PREFIX}{source_id}\n{}\n", escape_body(summary.trim_end()));

        let persistence = |source| Error::Persistence {
            source_id: source_id.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(persistence)?;
        file.write_all(record.as_bytes()).map_err(persistence)?;
        file.flush().map_err(persistence)?;

        info!(
            source_id = %source_id,
            path = %self.path.display(),
            bytes = record.len(),
            "summary persisted"
        );
        Ok(())
    }

    /// Read every record back, oldest first. A missing file has no records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file exists but cannot be read.
    pub fn records(&self) -> Result<Vec<Record>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(Error::Persistence {
                    source_id: self.path.display().to_string(),
                    source,
                })
            }
        };
        Ok(parse_records(&contents))
    }
}

fn parse_records(contents: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in contents.lines() {
        if let Some(id) = line.strip_prefix(ID_PREFIX) {
            records.extend(current.take().map(finish_record));
            current = Some((id.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    records.extend(current.map(finish_record));
    records
}

fn finish_record((source_id, body): (String, Vec<&str>)) -> Record {
    let body: Vec<&str> = body
        .into_iter()
        .map(|line| line.strip_prefix(ESCAPE).unwrap_or(line))
        .collect();
    Record {
        source_id,
        summary: body.join("\n").trim().to_string(),
    }
}

fn escape_body(summary: &str) -> String {
    summary
        .split('\n')
        .map(|line| {
            if line.starts_with(ID_PREFIX) || line.starts_with(ESCAPE) {
                format!("{ESCAPE}{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
