use crate::error::{LineError, LoadError};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// How many skipped lines a report keeps verbatim
const MAX_SAMPLES: usize = 5;

/// Raw line text kept in samples and log output is cut to this many chars
const MAX_RAW_CHARS: usize = 200;

/// Which dump a pass reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Authors,
    Works,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Authors => "authors",
            Pass::Works => "works",
        })
    }
}

/// Result of pushing one line through the pipeline
#[derive(Debug)]
pub enum LineOutcome {
    /// Stored under this id
    Persisted(String),
    Skipped(LineError),
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
    pub raw: String,
}

/// Counters for one pass over a dump
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    pub lines_read: usize,
    pub persisted: usize,
    pub skipped_extract: usize,
    pub skipped_decode: usize,
    pub skipped_store: usize,
    /// The first few skipped lines
    pub samples: Vec<SkippedLine>,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        PassReport {
            pass,
            lines_read: 0,
            persisted: 0,
            skipped_extract: 0,
            skipped_decode: 0,
            skipped_store: 0,
            samples: Vec::new(),
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_extract + self.skipped_decode + self.skipped_store
    }

    /// Fold one line's outcome into the report
    ///
    /// Only a fatal store error ends the pass; every other failure is counted
    /// and logged.
    pub fn record(&mut self, line_no: usize, raw: &str, outcome: LineOutcome) -> Result<(), LoadError> {
        self.lines_read += 1;

        let err = match outcome {
            LineOutcome::Persisted(_) => {
                self.persisted += 1;
                return Ok(());
            }
            LineOutcome::Skipped(LineError::Store(source)) if source.is_fatal() => {
                return Err(LoadError::StoreUnavailable { line: line_no, source });
            }
            LineOutcome::Skipped(err) => err,
        };

        match err {
            LineError::Extract => self.skipped_extract += 1,
            LineError::Utf8(_) | LineError::Json(_) | LineError::Shape(_) => self.skipped_decode += 1,
            LineError::Store(_) => self.skipped_store += 1,
        }

        let raw: String = raw.chars().take(MAX_RAW_CHARS).collect();
        warn!(pass = %self.pass, line = line_no, reason = %err, raw = %raw, "skipping line");

        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(SkippedLine {
                line: line_no,
                reason: err.to_string(),
                raw,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} lines, {} persisted, {} skipped ({} without JSON, {} undecodable, {} store failures)",
            self.pass,
            self.lines_read,
            self.persisted,
            self.skipped(),
            self.skipped_extract,
            self.skipped_decode,
            self.skipped_store,
        )
    }
}
