//! Hand-off of finished runs to external storage.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::result::{RunLabel, RunResult};

/// Destination for finished runs.
///
/// The engine never persists anything itself; callers pass each
/// [`RunResult`] with its [`RunLabel`] to a sink of their choosing.
pub trait ResultSink {
    /// Store one run under `label`.
    fn persist(&mut self, label: &RunLabel, result: &RunResult) -> Result<()>;
}

/// Writes one JSON object per run, newline-delimited.
///
/// Each line is `{"stem": ..., "label": ..., "result": ...}`.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    written: usize,
}

#[derive(Serialize)]
struct Record<'a> {
    stem: String,
    label: &'a RunLabel,
    result: &'a RunResult,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of runs written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn persist(&mut self, label: &RunLabel, result: &RunResult) -> Result<()> {
        let stem = label.stem();
        let record = Record {
            stem: stem.clone(),
            label,
            result,
        };
        serde_json::to_writer(&mut self.writer, &record)
            .and_then(|()| self.writer.write_all(b"\n").map_err(serde_json::Error::io))
            .map_err(|source| Error::Persist { stem, source })?;
        self.written += 1;
        tracing::debug!("Persisted run {}", label);
        Ok(())
    }
}
