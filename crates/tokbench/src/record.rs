//! Benchmark records and where they are persisted.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{BenchError, Result};

/// One row of benchmark output, produced per generation call.
///
/// Field names double as the results file header. Latency fields that could
/// not be measured (an empty sample, or fewer than three steps for the
/// steady-state average) are `None` and persist as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub input_batch_size: usize,
    pub input_token_length: usize,
    pub generated_sequence_length: usize,
    pub generation_latency_total_ms: f64,
    pub token_latency_first_ms: Option<f64>,
    pub average_token_latency_ms: Option<f64>,
    pub overhead_ms: f64,
    pub output: String,
}

/// Destination for records as they are produced.
///
/// A session pushes every record right after its round, so a sink that
/// persists immediately keeps all finished rounds if a later one fails.
pub trait RecordSink {
    /// Appends one record.
    fn push(&mut self, record: &BenchmarkRecord) -> Result<()>;
}

impl RecordSink for Vec<BenchmarkRecord> {
    fn push(&mut self, record: &BenchmarkRecord) -> Result<()> {
        Vec::push(self, record.clone());
        Ok(())
    }
}

/// Row-oriented CSV results, flushed after every record.
pub struct CsvResults<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvResults<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { writer: csv::Writer::from_path(path)? })
    }
}

impl<W: Write> CsvResults<W> {
    pub fn from_writer(inner: W) -> Self {
        Self { writer: csv::Writer::from_writer(inner) }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| BenchError::Io(err.into_error()))
    }
}

impl<W: Write> RecordSink for CsvResults<W> {
    fn push(&mut self, record: &BenchmarkRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}
