//! # tokbench
//!
//! A latency benchmarking harness for autoregressive text generation.
//!
//! ## Overview
//!
//! A session drives a compiled causal language model through repeated
//! generation rounds over one or more prompt batches. For every call it
//! measures a decomposed latency profile (first token, steady-state per
//! token, overhead outside the decode loop), prints the generated text once
//! per distinct result, and emits a [`BenchmarkRecord`].
//!
//! ## Architecture
//!
//! ### Assumptions
//! All tensors exchanged with the runtime are rank 2:
//!  - The `0th` dimension is the batch dimension
//!  - The `1st` dimension is the sequence dimension
//!
//! ### Components
//!
//! - [`topology`] derives layer/head/rotary sizes from the model's declared inputs
//! - [`input`] tokenizes prompts into left-padded ids and an additive attention bias
//! - [`engine`] puts greedy and beam decoding behind one [`DecodeEngine`] trait
//! - [`latency`] times one decode call and splits its latency
//! - [`report`] deduplicates console output and builds records
//! - [`session`] runs prompts × repeat rounds and collects the records
//!
//! The tokenizer and the inference runtime are collaborators behind the
//! [`Tokenizer`] and [`GenerationRuntime`] traits. Everything runs
//! sequentially: each decode call is awaited to completion before the next
//! round starts.

pub mod config;
pub mod engine;
pub mod input;
pub mod latency;
pub mod logging;
pub mod prompts;
pub mod record;
pub mod report;
pub mod runtime;
pub mod session;
pub mod tensor;
pub mod tokenizer;
pub mod topology;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BenchConfig, Precision, RuntimeConfig};
pub use engine::{DecodeEngine, DecodeParams, DecodeStrategy, Decoded};
pub use error::{BenchError, Result};
pub use input::{GenerationRequest, InputBuilder, PreparedInput};
pub use latency::{LatencyAccountant, LatencyBreakdown, LatencyDiagnostic, LatencySample, Measurement};
pub use record::{BenchmarkRecord, CsvResults, RecordSink};
pub use runtime::{GenerationRuntime, LoadedModel};
pub use session::Session;
pub use tokenizer::Tokenizer;
pub use topology::ModelTopology;
