//! Error taxonomy for a benchmark session.
//!
//! Every fallible operation in the crate returns [`BenchError`]. Only
//! [`BenchError::Configuration`] raised while planning prompts is recovered
//! locally (by forging synthetic prompts); everything else aborts the session.

/// Errors surfaced by the benchmarking harness.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The compiled model's declared shapes could not be resolved into a topology
    #[error("shape error: {0}")]
    Shape(String),

    /// The tokenizer could not encode or decode the given input
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Opaque failure reported by the decode engine
    #[error("decode engine error: {0}")]
    Decode(String),

    /// Invalid or incomplete benchmark configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BenchError>;
