//! Benchmark and runtime configuration.

use std::fmt::{self, Display};
use std::path::PathBuf;

use crate::engine::DecodeStrategy;
use crate::error::{BenchError, Result};

/// Floating point precision used for inference and the key/value cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    F32,
    Bf16,
}

impl Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::F32 => write!(f, "f32"),
            Precision::Bf16 => write!(f, "bf16"),
        }
    }
}

/// Settings of one benchmark session.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Maximum number of tokens generated per call
    pub answer_length: usize,
    pub strategy: DecodeStrategy,
    /// Rounds run for every prompt batch
    pub repeat: usize,
    pub precision: Precision,
    /// Overhead in milliseconds above which a warning is logged
    pub overhead_warn_ms: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            answer_length: 32,
            strategy: DecodeStrategy::default(),
            repeat: 1,
            precision: Precision::default(),
            overhead_warn_ms: 50.0,
        }
    }
}

impl BenchConfig {
    /// # Errors
    ///
    /// [`BenchError::Configuration`] for zero repeats, a zero answer length or
    /// a zero beam size.
    pub fn validate(&self) -> Result<()> {
        if self.repeat == 0 {
            return Err(BenchError::Configuration("repeat must be at least 1".into()));
        }
        if self.answer_length == 0 {
            return Err(BenchError::Configuration("answer length must be at least 1".into()));
        }
        if let DecodeStrategy::Beam { beam_size: 0 } = self.strategy {
            return Err(BenchError::Configuration("beam size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::for_precision(self.precision)
    }
}

/// Scheduling goal requested from the runtime when compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceHint {
    #[default]
    Latency,
}

impl Display for PerformanceHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceHint::Latency => write!(f, "LATENCY"),
        }
    }
}

/// Compile-time configuration handed to the inference runtime.
///
/// The harness does not interpret these values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub device: String,
    pub performance_hint: PerformanceHint,
    pub num_streams: usize,
    pub inference_precision: Precision,
    /// Element type forced onto every key/value cache input
    pub kv_cache_precision: Precision,
    pub denormals_optimization: bool,
    pub cache_dir: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn for_precision(precision: Precision) -> Self {
        Self {
            device: "CPU".to_string(),
            performance_hint: PerformanceHint::default(),
            num_streams: 1,
            inference_precision: precision,
            kv_cache_precision: precision,
            denormals_optimization: true,
            cache_dir: None,
        }
    }

    /// Location of the custom operator library for this platform.
    ///
    /// `None` on platforms the runtime does not support.
    pub fn extension_path() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            Some(PathBuf::from(r".\custom_ops\build\Release\ov-cpu-llm-experimental.dll"))
        } else if cfg!(target_os = "linux") {
            Some(PathBuf::from("./custom_ops/build/libov-cpu-llm-experimental.so"))
        } else {
            None
        }
    }
}
