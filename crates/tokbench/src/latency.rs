//! Latency accounting around a single decode call.
//!
//! The decode engine reports one duration per decoding step. The first step
//! carries the prefill cost, the second often differs from the rest, and
//! everything after that is treated as steady state. Time spent outside the
//! instrumented steps is reported as overhead.

use std::fmt::{self, Display};
use std::time::Duration;

use candle_core::Tensor;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::{DecodeEngine, DecodeParams};
use crate::error::{BenchError, Result};
use crate::input::PreparedInput;
use crate::record::BenchmarkRecord;
use crate::tensor::operations::batch_dims;

/// Duration of every decoding step of one call, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySample(Vec<f64>);

impl LatencySample {
    pub fn new(steps: Vec<f64>) -> Self {
        Self(steps)
    }

    pub fn from_durations(steps: &[Duration]) -> Self {
        Self(steps.iter().map(Duration::as_secs_f64).collect())
    }

    pub fn push(&mut self, step: Duration) {
        self.0.push(step.as_secs_f64());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[f64] {
        &self.0
    }

    /// Sum of all step durations in seconds
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// Decomposition of one call's wall-clock time, all values in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyBreakdown {
    pub total: f64,
    pub first: Option<f64>,
    pub second: Option<f64>,
    /// Mean of steps `2..`; absent when fewer than three steps ran
    pub steady_state_average: Option<f64>,
    pub steady_state_steps: usize,
    /// `total - sum(sample)`; only negative through clock noise
    pub overhead: f64,
}

impl LatencyBreakdown {
    /// Splits `total` seconds of wall-clock time using the per-step `sample`.
    pub fn decompose(total: f64, sample: &LatencySample) -> Self {
        let steps = sample.steps();
        let steady = steps.get(2..).unwrap_or(&[]);
        let steady_state_average = if steady.is_empty() {
            None
        } else {
            Some(steady.iter().sum::<f64>() / steady.len() as f64)
        };

        Self {
            total,
            first: steps.first().copied(),
            second: steps.get(1).copied(),
            steady_state_average,
            steady_state_steps: steady.len(),
            overhead: total - sample.total(),
        }
    }
}

fn ms(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) => format!("{:.1}ms", s * 1e3),
        None => "-".to_string(),
    }
}

impl Display for LatencyBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}ms = {} + {} + ({} x {}) + {:.1}ms",
            self.total * 1e3,
            ms(self.first),
            ms(self.second),
            ms(self.steady_state_average),
            self.steady_state_steps,
            self.overhead * 1e3,
        )
    }
}

/// Anomaly flagged while measuring one decode call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyDiagnostic {
    /// Fewer than three steps ran, so there is no steady-state average
    ShortSample { steps: usize },
    /// Per-step timings add up to more than the wall-clock total
    NegativeOverhead { overhead_ms: f64 },
    /// Time spent outside the decode steps is above the configured threshold
    HighOverhead { overhead_ms: f64, threshold_ms: f64 },
}

/// Everything measured around one decode call.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub output_ids: Tensor,
    pub breakdown: LatencyBreakdown,
    pub input_batch_size: usize,
    pub input_token_length: usize,
    /// Output length minus input length, taken from the first batch row
    pub generated_sequence_length: usize,
    /// Anomalies found in the latency profile, also logged as warnings
    pub diagnostics: Vec<LatencyDiagnostic>,
}

impl Measurement {
    /// Converts the measurement into a record carrying `output` as its text.
    pub fn record(&self, output: String) -> BenchmarkRecord {
        let b = &self.breakdown;
        BenchmarkRecord {
            input_batch_size: self.input_batch_size,
            input_token_length: self.input_token_length,
            generated_sequence_length: self.generated_sequence_length,
            generation_latency_total_ms: b.total * 1e3,
            token_latency_first_ms: b.first.map(|s| s * 1e3),
            average_token_latency_ms: b.steady_state_average.map(|s| s * 1e3),
            overhead_ms: b.overhead * 1e3,
            output,
        }
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {:4}+{}]  {}",
            self.input_batch_size, self.input_token_length, self.generated_sequence_length, self.breakdown
        )
    }
}

/// Times decode calls and decomposes their latency.
#[derive(Debug, Clone, Copy)]
pub struct LatencyAccountant {
    overhead_warn_ms: f64,
}

impl Default for LatencyAccountant {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl LatencyAccountant {
    /// `overhead_warn_ms` is the overhead above which a warning is logged.
    pub fn new(overhead_warn_ms: f64) -> Self {
        Self { overhead_warn_ms }
    }

    /// Runs exactly one `engine.decode` call and measures it.
    ///
    /// # Errors
    ///
    /// Engine failures propagate unchanged. An output shorter than its input
    /// violates the engine contract and is reported as [`BenchError::Decode`].
    pub async fn measure(
        &self,
        engine: &dyn DecodeEngine,
        input: &PreparedInput,
        params: &DecodeParams,
    ) -> Result<Measurement> {
        let (input_batch_size, input_token_length) = batch_dims(&input.input_ids)?;

        let start = Instant::now();
        let decoded = engine.decode(input, params).await?;
        let elapsed = start.elapsed();

        let (_, output_length) = batch_dims(&decoded.output_ids)?;
        let generated_sequence_length = output_length.checked_sub(input_token_length).ok_or_else(|| {
            BenchError::Decode(format!(
                "{} returned {output_length} tokens for a {input_token_length} token input",
                engine.name()
            ))
        })?;

        let breakdown = LatencyBreakdown::decompose(elapsed.as_secs_f64(), &decoded.latency);
        let diagnostics = self.diagnose(&breakdown, decoded.latency.len());
        debug!(engine = %engine.name(), %breakdown, "decode measured");

        Ok(Measurement {
            output_ids: decoded.output_ids,
            breakdown,
            input_batch_size,
            input_token_length,
            generated_sequence_length,
            diagnostics,
        })
    }

    /// Checks a breakdown of a call that ran `steps` decoding steps.
    ///
    /// Every anomaly is logged as a warning and returned; the measured values
    /// themselves are never adjusted.
    pub fn diagnose(&self, breakdown: &LatencyBreakdown, steps: usize) -> Vec<LatencyDiagnostic> {
        let mut diagnostics = Vec::new();
        if steps < 3 {
            warn!(steps, "decode stopped before a third step, steady-state latency is unavailable");
            diagnostics.push(LatencyDiagnostic::ShortSample { steps });
        }
        let overhead_ms = breakdown.overhead * 1e3;
        if overhead_ms < 0.0 {
            warn!(overhead_ms, "negative overhead, per-step timings exceed wall-clock time");
            diagnostics.push(LatencyDiagnostic::NegativeOverhead { overhead_ms });
        } else if overhead_ms > self.overhead_warn_ms {
            warn!(overhead_ms, threshold_ms = self.overhead_warn_ms, "overhead outside the decode steps is high");
            diagnostics.push(LatencyDiagnostic::HighOverhead {
                overhead_ms,
                threshold_ms: self.overhead_warn_ms,
            });
        }
        diagnostics
    }
}
