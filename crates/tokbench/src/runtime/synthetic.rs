use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{CompiledModel, GenerationRuntime, ModelManifest, PartialShape, SyntheticProfile};
use crate::config::{Precision, RuntimeConfig};
use crate::engine::{DecodeParams, Decoded};
use crate::error::{BenchError, Result};
use crate::input::PreparedInput;
use crate::latency::LatencySample;
use crate::tensor::operations::{matrix_from_rows, rows_of};

/// Deterministic runtime described by a [`ModelManifest`].
///
/// Each step sleeps for the manifest's cost profile and appends the successor
/// of the previous token (skipping end-of-sequence and padding ids), so runs
/// are reproducible and the harness overhead can be checked against known
/// step costs. Sequences that finished are padded until the batch stops.
#[derive(Debug, Clone)]
pub struct SyntheticRuntime {
    manifest: ModelManifest,
    config: RuntimeConfig,
}

impl SyntheticRuntime {
    /// # Errors
    ///
    /// [`BenchError::Configuration`] when the profile cannot produce tokens.
    pub fn compile(manifest: ModelManifest, config: RuntimeConfig) -> Result<Self> {
        let profile = &manifest.synthetic;
        if profile.vocab_size < 3 {
            return Err(BenchError::Configuration(format!(
                "synthetic vocabulary needs at least 3 ids, got {}",
                profile.vocab_size
            )));
        }
        if profile.stop_after == Some(0) {
            return Err(BenchError::Configuration("synthetic stop_after is 1-based".into()));
        }
        for (name, ms) in [
            ("prefill_ms", profile.prefill_ms),
            ("prefill_ms_per_token", profile.prefill_ms_per_token),
            ("step_ms", profile.step_ms),
        ] {
            if ms.is_nan() || ms < 0.0 || Duration::try_from_secs_f64(ms / 1e3).is_err() {
                return Err(BenchError::Configuration(format!(
                    "synthetic {name} must be a non-negative duration, got {ms}"
                )));
            }
        }
        if config.kv_cache_precision == Precision::Bf16 {
            debug!("key/value cache inputs use bf16");
        }
        info!(
            device = %config.device,
            hint = %config.performance_hint,
            streams = config.num_streams,
            precision = %config.inference_precision,
            kv_cache_precision = %config.kv_cache_precision,
            denormals = config.denormals_optimization,
            cache_dir = ?config.cache_dir,
            "compiled synthetic runtime"
        );
        Ok(Self { manifest, config })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn profile(&self) -> &SyntheticProfile {
        &self.manifest.synthetic
    }

    fn step_cost(&self, step: usize, input_len: usize, beam_size: usize) -> Result<Duration> {
        let profile = self.profile();
        let ms = if step == 0 {
            profile.prefill_ms + profile.prefill_ms_per_token * input_len as f64
        } else {
            profile.step_ms * beam_size as f64
        };
        Duration::try_from_secs_f64(ms / 1e3).map_err(|err| {
            BenchError::Decode(format!("step {step} costs {ms}ms, which is not a valid duration: {err}"))
        })
    }

    fn next_token(&self, last: u32, params: &DecodeParams) -> u32 {
        let vocab = self.profile().vocab_size;
        let mut next = (last + 1) % vocab;
        while next == params.eos_token_id || next == params.pad_token_id {
            next = (next + 1) % vocab;
        }
        next
    }

    async fn generate(&self, input: &PreparedInput, params: &DecodeParams, beam_size: usize) -> Result<Decoded> {
        let mut rows = rows_of(&input.input_ids)?;
        let input_len = input.token_length();
        let mut finished = vec![false; rows.len()];
        let mut latency = LatencySample::default();

        for step in 0..params.max_new_tokens {
            if input_len + step + 1 > params.max_kv_len {
                return Err(BenchError::Decode(format!(
                    "key/value cache of {} positions exhausted at step {step}",
                    params.max_kv_len
                )));
            }
            let cost = self.step_cost(step, input_len, beam_size)?;
            let started = Instant::now();
            tokio::time::sleep(cost).await;

            let stop = self.profile().stop_after.is_some_and(|n| step + 1 >= n);
            for (row, done) in rows.iter_mut().zip(finished.iter_mut()) {
                let next = if *done {
                    params.pad_token_id
                } else if stop {
                    *done = true;
                    params.eos_token_id
                } else {
                    self.next_token(row.last().copied().unwrap_or(0), params)
                };
                row.push(next);
            }
            latency.push(started.elapsed());

            if finished.iter().all(|done| *done) {
                break;
            }
        }

        let output_ids = matrix_from_rows(&rows, input.input_ids.device())?;
        Ok(Decoded { output_ids, latency })
    }
}

impl CompiledModel for SyntheticRuntime {
    fn input_shape(&self, name: &str) -> Option<PartialShape> {
        self.manifest.input_shape(name)
    }

    fn input_names(&self) -> Vec<String> {
        self.manifest.input_names()
    }
}

#[async_trait]
impl GenerationRuntime for SyntheticRuntime {
    async fn generate_greedy(&self, input: &PreparedInput, params: &DecodeParams) -> Result<Decoded> {
        self.generate(input, params, 1).await
    }

    async fn generate_beam(
        &self,
        input: &PreparedInput,
        params: &DecodeParams,
        beam_size: usize,
    ) -> Result<Decoded> {
        self.generate(input, params, beam_size).await
    }
}
