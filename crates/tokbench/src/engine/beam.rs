use std::sync::Arc;

use async_trait::async_trait;

use super::{DecodeEngine, DecodeParams, Decoded};
use crate::error::{BenchError, Result};
use crate::input::PreparedInput;
use crate::runtime::GenerationRuntime;

/// Beam-search decoding on a [`GenerationRuntime`].
pub struct BeamEngine<R> {
    runtime: Arc<R>,
    beam_size: usize,
}

impl<R> BeamEngine<R> {
    /// # Errors
    ///
    /// [`BenchError::Configuration`] for a zero beam size.
    pub fn new(runtime: Arc<R>, beam_size: usize) -> Result<Self> {
        if beam_size == 0 {
            return Err(BenchError::Configuration("beam size must be at least 1".into()));
        }
        Ok(Self { runtime, beam_size })
    }
}

#[async_trait]
impl<R> DecodeEngine for BeamEngine<R>
where
    R: GenerationRuntime + 'static,
{
    fn name(&self) -> String {
        format!("beam(size={})", self.beam_size)
    }

    async fn decode(&self, input: &PreparedInput, params: &DecodeParams) -> Result<Decoded> {
        self.runtime.generate_beam(input, params, self.beam_size).await
    }
}
