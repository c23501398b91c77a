//! Batched model inputs built from prompt text.

use candle_core::{Device, Tensor};
use tracing::debug;

use crate::error::Result;
use crate::tensor::operations::{additive_bias, batch_dims, matrix_from_rows, tile_first_position};
use crate::tokenizer::Tokenizer;

/// One generation call: a batch of prompts and an optional forced length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub texts: Vec<String>,
    /// When set, the true prompt length is ignored and every sequence becomes
    /// its first token repeated this many times.
    pub forced_token_length: Option<usize>,
}

impl GenerationRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts, forced_token_length: None }
    }

    pub fn forced(texts: Vec<String>, length: usize) -> Self {
        Self { texts, forced_token_length: Some(length) }
    }
}

/// Token ids and additive attention bias for one batch.
///
/// Both tensors are `(batch, seq)`; `input_ids` is `u32`, `attention_bias` is
/// `f32` holding `0.0` for valid positions and
/// [`MASK_SENTINEL`](crate::tensor::constant::MASK_SENTINEL) for padding.
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub input_ids: Tensor,
    pub attention_bias: Tensor,
}

impl PreparedInput {
    pub fn batch_size(&self) -> usize {
        self.input_ids.dims()[0]
    }

    pub fn token_length(&self) -> usize {
        self.input_ids.dims()[1]
    }
}

/// Builds [`PreparedInput`]s on a fixed device.
#[derive(Debug, Clone)]
pub struct InputBuilder {
    device: Device,
}

impl Default for InputBuilder {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}

impl InputBuilder {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Tokenizes `texts` into a left-padded batch.
    ///
    /// With `forced_length` set, only the first position of each tokenized row
    /// is kept and tiled `forced_length` times, for both ids and bias.
    ///
    /// # Errors
    ///
    /// Tokenizer failures propagate unchanged as
    /// [`BenchError::Tokenization`](crate::BenchError::Tokenization).
    pub fn prepare(
        &self,
        texts: &[String],
        forced_length: Option<usize>,
        tokenizer: &dyn Tokenizer,
    ) -> Result<PreparedInput> {
        let encoded = tokenizer.encode_batch(texts)?;
        let input_ids = matrix_from_rows(&encoded.ids, &self.device)?;
        let mask = matrix_from_rows(&encoded.attention_mask, &self.device)?;
        let attention_bias = additive_bias(&mask)?;

        let prepared = match forced_length {
            None => PreparedInput { input_ids, attention_bias },
            Some(length) => PreparedInput {
                input_ids: tile_first_position(&input_ids, length)?,
                attention_bias: tile_first_position(&attention_bias, length)?,
            },
        };

        let (batch, seq) = batch_dims(&prepared.input_ids)?;
        debug!(batch, seq, forced = forced_length.is_some(), "prepared input");
        Ok(prepared)
    }
}
