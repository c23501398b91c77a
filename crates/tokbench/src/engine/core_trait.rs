use async_trait::async_trait;
use candle_core::Tensor;

use crate::error::{BenchError, Result};
use crate::input::PreparedInput;
use crate::latency::LatencySample;

/// Generation limits and special tokens handed to a decode engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParams {
    pub max_new_tokens: usize,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    /// Key/value cache capacity hint, `input_token_len + 2 * max_new_tokens`
    pub max_kv_len: usize,
}

impl DecodeParams {
    /// # Errors
    ///
    /// [`BenchError::Configuration`] when the cache capacity does not fit in a `usize`.
    pub fn new(
        input_token_len: usize,
        max_new_tokens: usize,
        eos_token_id: u32,
        pad_token_id: u32,
    ) -> Result<Self> {
        let max_kv_len = max_new_tokens
            .checked_mul(2)
            .and_then(|generated| generated.checked_add(input_token_len))
            .ok_or_else(|| {
                BenchError::Configuration(format!(
                    "{max_new_tokens} new tokens after {input_token_len} input tokens overflow the key/value cache length"
                ))
            })?;
        Ok(Self { max_new_tokens, eos_token_id, pad_token_id, max_kv_len })
    }
}

/// Result of one decode call.
///
/// `output_ids` is `(batch, seq)` `u32` and starts with the input ids.
/// `latency` holds one entry per decoding step actually performed, which may
/// be fewer than `max_new_tokens` when every sequence stopped early.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub output_ids: Tensor,
    pub latency: LatencySample,
}

/// # DecodeEngine
///
/// One decoding algorithm behind a uniform call.
/// ```rust
/// use async_trait::async_trait;
/// use tokbench::{DecodeEngine, DecodeParams, Decoded, LatencySample, PreparedInput, Result};
///
/// pub struct Echo;
///
/// #[async_trait]
/// impl DecodeEngine for Echo {
///     fn name(&self) -> String {
///         "echo".to_string()
///     }
///
///     async fn decode(&self, input: &PreparedInput, _params: &DecodeParams) -> Result<Decoded> {
///         // generates nothing: the output is the input and no step ran
///         Ok(Decoded { output_ids: input.input_ids.clone(), latency: LatencySample::default() })
///     }
/// }
/// ```
///
/// ## Input/Output Dimensions
///
/// Both the input ids and the returned output ids are `(batch, seq)`. The
/// output keeps the input as its prefix, so its sequence dimension is the
/// input length plus the number of generated positions.
///
/// ## Implementation Notes
///
/// When implementing this trait:
/// - Report one latency entry per decoding step actually performed; stopping
///   early on end-of-sequence yields a shorter sample, never padding entries
/// - Rows that finish before the rest of the batch are filled with
///   `params.pad_token_id`
/// - Never grow the key/value cache past `params.max_kv_len`
/// - Report failures as [`BenchError::Decode`](crate::BenchError::Decode);
///   they end the session
///
/// ## Usage Context
///
/// The [`LatencyAccountant`](crate::LatencyAccountant) wraps exactly one
/// `decode` call per round and awaits it to completion: there is no
/// streaming, cancellation or timeout.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> String;

    /// Runs a complete generation for `input`.
    ///
    /// # Parameters
    ///
    /// * `input` - Left-padded token ids and the matching additive attention bias.
    /// * `params` - Generation limit, special token ids and cache capacity.
    ///
    /// # Returns
    ///
    /// The full `(batch, input_len + generated)` output ids together with the
    /// duration of every decoding step.
    async fn decode(&self, input: &PreparedInput, params: &DecodeParams) -> Result<Decoded>;
}
