use std::fmt::{self, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::{DecodeParams, Decoded};
use crate::error::Result;
use crate::input::PreparedInput;

/// One dimension of a declared model input.
///
/// Compiled models may leave dimensions symbolic (for example the batch or
/// sequence axis); those resolve to [`Dim::Dynamic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum Dim {
    Static(usize),
    Dynamic,
}

impl Dim {
    /// The concrete length, or `None` when the dimension is symbolic
    pub fn get_length(&self) -> Option<usize> {
        match self {
            Dim::Static(n) => Some(*n),
            Dim::Dynamic => None,
        }
    }
}

impl From<Option<usize>> for Dim {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Dim::Dynamic, Dim::Static)
    }
}

impl From<Dim> for Option<usize> {
    fn from(value: Dim) -> Self {
        value.get_length()
    }
}

impl Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Static(n) => write!(f, "{n}"),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

/// Declared shape of a model input, possibly containing symbolic dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialShape(Vec<Dim>);

impl PartialShape {
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The dimension at `index`, `None` when the shape has lower rank
    pub fn dim(&self, index: usize) -> Option<Dim> {
        self.0.get(index).copied()
    }
}

impl From<Vec<Option<usize>>> for PartialShape {
    fn from(dims: Vec<Option<usize>>) -> Self {
        Self(dims.into_iter().map(Dim::from).collect())
    }
}

impl Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

/// # CompiledModel
///
/// Shape metadata of a compiled causal language model.
///
/// Dimensions the compiler left symbolic are reported as [`Dim::Dynamic`].
/// The harness reads the `kv_cache` and `cos_tab` inputs once, when a
/// [`LoadedModel`](super::LoadedModel) is created, to derive the
/// [`ModelTopology`](crate::topology::ModelTopology).
pub trait CompiledModel: Send + Sync {
    /// Declared shape of the named input, `None` when the model has no such input
    fn input_shape(&self, name: &str) -> Option<PartialShape>;

    /// Names of every declared input
    fn input_names(&self) -> Vec<String>;
}

/// # GenerationRuntime
///
/// A compiled model that can run whole generation calls.
///
/// Each entry point runs a complete decode for the batch and returns the full
/// output ids together with the duration of every decoding step it performed.
/// The harness awaits the call to completion; no partial results are consumed.
///
/// ## Implementation Notes
///
/// When implementing this trait:
/// - Time each decoding step individually, the first one including prefill
/// - Stop once every row emitted `params.eos_token_id` or
///   `params.max_new_tokens` steps ran, whichever comes first
/// - Fail with [`BenchError::Decode`](crate::BenchError::Decode) rather than
///   exceed `params.max_kv_len` cache positions
///
/// ## Usage Context
///
/// Runtimes are wrapped in a [`LoadedModel`](super::LoadedModel), which hands
/// out the [`GreedyEngine`](crate::engine::GreedyEngine) or
/// [`BeamEngine`](crate::engine::BeamEngine) calling the matching entry point.
#[async_trait]
pub trait GenerationRuntime: CompiledModel {
    /// Greedy decoding: the most likely token is appended at every step.
    ///
    /// # Parameters
    ///
    /// * `input` - `(batch, seq)` token ids and additive attention bias.
    /// * `params` - Generation limit, special token ids and cache capacity.
    ///
    /// # Returns
    ///
    /// The output ids, starting with the input ids, and the per-step latency sample.
    async fn generate_greedy(&self, input: &PreparedInput, params: &DecodeParams) -> Result<Decoded>;

    /// Beam-search decoding over `beam_size` hypotheses per sequence.
    ///
    /// # Parameters
    ///
    /// * `input` - `(batch, seq)` token ids and additive attention bias.
    /// * `params` - Generation limit, special token ids and cache capacity.
    /// * `beam_size` - Hypotheses kept per sequence, at least 1.
    ///
    /// # Returns
    ///
    /// The best hypothesis per sequence, starting with the input ids, and the
    /// per-step latency sample.
    async fn generate_beam(
        &self,
        input: &PreparedInput,
        params: &DecodeParams,
        beam_size: usize,
    ) -> Result<Decoded>;
}
