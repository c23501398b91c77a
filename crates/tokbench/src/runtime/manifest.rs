use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CompiledModel, PartialShape};
use crate::error::{BenchError, Result};

/// File name of the manifest inside a model directory
pub const MANIFEST_FILE: &str = "model.json";

/// Declared inputs of a compiled model plus the cost profile used by
/// [`SyntheticRuntime`](super::SyntheticRuntime).
///
/// ```json
/// {
///   "inputs": { "kv_cache": [4, null, 4, null, 16], "cos_tab": [null, 4] },
///   "synthetic": { "vocab_size": 32000, "prefill_ms": 40.0, "step_ms": 8.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub inputs: BTreeMap<String, PartialShape>,
    #[serde(default)]
    pub synthetic: SyntheticProfile,
}

/// Per-call cost model and output behaviour of the synthetic runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticProfile {
    pub vocab_size: u32,
    /// Fixed cost of the first step
    pub prefill_ms: f64,
    /// Additional first-step cost per input token
    pub prefill_ms_per_token: f64,
    /// Cost of every later step, multiplied by the beam width in beam mode
    pub step_ms: f64,
    /// Emit end-of-sequence on this step (1-based) instead of running to the limit
    pub stop_after: Option<usize>,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            vocab_size: 32000,
            prefill_ms: 0.0,
            prefill_ms_per_token: 0.0,
            step_ms: 0.0,
            stop_after: None,
        }
    }
}

impl ModelManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            BenchError::Configuration(format!("cannot read model manifest {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl CompiledModel for ModelManifest {
    fn input_shape(&self, name: &str) -> Option<PartialShape> {
        self.inputs.get(name).cloned()
    }

    fn input_names(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }
}
