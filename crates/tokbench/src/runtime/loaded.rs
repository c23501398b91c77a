use std::sync::Arc;

use tracing::{debug, info};

use super::GenerationRuntime;
use crate::engine::{BeamEngine, DecodeEngine, DecodeStrategy, GreedyEngine};
use crate::error::Result;
use crate::topology::ModelTopology;

/// A compiled runtime with its topology resolved.
///
/// The topology is extracted once, when the handle is created, and stays
/// fixed for the lifetime of the handle.
pub struct LoadedModel<R> {
    runtime: Arc<R>,
    topology: ModelTopology,
}

impl<R> LoadedModel<R>
where
    R: GenerationRuntime + 'static,
{
    /// # Errors
    ///
    /// [`BenchError::Shape`](crate::BenchError::Shape) when the topology
    /// cannot be derived from the runtime's declared inputs.
    pub fn new(runtime: R) -> Result<Self> {
        debug!(inputs = ?runtime.input_names(), "declared model inputs");
        let topology = ModelTopology::from_model(&runtime)?;
        info!(%topology, "model topology");
        Ok(Self { runtime: Arc::new(runtime), topology })
    }

    pub fn topology(&self) -> ModelTopology {
        self.topology
    }

    /// The decode engine implementing `strategy` on this runtime.
    pub fn engine(&self, strategy: DecodeStrategy) -> Result<Box<dyn DecodeEngine>> {
        Ok(match strategy {
            DecodeStrategy::Greedy => Box::new(GreedyEngine::new(self.runtime.clone())),
            DecodeStrategy::Beam { beam_size } => Box::new(BeamEngine::new(self.runtime.clone(), beam_size)?),
        })
    }
}
