use std::sync::Arc;

use async_trait::async_trait;

use super::{DecodeEngine, DecodeParams, Decoded};
use crate::error::Result;
use crate::input::PreparedInput;
use crate::runtime::GenerationRuntime;

/// Greedy decoding on a [`GenerationRuntime`].
pub struct GreedyEngine<R> {
    runtime: Arc<R>,
}

impl<R> GreedyEngine<R> {
    pub fn new(runtime: Arc<R>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<R> DecodeEngine for GreedyEngine<R>
where
    R: GenerationRuntime + 'static,
{
    fn name(&self) -> String {
        "greedy".to_string()
    }

    async fn decode(&self, input: &PreparedInput, params: &DecodeParams) -> Result<Decoded> {
        self.runtime.generate_greedy(input, params).await
    }
}
