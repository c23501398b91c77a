//! # Decode Engines
//!
//! A decode engine runs one complete generation call for a prepared batch and
//! reports, next to the output ids, how long every decoding step took.
//!
//! ## Key Components
//!
//! * [`DecodeEngine`] - the single interface the latency accountant wraps
//! * [`GreedyEngine`] - greedy decoding through a [`GenerationRuntime`](crate::runtime::GenerationRuntime)
//! * [`BeamEngine`] - beam search through the same runtime
//! * [`DecodeStrategy`] - configuration value selecting between the two
//!
//! Engines are picked once per session from the configured strategy; nothing
//! downstream branches on the decoding mode.

mod beam;
mod core_trait;
mod greedy;

use std::fmt::{self, Display};

pub use beam::BeamEngine;
pub use core_trait::*;
pub use greedy::GreedyEngine;

/// Decoding algorithm used for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Greedy,
    Beam { beam_size: usize },
}

impl Default for DecodeStrategy {
    fn default() -> Self {
        DecodeStrategy::Beam { beam_size: 4 }
    }
}

impl Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStrategy::Greedy => write!(f, "greedy"),
            DecodeStrategy::Beam { beam_size } => write!(f, "beam(size={beam_size})"),
        }
    }
}
