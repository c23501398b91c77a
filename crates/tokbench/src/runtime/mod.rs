//! # Inference Runtime
//!
//! The harness treats the compiled model as a collaborator: it reads declared
//! input shapes from it and asks it to run whole generation calls.
//!
//! * [`CompiledModel`] / [`GenerationRuntime`] - the collaborator interface
//! * [`LoadedModel`] - a runtime handle with its [`ModelTopology`](crate::topology::ModelTopology) attached
//! * [`ModelManifest`] - declared shapes and synthetic costs read from `model.json`
//! * [`SyntheticRuntime`] - deterministic stand-in runtime driven by a manifest

mod core_trait;
mod loaded;
mod manifest;
mod synthetic;

pub use core_trait::*;
pub use loaded::LoadedModel;
pub use manifest::{ModelManifest, SyntheticProfile, MANIFEST_FILE};
pub use synthetic::SyntheticRuntime;
