//! Transformation scheduling engine, transformer registry, and built-in
//! transformers.
//!
//! An [`Engine`] is built once per run from a source location, an output
//! location and a [`TransformerRegistry`]. [`Engine::run`] captures the
//! classes and methods of a [`SyntaxTree`](metamorph_tree::SyntaxTree), makes
//! the number of attempts the [`TransformationScope`] asks for, picks a
//! transformer per attempt (uniformly or by [`Distribution`]) and records a
//! [`TransformationResult`](metamorph_types::TransformationResult) for each.
//! Structural failures of single attempts are counted and never abort the run.

pub mod config;
pub mod distribution;
pub mod engine;
pub mod exclusivity;
pub mod manifest;
pub mod names;
pub mod output;
pub mod registry;
pub mod retry;
pub mod scope;
pub mod transformer;
pub mod transformers;
pub mod utils;

pub use config::RunConfig;
pub use distribution::{Distribution, SelectionPool};
pub use engine::{Engine, EngineOutcome, EnginePhase, DEFAULT_TRANSFORMATIONS};
pub use exclusivity::{ExclusivityLedger, ExclusivityPolicy};
pub use manifest::{load_manifest, JsonManifestWriter, Manifest, ManifestSink};
pub use names::NameStyle;
pub use output::{Printer, SourcePrinter};
pub use registry::{
    default_registry, default_registry_with_names, TransformerId, TransformerRegistry,
    DEFAULT_REGISTRY_NAME,
};
pub use retry::RetryPolicy;
pub use scope::TransformationScope;
pub use transformer::{Requirement, Transformer, TransformerCore, DEFAULT_SEED};
