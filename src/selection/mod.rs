pub mod decay;
pub mod jets;
pub mod pipeline;
pub mod vec4;

pub use decay::DecayPolicy;
pub use jets::JetDefinition;
pub use pipeline::{Observables, Outcome, PipelineState, RunCounts, Selection};
