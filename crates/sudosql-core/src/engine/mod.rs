pub mod orchestrator;
pub mod prompt;
pub mod runner;
pub mod vote;

pub use orchestrator::InferenceEngine;
pub use runner::BatchRunner;
