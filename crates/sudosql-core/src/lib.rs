//! Text-to-SQL orchestration: a freshness-checked schema cache, an inference
//! engine combining one or many providers (single pass, critic correction,
//! majority vote), and a resumable batch runner with an append-only result log.

pub mod cache;
pub mod config;
pub mod critic;
pub mod datasets;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod schema;
pub mod storage;

pub use errors::{Error, Result};
