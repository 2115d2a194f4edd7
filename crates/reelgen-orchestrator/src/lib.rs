//! Job orchestrator: the durable, resumable state machine that drives the
//! image -> video -> compile pipeline.
//!
//! Scheduling model: multi-writer across distinct jobs, single-writer per
//! job (enforced by the store's write lease). A wake-up that cannot take
//! the lease exits quietly. Phase transitions are monotonic, per-shot
//! failures are contained, and every external submission is deduplicated
//! through persisted request handles.

mod compile;
pub mod config;
pub mod error;
pub mod factory;
mod images;
pub mod orchestrator;
mod videos;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use factory::{AdapterFactory, HttpAdapterFactory};
pub use orchestrator::Orchestrator;
