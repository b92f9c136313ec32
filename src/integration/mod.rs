//! Wiring between the engine, the voice preference and the pages

pub mod config;
pub mod orchestrator;
pub mod progress;

pub use config::ReaderConfig;
pub use orchestrator::{
    Dispatcher, Orchestrator, OrchestratorCommand, OrchestratorEvent, OrchestratorHandle,
};
pub use progress::{wait_until_spoken, SpeakProgress};
