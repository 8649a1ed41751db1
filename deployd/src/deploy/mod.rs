//! Deployment job engine

pub mod classifier;
pub mod log_sink;
pub mod orchestrator;
pub mod script_runner;
pub mod service;
