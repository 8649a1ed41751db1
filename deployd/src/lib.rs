//! Deployment job runner
//!
//! Runs an ordered list of deployment scripts as one job per
//! `(project, service)` target, with output classification and cooperative
//! cancellation between steps.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod repository;
pub mod server;
pub mod storage;
pub mod utils;
