//! Local HTTP interface

pub mod handlers;
pub mod serve;
pub mod state;
