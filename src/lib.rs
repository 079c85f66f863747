//! Cluster verification library - shared modules for all binaries.

pub mod config;
pub mod io;
pub mod models;
pub mod orchestrator;
pub mod passes;
pub mod progress;
pub mod safety;
pub mod standardize;
