//! Sightline daemon library - exposes modules for testing.

pub mod backends;
pub mod config;
pub mod orchestrator;
pub mod probes;
pub mod routes;
pub mod server;
