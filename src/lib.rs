//! Railbook command line
//!
//! Exposes the CLI layer and its scripted surface for integration testing.

pub mod cli;
pub mod config;

pub use config::AppConfig;
