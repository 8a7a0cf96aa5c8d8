//! Command handlers driving the adapters, called from the CLI.

pub mod config;
pub mod devices;
pub mod record;
