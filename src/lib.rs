//! Amateur radio session recorder
//!
//! Samples a transceiver's operating state over CAT, renders it as a video
//! overlay, captures the receive audio and muxes both, plus a JSON status
//! track, into one MP4.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for external dependencies
//! - `cat/` - CAT frame reassembly and the request/response engine
//! - `radio/` - Per-model CAT dialects and the radio session
//! - `location/` - GNSS location state
//! - `render/` - Status overlay rendering
//! - `recording/` - Track threads, muxer gate and the recording controller
//! - `adapters/` - Implementations of ports (serialport, cpal, encoders, ffmpeg)
//! - `commands/` - Command handlers (driving adapters)
//! - `state` - Application state

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;

pub mod cat;
pub mod location;
pub mod radio;
pub mod recording;
pub mod render;

// Adapters (external I/O)
pub mod adapters;

pub mod cli;
pub mod commands;
pub mod state;

use std::process::ExitCode;

use clap::Parser;

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("rigcorder_lib=info"))
        .init();
    cli::run(cli::Cli::parse())
}
