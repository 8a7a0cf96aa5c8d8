//! CAT (Computer Aided Transceiver) protocol engine.
//!
//! This module separates the concerns of CAT communication:
//! - `listener`: reassemble raw serial chunks into delimited frames (pure, no I/O)
//! - `reader`: background thread pumping serial reads into the listener
//! - `engine`: request/response state machine over the frame queue
//!
//! Dialects live in `crate::radio`; they describe their commands and queries
//! with the `CatCommand` / `CatQuery` traits below.

pub mod engine;
pub mod listener;
pub mod reader;

pub use engine::CatEngine;
pub use listener::{frame_channel, FrameListener, FrameQueue, QUEUE_CAP};
pub use reader::SerialReader;

use std::fmt::Debug;

use crate::domain::{RigError, RigResult};

/// One protocol unit on the wire.
pub trait CatFrame: Debug + Send + Sized + 'static {
    /// Build a frame from a completed, delimiter-terminated byte buffer.
    fn from_wire(bytes: Vec<u8>) -> RigResult<Self>;

    fn to_wire(&self) -> Vec<u8>;
}

/// ASCII dialects: `;`-terminated strings.
impl CatFrame for String {
    fn from_wire(bytes: Vec<u8>) -> RigResult<Self> {
        String::from_utf8(bytes).map_err(|e| RigError::Parse(format!("Invalid UTF-8 response: {e}")))
    }

    fn to_wire(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Binary dialects: fixed-layout byte sequences.
impl CatFrame for Vec<u8> {
    fn from_wire(bytes: Vec<u8>) -> RigResult<Self> {
        Ok(bytes)
    }

    fn to_wire(&self) -> Vec<u8> {
        self.clone()
    }
}

/// A fire-and-forget command.
pub trait CatCommand<F> {
    fn command_data(&self) -> F;
}

/// A command that expects exactly one response frame.
pub trait CatQuery<F> {
    type Response;

    fn query_data(&self) -> F;

    /// `None` when the frame does not match the expected grammar.
    fn parse_response(&self, frame: &F) -> Option<Self::Response>;
}
