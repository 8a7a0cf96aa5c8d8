//! Port traits (interfaces)
//!
//! These traits define the boundaries between the core domain and external I/O.
//! Adapters implement these traits to connect to real hardware and codecs.

pub mod audio;
pub mod media;
pub mod radio;
pub mod serial;

pub use audio::*;
pub use media::*;
pub use radio::*;
pub use serial::*;
