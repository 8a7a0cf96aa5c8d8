//! Core domain types
//!
//! Pure types with no I/O dependencies: radio operating state, location,
//! per-frame status samples, configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod location;
pub mod status;
pub mod types;

pub use config::*;
pub use error::*;
pub use location::*;
pub use status::*;
pub use types::*;
