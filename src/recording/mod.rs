//! Multi-track recording pipeline
//!
//! Two track threads (video overlay + metadata, audio) drain their encoders
//! into one shared muxer. The muxer starts only after both formats are known;
//! a cooperative stop flag winds both threads down together.

pub mod audio;
pub mod encoder;
pub mod pts;
pub mod service;
pub mod sync;
pub mod track;
pub mod video;

pub use encoder::{RecordingEncoder, RecordingMedia, RecordingReport, RecordingSettings};
pub use pts::{audio_pts_us, PtsQueue};
pub use service::{recording_filename, RecordingService, ServiceState};
pub use sync::{ErrorSlot, MuxSyncGate, RegistrationWait};
