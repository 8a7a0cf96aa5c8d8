//! Audio port traits

use crate::domain::{AudioDeviceInfo, AudioSample, RigResult};

/// Trait for audio input (capture from the radio's audio output)
///
/// Note: No `Send` bound, cpal::Stream is !Send, so implementations
/// must live on the thread that created them (the audio track thread).
/// Hand the thread an `AudioInputFactory` instead of an instance.
pub trait AudioInput {
    /// List available input devices
    fn list_devices(&self) -> RigResult<Vec<AudioDeviceInfo>>;

    /// Start capturing mono audio at `sample_rate`, calling the callback with samples.
    /// `None` selects the system default input.
    fn start(
        &mut self,
        device_id: Option<&str>,
        sample_rate: u32,
        callback: Box<dyn FnMut(&[AudioSample]) + Send + 'static>,
    ) -> RigResult<()>;

    /// Stop capturing
    fn stop(&mut self) -> RigResult<()>;

    /// Check if currently capturing
    fn is_running(&self) -> bool;
}

/// Builds the audio input on the thread that will own it.
pub type AudioInputFactory = Box<dyn FnOnce() -> Box<dyn AudioInput> + Send>;
