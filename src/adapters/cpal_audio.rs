//! CPAL audio adapter, implements AudioInput using the cpal crate
//!
//! Captures the radio's receive audio (USB codec or line in) as mono f32.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{AudioDeviceInfo, AudioSample, RigError, RigResult};
use crate::ports::{AudioInput, AudioInputFactory};

/// Audio input adapter backed by cpal.
///
/// `cpal::Stream` is `!Send`: it can only live on the thread that created it,
/// so the audio track builds this through [`CpalAudioInput::factory`].
pub struct CpalAudioInput {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalAudioInput {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn factory() -> AudioInputFactory {
        Box::new(|| Box::new(CpalAudioInput::new()))
    }

    fn find_device(host: &cpal::Host, device_id: Option<&str>) -> RigResult<cpal::Device> {
        match device_id {
            None => host
                .default_input_device()
                .ok_or_else(|| RigError::Audio("No default audio input device".into())),
            Some(id) => host
                .input_devices()
                .map_err(|e| RigError::Audio(format!("Failed to enumerate devices: {e}")))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| RigError::Audio(format!("Audio device not found: {id}"))),
        }
    }
}

impl Default for CpalAudioInput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInput for CpalAudioInput {
    fn list_devices(&self) -> RigResult<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();

        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| RigError::Audio(format!("Failed to enumerate devices: {e}")))?
            .map(|device| {
                let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                let is_default = default_name.as_deref() == Some(name.as_str());
                AudioDeviceInfo {
                    id: name.clone(),
                    name,
                    is_default,
                }
            })
            .collect();

        Ok(devices)
    }

    fn start(
        &mut self,
        device_id: Option<&str>,
        sample_rate: u32,
        mut callback: Box<dyn FnMut(&[AudioSample]) + Send + 'static>,
    ) -> RigResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RigError::Audio("Audio stream already running".into()));
        }

        let host = cpal::default_host();
        let device = Self::find_device(&host, device_id)?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_running = self.running.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    log::error!("Audio stream error: {err}");
                    err_running.store(false, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| RigError::Audio(format!("Failed to build stream: {e}")))?;

        stream
            .play()
            .map_err(|e| RigError::Audio(format!("Failed to start stream: {e}")))?;

        self.running.store(true, Ordering::SeqCst);
        self.stream = Some(stream);
        log::info!(
            "Audio capture started on {} at {sample_rate} Hz",
            device_id.unwrap_or("default input")
        );

        Ok(())
    }

    fn stop(&mut self) -> RigResult<()> {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the stream stops capture
        self.stream = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
