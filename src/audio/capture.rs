//! Microphone capture through cpal

use crate::{CoachError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use tracing::{debug, error, info};

pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioInput {
    /// Open the default input device
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| CoachError::CapabilityUnavailable("no microphone found".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| {
                CoachError::CapabilityUnavailable(format!("microphone not usable: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    /// Whether the host has any input device
    pub fn is_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start streaming mono samples at the device rate into `audio_tx`
    pub fn start_recording(&mut self, audio_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if let Err(e) = audio_tx.try_send(samples) {
                        debug!("Dropping captured audio: {}", e);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| CoachError::RecognitionError(format!("audio-capture: {}", e)))?;

        stream
            .play()
            .map_err(|e| CoachError::RecognitionError(format!("audio-capture: {}", e)))?;

        self.stream = Some(stream);
        debug!("Started audio recording");
        Ok(())
    }

    pub fn stop_recording(&mut self) {
        if self.stream.take().is_some() {
            debug!("Stopped audio recording");
        }
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop_recording();
    }
}
