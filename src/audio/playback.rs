//! Speaker output through cpal

use crate::{CoachError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Grace period for the device to play its last buffer
const DRAIN_DELAY: Duration = Duration::from_millis(120);

pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
}

impl AudioOutput {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| CoachError::CapabilityUnavailable("no audio output device".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| {
                CoachError::CapabilityUnavailable(format!("audio output not usable: {}", e))
            })?
            .into();

        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Play mono samples recorded at the device rate; returns once they
    /// have been handed to the device
    pub fn play_blocking(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let duration = Duration::from_secs_f64(samples.len() as f64 / self.sample_rate() as f64);
        let buffer = Arc::new(Mutex::new((samples, 0usize)));
        let (done_tx, done_rx) = bounded::<()>(1);

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut guard = buffer.lock();
                    let (samples, position) = &mut *guard;
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(*position).copied().unwrap_or(0.0);
                        *position = (*position + 1).min(samples.len());
                        frame.fill(sample);
                    }
                    if *position == samples.len() {
                        let _ = done_tx.try_send(());
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| CoachError::SynthesisError(format!("audio-busy: {}", e)))?;

        stream
            .play()
            .map_err(|e| CoachError::SynthesisError(format!("audio-busy: {}", e)))?;

        debug!("Playing {:.2}s of audio", duration.as_secs_f32());
        let finished = done_rx.recv_timeout(duration + Duration::from_secs(2));
        thread::sleep(DRAIN_DELAY);
        drop(stream);

        finished.map_err(|_| CoachError::SynthesisError("audio playback stalled".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_output_creation() {
        // This test might fail in CI environments without audio devices
        if let Ok(output) = AudioOutput::new() {
            assert!(output.sample_rate() > 0);
            assert!(output.channels() > 0);
        }
    }

    #[test]
    fn test_empty_playback_returns_immediately() {
        if let Ok(output) = AudioOutput::new() {
            assert!(output.play_blocking(Vec::new()).is_ok());
        }
    }
}
