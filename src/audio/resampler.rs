//! Sample rate conversion with rubato
//!
//! [`StreamResampler`] converts mono audio as it arrives: input is buffered
//! until a full resampler chunk is available, and [`StreamResampler::finish`]
//! flushes the remainder zero-padded.

use crate::{CoachError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames per resampler call
const CHUNK_SIZE: usize = 1024;

pub struct StreamResampler {
    /// `None` when input and output rates match
    resampler: Option<SincFixedIn<f32>>,
    input_rate: u32,
    output_rate: u32,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(CoachError::ConfigError(
                "sample rates must be greater than 0".into(),
            ));
        }

        let resampler = if input_rate == output_rate {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            };
            let ratio = output_rate as f64 / input_rate as f64;
            let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
                .map_err(|e| CoachError::ConfigError(format!("failed to create resampler: {}", e)))?;
            debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);
            Some(resampler)
        };

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: Vec::new(),
        })
    }

    /// Feed samples; returns whatever output complete chunks produced
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(samples.to_vec());
        };

        self.pending.extend_from_slice(samples);
        let chunk = resampler.input_frames_next();
        let mut output = Vec::new();
        while self.pending.len() >= chunk {
            let input: Vec<f32> = self.pending.drain(..chunk).collect();
            let planar = resampler
                .process(&[input], None)
                .map_err(|e| CoachError::RecognitionError(format!("resampling failed: {}", e)))?;
            output.extend_from_slice(&planar[0]);
        }
        Ok(output)
    }

    /// Flush buffered input
    pub fn finish(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let remaining = self.pending.len();
        let chunk = resampler.input_frames_next();
        let mut input = std::mem::take(&mut self.pending);
        input.resize(chunk, 0.0);

        let planar = resampler
            .process(&[input], None)
            .map_err(|e| CoachError::RecognitionError(format!("resampling failed: {}", e)))?;

        // Only the share of output backed by real input
        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let keep = ((remaining as f64) * ratio).ceil() as usize;
        Ok(planar[0].iter().take(keep).copied().collect())
    }
}

/// Resample a whole mono clip
pub fn resample(samples: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    let mut resampler = StreamResampler::new(input_rate, output_rate)?;
    let mut output = resampler.push(samples)?;
    output.extend(resampler.finish()?);
    Ok(output)
}
