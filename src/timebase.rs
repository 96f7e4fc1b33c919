//! Uniform time axis shared by every waveform of the AM pipeline.

use crate::{ensure_finite, SimError};

/// Relative tolerance used to decide that `duration / step` is an integer.
const RATIO_TOLERANCE: f64 = 1e-9;

/// Uniformly sampled, half-open time axis `[0, duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBase {
    step: f64,
    samples: Vec<f64>,
}

impl TimeBase {
    /// Sample step in seconds
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Sample rate in hertz
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.step
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

/// Largest time axis [`build_time_base`] will materialize.
pub const MAX_SAMPLES: usize = 50_000_000;

/// Build the time axis `t_i = i * step` for every `t_i < duration`.
///
/// A `duration / step` ratio within floating-point tolerance of an integer is
/// taken as exact, so `(0.1, 0.00005)` yields 2000 samples rather than 2001.
pub fn build_time_base(duration: f64, step: f64) -> Result<TimeBase, SimError> {
    let count = sample_count(duration, step)?;
    let samples = (0..count).map(|i| i as f64 * step).collect();
    Ok(TimeBase { step, samples })
}

/// Number of samples [`build_time_base`] emits for `(duration, step)`.
pub fn sample_count(duration: f64, step: f64) -> Result<usize, SimError> {
    ensure_finite("duration", duration)?;
    ensure_finite("step", step)?;

    if duration <= 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "duration must be > 0, got {duration}"
        )));
    }
    if step <= 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "step must be > 0, got {step}"
        )));
    }
    if step >= duration {
        return Err(SimError::InvalidParameter(format!(
            "step ({step}) must be smaller than duration ({duration})"
        )));
    }

    let ratio = duration / step;
    if ratio > MAX_SAMPLES as f64 {
        return Err(SimError::InvalidParameter(format!(
            "duration / step ({ratio}) exceeds {MAX_SAMPLES} samples"
        )));
    }

    let nearest = ratio.round();
    let mut count = if (ratio - nearest).abs() <= RATIO_TOLERANCE * nearest {
        nearest as usize
    } else {
        ratio.ceil() as usize
    };

    // Never emit a sample at or past the end of the window.
    while count > 1 && (count - 1) as f64 * step >= duration {
        count -= 1;
    }

    Ok(count)
}
