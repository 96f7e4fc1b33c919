//! Signal synthesis for the bridge-sensing scenario
//!
//! Every generator maps a time axis to a waveform of the same length. The
//! only stochastic generator, [`white_noise`], draws from a caller-supplied
//! random source so results stay reproducible under a fixed seed.

use std::f64::consts::TAU;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::{ensure_finite, SimError, Waveform};

/// Mains interference frequency [Hz]
pub const LINE_FREQUENCY_HZ: f64 = 50.0;

/// Carrier and measured-signal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationParams {
    /// Carrier (excitation) frequency [Hz]
    pub carrier_hz: f64,
    /// Frequency of the measured physical quantity [Hz]
    pub signal_hz: f64,
    /// Modulation depth, e.g. strain amplitude
    pub depth: f64,
}

impl ModulationParams {
    pub fn validate(&self) -> Result<(), SimError> {
        check_positive_frequency("carrier_hz", self.carrier_hz)?;
        check_positive_frequency("signal_hz", self.signal_hz)?;
        ensure_finite("depth", self.depth)?;
        if !(self.depth > 0.0 && self.depth <= 1.0) {
            return Err(SimError::InvalidParameter(format!(
                "depth must be in (0, 1], got {}",
                self.depth
            )));
        }
        Ok(())
    }
}

/// Noise injected at the bridge output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseSpec {
    pub white_mean: f64,
    pub white_std_dev: f64,
    /// Amplitude of the 50 Hz interference
    pub line_amplitude: f64,
    /// Thermo-electric drift offset at the first sample
    pub drift_start: f64,
    /// Thermo-electric drift offset at the last sample
    pub drift_end: f64,
}

impl NoiseSpec {
    pub fn validate(&self) -> Result<(), SimError> {
        ensure_finite("white_mean", self.white_mean)?;
        check_non_negative("white_std_dev", self.white_std_dev)?;
        check_non_negative("line_amplitude", self.line_amplitude)?;
        ensure_finite("drift_start", self.drift_start)?;
        ensure_finite("drift_end", self.drift_end)?;
        Ok(())
    }

    pub fn has_drift(&self) -> bool {
        self.drift_start != 0.0 || self.drift_end != 0.0
    }
}

/// `sin(2π·F·t)`
pub fn carrier(t: &[f64], carrier_hz: f64) -> Result<Waveform, SimError> {
    check_positive_frequency("carrier_hz", carrier_hz)?;
    Ok(sine(t, carrier_hz, 1.0))
}

/// `depth·sin(2π·fg·t)`, the quantity being measured.
pub fn physical_signal(t: &[f64], signal_hz: f64, depth: f64) -> Result<Waveform, SimError> {
    check_positive_frequency("signal_hz", signal_hz)?;
    ensure_finite("depth", depth)?;
    Ok(sine(t, signal_hz, depth))
}

/// Independent Gaussian draw per sample.
pub fn white_noise<R: Rng + ?Sized>(
    t: &[f64],
    mean: f64,
    std_dev: f64,
    rng: &mut R,
) -> Result<Waveform, SimError> {
    ensure_finite("white_mean", mean)?;
    check_non_negative("white_std_dev", std_dev)?;

    let dist = Normal::new(mean, std_dev)
        .map_err(|err| SimError::InvalidParameter(format!("white noise: {err}")))?;
    Ok(t.iter().map(|_| dist.sample(&mut *rng)).collect())
}

/// `amplitude·sin(2π·50·t)`, mains coupling into the bridge.
pub fn line_noise(t: &[f64], amplitude: f64) -> Result<Waveform, SimError> {
    check_non_negative("line_amplitude", amplitude)?;
    Ok(sine(t, LINE_FREQUENCY_HZ, amplitude))
}

/// Linear ramp from `start` at the first sample to `end` at the last one.
pub fn drift_noise(t: &[f64], start: f64, end: f64) -> Result<Waveform, SimError> {
    ensure_finite("drift_start", start)?;
    ensure_finite("drift_end", end)?;

    let n = t.len();
    if n == 1 {
        return Ok(vec![start]);
    }

    let denom = n.saturating_sub(1) as f64;
    Ok((0..n)
        .map(|i| start + (end - start) * i as f64 / denom)
        .collect())
}

fn sine(t: &[f64], freq_hz: f64, amplitude: f64) -> Waveform {
    t.iter()
        .map(|&ti| amplitude * (TAU * freq_hz * ti).sin())
        .collect()
}

fn check_positive_frequency(name: &str, value: f64) -> Result<(), SimError> {
    ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "{name} must be > 0, got {value}"
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<(), SimError> {
    ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "{name} must be >= 0, got {value}"
        )));
    }
    Ok(())
}
