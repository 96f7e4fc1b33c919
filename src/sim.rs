//! End-to-end drivers
//!
//! Wires the time base, synthesizers, modulator and demodulator into the
//! AM pipeline, and exposes the dual-slope converter behind the same config.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::demod::{moving_average, phase_sensitive_detect};
use crate::dual_slope::{simulate_dual_slope, DualSlopeResult};
use crate::modulator::{modulate, total_noise};
use crate::signals::{carrier, drift_noise, line_noise, physical_signal, white_noise};
use crate::timebase::build_time_base;
use crate::{ensure_aligned, SimError, Waveform};

/// Every intermediate signal of the AM pipeline on one time axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmTraces {
    pub time: Vec<f64>,
    pub carrier: Waveform,
    pub physical: Waveform,
    pub noise: Waveform,
    pub modulated: Waveform,
    pub demod_raw: Waveform,
    pub filtered: Waveform,
}

impl AmTraces {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// How closely the filtered output follows the physical signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmSummary {
    pub physical_peak: f64,
    pub recovered_peak: f64,
    /// `recovered_peak / physical_peak`
    pub gain: f64,
    /// Pearson correlation between recovered and physical signal
    pub correlation: f64,
}

/// Synthesize, modulate and demodulate one observation window.
pub fn run_am_pipeline<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<AmTraces, SimError> {
    let modulation = config.modulation();
    let noise_spec = config.noise();
    modulation.validate()?;
    noise_spec.validate()?;

    let tb = build_time_base(config.duration, config.step)?;
    let t = tb.samples();

    let carrier_wave = carrier(t, modulation.carrier_hz)?;
    let physical = physical_signal(t, modulation.signal_hz, modulation.depth)?;
    let white = white_noise(t, noise_spec.white_mean, noise_spec.white_std_dev, rng)?;
    let line = line_noise(t, noise_spec.line_amplitude)?;

    let mut noise = total_noise(&white, &line)?;
    if noise_spec.has_drift() {
        let drift = drift_noise(t, noise_spec.drift_start, noise_spec.drift_end)?;
        noise = total_noise(&noise, &drift)?;
    }

    let modulated = modulate(&physical, &carrier_wave, &noise)?;
    let demod_raw = phase_sensitive_detect(&modulated, &carrier_wave)?;
    let filtered = moving_average(&demod_raw, config.filter_window)?;

    Ok(AmTraces {
        time: tb.into_samples(),
        carrier: carrier_wave,
        physical,
        noise,
        modulated,
        demod_raw,
        filtered,
    })
}

pub fn run_dual_slope(config: &SimulationConfig) -> Result<DualSlopeResult, SimError> {
    simulate_dual_slope(&config.dual_slope())
}

pub fn summarize_am(traces: &AmTraces) -> Result<AmSummary, SimError> {
    ensure_aligned("filtered", &traces.physical, &traces.filtered)?;

    let physical_peak = peak_abs(&traces.physical);
    let recovered_peak = peak_abs(&traces.filtered);
    let gain = if physical_peak > 0.0 {
        recovered_peak / physical_peak
    } else {
        0.0
    };

    Ok(AmSummary {
        physical_peak,
        recovered_peak,
        gain,
        correlation: correlation(&traces.physical, &traces.filtered),
    })
}

fn peak_abs(x: &[f64]) -> f64 {
    x.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()))
}

/// Pearson correlation; zero when either input is constant.
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    cov / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            depth: 1.0,
            white_std_dev: 0.0,
            line_amplitude: 0.0,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn pipeline_produces_aligned_traces() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let traces = run_am_pipeline(&SimulationConfig::default(), &mut rng).unwrap();

        assert_eq!(traces.len(), 2000);
        for wave in [
            &traces.carrier,
            &traces.physical,
            &traces.noise,
            &traces.modulated,
            &traces.demod_raw,
            &traces.filtered,
        ] {
            assert_eq!(wave.len(), traces.len());
        }
    }

    #[test]
    fn pipeline_is_reproducible_for_a_seed() {
        let config = SimulationConfig::default();
        let a = run_am_pipeline(&config, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let b = run_am_pipeline(&config, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        assert_eq!(a.filtered, b.filtered);
        assert_eq!(a.noise, b.noise);
    }

    #[test]
    fn noiseless_recovery_tracks_physical_signal() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let traces = run_am_pipeline(&quiet_config(), &mut rng).unwrap();
        let summary = summarize_am(&traces).unwrap();

        assert!(traces.noise.iter().all(|&n| n == 0.0));
        assert!(summary.correlation > 0.99, "{summary:?}");
        // full-wave rectified carrier averages to roughly 2/π
        assert!(summary.gain > 0.55 && summary.gain < 0.7, "{summary:?}");
    }

    #[test]
    fn recovery_degrades_as_white_noise_grows() {
        let clean = {
            let config = SimulationConfig {
                white_std_dev: 0.01,
                ..quiet_config()
            };
            let traces = run_am_pipeline(&config, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
            summarize_am(&traces).unwrap()
        };
        let noisy = {
            let config = SimulationConfig {
                white_std_dev: 2.0,
                ..quiet_config()
            };
            let traces = run_am_pipeline(&config, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
            summarize_am(&traces).unwrap()
        };

        assert!(noisy.correlation < clean.correlation);
        assert!(clean.correlation > 0.98);
    }

    #[test]
    fn drift_is_added_to_total_noise() {
        let config = SimulationConfig {
            drift_start: 0.0,
            drift_end: 0.1,
            ..quiet_config()
        };
        let traces = run_am_pipeline(&config, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert_eq!(traces.noise[0], 0.0);
        assert!((traces.noise[traces.len() - 1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn dual_slope_follows_config() {
        let result = run_dual_slope(&SimulationConfig::default()).unwrap();
        assert_eq!(result.t2, 49);

        let config = SimulationConfig {
            vin: -1.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            run_dual_slope(&config),
            Err(SimError::InvalidParameter(_))
        ));
    }

    #[test]
    fn invalid_modulation_fails_before_synthesis() {
        let config = SimulationConfig {
            signal_hz: 0.0,
            ..SimulationConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            run_am_pipeline(&config, &mut rng),
            Err(SimError::InvalidParameter(_))
        ));
    }
}
