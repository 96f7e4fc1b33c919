//! Synchronous (phase-sensitive) demodulation
//!
//! Detection multiplies the bridge output by the sign of the carrier, which
//! folds the modulated envelope back to baseband and leaves ripple at twice
//! the carrier frequency. A centered moving average then removes that ripple
//! while passing the much slower measured signal.

use std::f64::consts::PI;

use crate::{ensure_aligned, ensure_finite, SimError, Waveform};

/// Moving-average length used by the reference scenario.
pub const DEFAULT_WINDOW: usize = 20;

/// `modulated[i] * sign(carrier[i])`, with `sign(0) = 0`.
pub fn phase_sensitive_detect(modulated: &[f64], carrier: &[f64]) -> Result<Waveform, SimError> {
    ensure_aligned("carrier", modulated, carrier)?;

    Ok(modulated
        .iter()
        .zip(carrier)
        .map(|(&m, &c)| m * sign(c))
        .collect())
}

/// Centered, same-length moving average.
///
/// Sample `i` averages `x[i - window/2 ..= i - window/2 + window - 1]`. Near
/// the edges the window is clipped to the valid range and the mean is taken
/// over the samples actually present.
pub fn moving_average(x: &[f64], window: usize) -> Result<Waveform, SimError> {
    check_window(window, x.len())?;

    let mut prefix = Vec::with_capacity(x.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &v in x {
        acc += v;
        prefix.push(acc);
    }

    let n = x.len();
    let lead = window / 2;
    Ok((0..n)
        .map(|i| {
            let lo = i.saturating_sub(lead);
            let hi = (i + window - lead).min(n);
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect())
}

/// Detection followed by moving-average low-pass filtering.
pub fn demodulate(modulated: &[f64], carrier: &[f64], window: usize) -> Result<Waveform, SimError> {
    ensure_aligned("carrier", modulated, carrier)?;
    check_window(window, modulated.len())?;

    let raw = phase_sensitive_detect(modulated, carrier)?;
    moving_average(&raw, window)
}

/// Magnitude response of a `window`-tap moving average at `freq_hz`.
///
/// `|sin(π·f·W/fs) / (W·sin(π·f/fs))|`, equal to 1 at DC and 0 whenever the
/// window spans a whole number of periods.
pub fn moving_average_gain(freq_hz: f64, sample_rate: f64, window: usize) -> Result<f64, SimError> {
    ensure_finite("freq_hz", freq_hz)?;
    ensure_finite("sample_rate", sample_rate)?;
    if sample_rate <= 0.0 {
        return Err(SimError::InvalidParameter(format!(
            "sample_rate must be > 0, got {sample_rate}"
        )));
    }
    if window == 0 {
        return Err(SimError::InvalidParameter(
            "window must be greater than zero".to_string(),
        ));
    }

    let x = PI * freq_hz / sample_rate;
    let denom = window as f64 * x.sin();
    if denom.abs() < f64::EPSILON {
        return Ok(1.0);
    }

    Ok(((window as f64 * x).sin() / denom).abs())
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn check_window(window: usize, len: usize) -> Result<(), SimError> {
    if window == 0 {
        return Err(SimError::InvalidParameter(
            "window must be greater than zero".to_string(),
        ));
    }
    if window > len {
        return Err(SimError::InvalidParameter(format!(
            "window ({window}) exceeds signal length ({len})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::modulate;
    use crate::signals::{carrier, physical_signal};
    use crate::timebase::build_time_base;

    fn amplitude(x: &[f64]) -> f64 {
        x.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()))
    }

    fn argmax(x: &[f64]) -> usize {
        x.iter()
            .enumerate()
            .fold((0, f64::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0
    }

    #[test]
    fn detection_uses_carrier_sign() {
        let out = phase_sensitive_detect(&[0.5, 0.5, 0.5], &[0.3, -2.0, 0.0]).unwrap();
        assert_eq!(out, vec![0.5, -0.5, 0.0]);
    }

    #[test]
    fn moving_average_matches_hand_computation() {
        // window 3: lead 1, each sample averages its neighbours
        let out = moving_average(&[3.0, 6.0, 9.0, 12.0], 3).unwrap();
        assert_eq!(out, vec![4.5, 6.0, 9.0, 10.5]);

        // window 2: lead 1, sample i averages x[i-1] and x[i]
        let out = moving_average(&[2.0, 4.0, 8.0], 2).unwrap();
        assert_eq!(out, vec![2.0, 3.0, 6.0]);
    }

    #[test]
    fn moving_average_preserves_length_and_constants() {
        let x = vec![1.25; 57];
        let out = moving_average(&x, DEFAULT_WINDOW).unwrap();
        assert_eq!(out.len(), x.len());
        assert!(out.iter().all(|&v| (v - 1.25).abs() < 1e-12));
    }

    #[test]
    fn carrier_ripple_is_attenuated() {
        let tb = build_time_base(0.1, 0.00005).unwrap();
        let ripple_hz = 2.0 * 2000.0;
        let ripple = carrier(tb.samples(), ripple_hz).unwrap();
        let filtered = moving_average(&ripple, DEFAULT_WINDOW).unwrap();

        let gain = moving_average_gain(ripple_hz, tb.sample_rate(), DEFAULT_WINDOW).unwrap();
        assert!(gain < 1e-9);

        let interior = &filtered[DEFAULT_WINDOW..filtered.len() - DEFAULT_WINDOW];
        assert!(amplitude(interior) < 1e-9);
        // five samples per ripple period, so the sampled peak is sin(2π/5)
        assert!(amplitude(&ripple) > 0.9);
    }

    #[test]
    fn measured_band_passes_with_window_loss() {
        let tb = build_time_base(0.1, 0.00005).unwrap();
        let signal = carrier(tb.samples(), 50.0).unwrap();
        let filtered = moving_average(&signal, DEFAULT_WINDOW).unwrap();

        let gain = moving_average_gain(50.0, tb.sample_rate(), DEFAULT_WINDOW).unwrap();
        assert!((gain - 0.9959).abs() < 1e-3);

        let interior = &filtered[DEFAULT_WINDOW..filtered.len() - DEFAULT_WINDOW];
        let amp = amplitude(interior);
        assert!(amp <= 1.0);
        assert!((amp - gain).abs() < 5e-3, "amp {amp} gain {gain}");
    }

    #[test]
    fn gain_is_unity_at_dc() {
        assert_eq!(moving_average_gain(0.0, 20_000.0, 20).unwrap(), 1.0);
    }

    #[test]
    fn recovers_sign_and_peak_timing_without_noise() {
        let tb = build_time_base(0.1, 0.00005).unwrap();
        let c = carrier(tb.samples(), 2000.0).unwrap();
        let phys = physical_signal(tb.samples(), 50.0, 1.0).unwrap();
        let modulated = modulate(&phys, &c, &vec![0.0; tb.len()]).unwrap();
        let filtered = demodulate(&modulated, &c, DEFAULT_WINDOW).unwrap();

        // 50 Hz at 20 kHz: 400 samples per period, peak at 100, trough at 300
        for period in 0..5 {
            let start = period * 400;
            let window = start..start + 400;
            let phys_peak = argmax(&phys[window.clone()]);
            let rec_peak = argmax(&filtered[window]);
            assert!(phys_peak.abs_diff(rec_peak) <= DEFAULT_WINDOW);
        }

        assert!(filtered[100] > 0.5);
        assert!(filtered[300] < -0.5);
        assert!(filtered[500] > 0.5);
    }

    #[test]
    fn window_bounds_are_enforced() {
        assert!(matches!(
            moving_average(&[1.0, 2.0], 0),
            Err(SimError::InvalidParameter(_))
        ));
        assert!(matches!(
            moving_average(&[1.0, 2.0], 3),
            Err(SimError::InvalidParameter(_))
        ));
        assert!(matches!(
            demodulate(&[1.0, 2.0], &[1.0], 1),
            Err(SimError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            demodulate(&[1.0, 2.0], &[1.0, 1.0], 5),
            Err(SimError::InvalidParameter(_))
        ));
    }
}
