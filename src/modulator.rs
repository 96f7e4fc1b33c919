//! Bridge-output model: the physical quantity amplitude-modulates the carrier
//! and noise enters additively after modulation.

use crate::{ensure_aligned, SimError, Waveform};

/// Elementwise sum of the white and line-interference components.
pub fn total_noise(white: &[f64], line: &[f64]) -> Result<Waveform, SimError> {
    ensure_aligned("line noise", white, line)?;
    Ok(white.iter().zip(line).map(|(&w, &l)| w + l).collect())
}

/// `physical * carrier + noise`, sample by sample.
pub fn modulate(physical: &[f64], carrier: &[f64], noise: &[f64]) -> Result<Waveform, SimError> {
    ensure_aligned("carrier", physical, carrier)?;
    ensure_aligned("noise", physical, noise)?;

    Ok(physical
        .iter()
        .zip(carrier)
        .zip(noise)
        .map(|((&s, &c), &n)| s * c + n)
        .collect())
}
