//! Measurement-systems simulation
//!
//! Two classical analog measurement techniques, simulated sample by sample
//! with every intermediate signal exposed:
//!
//! * amplitude-modulated bridge sensing recovered by synchronous
//!   (phase-sensitive) demodulation and a moving-average low-pass filter;
//! * dual-slope analog-to-digital conversion, where a fixed-time charge ramp
//!   and a reference discharge ramp turn an input voltage into a cycle count.

pub mod config;
pub mod demod;
pub mod dual_slope;
pub mod modulator;
pub mod output;
pub mod signals;
pub mod sim;
pub mod sweep;
pub mod timebase;

use thiserror::Error;

// Re-export main types
pub use config::SimulationConfig;
pub use demod::{demodulate, moving_average, moving_average_gain, phase_sensitive_detect};
pub use dual_slope::{simulate_dual_slope, DualSlopeParams, DualSlopeResult, RampPhase, RampSegment};
pub use modulator::{modulate, total_noise};
pub use output::{create_run_dir, write_run_into_dir, RunOutputs};
pub use signals::{
    carrier, drift_noise, line_noise, physical_signal, white_noise, ModulationParams, NoiseSpec,
    LINE_FREQUENCY_HZ,
};
pub use sim::{run_am_pipeline, run_dual_slope, summarize_am, AmSummary, AmTraces};
pub use sweep::{linearity_sweep, vin_grid, LinearityPoint};
pub use timebase::{build_time_base, sample_count, TimeBase};

/// A sampled signal aligned 1:1 with a [`TimeBase`].
pub type Waveform = Vec<f64>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fails unless `other` has one sample per entry of `reference`.
pub(crate) fn ensure_aligned(
    context: &'static str,
    reference: &[f64],
    other: &[f64],
) -> Result<(), SimError> {
    if reference.len() == other.len() {
        return Ok(());
    }

    Err(SimError::DimensionMismatch {
        context,
        expected: reference.len(),
        got: other.len(),
    })
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() {
        return Ok(());
    }

    Err(SimError::InvalidParameter(format!(
        "{name} must be finite, got {value}"
    )))
}
