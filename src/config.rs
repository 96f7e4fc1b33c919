use serde::{Deserialize, Serialize};

use crate::dual_slope::DualSlopeParams;
use crate::signals::{ModulationParams, NoiseSpec};
use crate::timebase::sample_count;
use crate::SimError;

const MAX_SWEEP_POINTS: usize = 10_000;

/// Full parameter set for one run of both pipelines.
///
/// Defaults reproduce the reference bench: a 0.1 s window sampled at 20 kHz,
/// a 2 kHz carrier modulated by a 50 Hz strain signal, and a dual-slope
/// converter integrating 2.5 V for 100 cycles against a −5 V reference.
/// Fields missing from a JSON file, or set to `null`, keep those defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct SimulationConfig {
    /// Observation window [s]
    pub duration: f64,
    /// Sample step [s]
    pub step: f64,
    pub carrier_hz: f64,
    pub signal_hz: f64,
    pub depth: f64,
    pub white_mean: f64,
    pub white_std_dev: f64,
    pub line_amplitude: f64,
    pub drift_start: f64,
    pub drift_end: f64,
    /// Moving-average length [samples]
    pub filter_window: usize,
    pub vin: f64,
    pub vref: f64,
    pub t1: usize,
    pub rc: f64,
    pub sweep_vin_min: f64,
    pub sweep_vin_max: f64,
    pub sweep_points: usize,
    /// Seed for the white-noise generator
    pub seed: u64,
}

/// On-disk form of [`SimulationConfig`]; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    duration: Option<f64>,
    step: Option<f64>,
    carrier_hz: Option<f64>,
    signal_hz: Option<f64>,
    depth: Option<f64>,
    white_mean: Option<f64>,
    white_std_dev: Option<f64>,
    line_amplitude: Option<f64>,
    drift_start: Option<f64>,
    drift_end: Option<f64>,
    filter_window: Option<usize>,
    vin: Option<f64>,
    vref: Option<f64>,
    t1: Option<usize>,
    rc: Option<f64>,
    sweep_vin_min: Option<f64>,
    sweep_vin_max: Option<f64>,
    sweep_points: Option<usize>,
    seed: Option<u64>,
}

impl From<ConfigFile> for SimulationConfig {
    fn from(file: ConfigFile) -> Self {
        let d = SimulationConfig::default();
        Self {
            duration: file.duration.unwrap_or(d.duration),
            step: file.step.unwrap_or(d.step),
            carrier_hz: file.carrier_hz.unwrap_or(d.carrier_hz),
            signal_hz: file.signal_hz.unwrap_or(d.signal_hz),
            depth: file.depth.unwrap_or(d.depth),
            white_mean: file.white_mean.unwrap_or(d.white_mean),
            white_std_dev: file.white_std_dev.unwrap_or(d.white_std_dev),
            line_amplitude: file.line_amplitude.unwrap_or(d.line_amplitude),
            drift_start: file.drift_start.unwrap_or(d.drift_start),
            drift_end: file.drift_end.unwrap_or(d.drift_end),
            filter_window: file.filter_window.unwrap_or(d.filter_window),
            vin: file.vin.unwrap_or(d.vin),
            vref: file.vref.unwrap_or(d.vref),
            t1: file.t1.unwrap_or(d.t1),
            rc: file.rc.unwrap_or(d.rc),
            sweep_vin_min: file.sweep_vin_min.unwrap_or(d.sweep_vin_min),
            sweep_vin_max: file.sweep_vin_max.unwrap_or(d.sweep_vin_max),
            sweep_points: file.sweep_points.unwrap_or(d.sweep_points),
            seed: file.seed.unwrap_or(d.seed),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let adc = DualSlopeParams::default();
        Self {
            duration: 0.1,
            step: 0.00005,
            carrier_hz: 2000.0,
            signal_hz: 50.0,
            depth: 0.5,
            white_mean: 0.0,
            white_std_dev: 0.01,
            line_amplitude: 0.05,
            drift_start: 0.0,
            drift_end: 0.0,
            filter_window: crate::demod::DEFAULT_WINDOW,
            vin: adc.vin,
            vref: adc.vref,
            t1: adc.t1,
            rc: adc.rc,
            sweep_vin_min: 0.5,
            sweep_vin_max: 5.0,
            sweep_points: 10,
            seed: 0x00AD_C0DE_2024_u64,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let samples = sample_count(self.duration, self.step).map_err(into_config_error)?;

        if self.filter_window == 0 {
            return Err(SimError::InvalidConfig(
                "filter_window must be greater than zero".to_string(),
            ));
        }

        if self.filter_window > samples {
            return Err(SimError::InvalidConfig(format!(
                "filter_window ({}) exceeds the number of samples ({samples})",
                self.filter_window
            )));
        }

        if self.sweep_points == 0 || self.sweep_points > MAX_SWEEP_POINTS {
            return Err(SimError::InvalidConfig(format!(
                "sweep_points must be in 1..={MAX_SWEEP_POINTS}, got {}",
                self.sweep_points
            )));
        }

        if !(self.sweep_vin_min > 0.0 && self.sweep_vin_max >= self.sweep_vin_min)
            || !self.sweep_vin_max.is_finite()
        {
            return Err(SimError::InvalidConfig(
                "sweep range must satisfy 0 < sweep_vin_min <= sweep_vin_max".to_string(),
            ));
        }

        self.modulation().validate().map_err(into_config_error)?;
        self.noise().validate().map_err(into_config_error)?;
        self.dual_slope().validate().map_err(into_config_error)?;

        Ok(())
    }

    pub fn modulation(&self) -> ModulationParams {
        ModulationParams {
            carrier_hz: self.carrier_hz,
            signal_hz: self.signal_hz,
            depth: self.depth,
        }
    }

    pub fn noise(&self) -> NoiseSpec {
        NoiseSpec {
            white_mean: self.white_mean,
            white_std_dev: self.white_std_dev,
            line_amplitude: self.line_amplitude,
            drift_start: self.drift_start,
            drift_end: self.drift_end,
        }
    }

    pub fn dual_slope(&self) -> DualSlopeParams {
        DualSlopeParams {
            vin: self.vin,
            vref: self.vref,
            t1: self.t1,
            rc: self.rc,
        }
    }
}

fn into_config_error(err: SimError) -> SimError {
    match err {
        SimError::InvalidParameter(msg) => SimError::InvalidConfig(msg),
        other => other,
    }
}
