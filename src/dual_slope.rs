//! Dual-slope integrating ADC
//!
//! The integrator charges from the unknown input for a fixed `T1` cycles and
//! is then discharged by an opposite-polarity reference. The discharge time
//! `T2` is solved in closed form from the end-of-charge voltage, which keeps
//! `T2` proportional to `Vin` for fixed `T1`, `R` and `Vref`.

use serde::{Deserialize, Serialize};

use crate::{ensure_finite, SimError};

/// Longest charge or discharge phase the simulator will materialize [cycles].
pub const MAX_CYCLES: usize = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualSlopeParams {
    /// Unknown input voltage [V], must be positive
    pub vin: f64,
    /// Reference voltage [V], must be negative
    pub vref: f64,
    /// Fixed integration time [clock cycles]
    pub t1: usize,
    /// Integration time-constant divisor (simplified RC)
    pub rc: f64,
}

impl Default for DualSlopeParams {
    fn default() -> Self {
        Self {
            vin: 2.5,
            vref: -5.0,
            t1: 100,
            rc: 10.0,
        }
    }
}

impl DualSlopeParams {
    pub fn validate(&self) -> Result<(), SimError> {
        ensure_finite("vin", self.vin)?;
        ensure_finite("vref", self.vref)?;
        ensure_finite("rc", self.rc)?;

        if self.vin <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "vin must be > 0, got {}",
                self.vin
            )));
        }
        if self.vref >= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "vref must be < 0 (opposite polarity to vin), got {}",
                self.vref
            )));
        }
        if self.t1 == 0 {
            return Err(SimError::InvalidParameter(
                "t1 must be greater than zero".to_string(),
            ));
        }
        if self.t1 > MAX_CYCLES {
            return Err(SimError::InvalidParameter(format!(
                "t1 ({}) exceeds {MAX_CYCLES} cycles",
                self.t1
            )));
        }
        if self.rc == 0.0 {
            return Err(SimError::InvalidParameter("rc must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Charge slope `Vin / R` [V/cycle]
    pub fn charge_slope(&self) -> f64 {
        self.vin / self.rc
    }

    /// Discharge slope `Vref / R` [V/cycle]
    pub fn discharge_slope(&self) -> f64 {
        self.vref / self.rc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampPhase {
    Charge,
    Discharge,
}

impl RampPhase {
    pub fn label(&self) -> &'static str {
        match self {
            RampPhase::Charge => "charge",
            RampPhase::Discharge => "discharge",
        }
    }
}

/// One phase of the integrator trace, on the global cycle axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampSegment {
    pub phase: RampPhase,
    pub cycles: Vec<f64>,
    pub voltage: Vec<f64>,
    /// Phase duration [clock cycles]
    pub duration: usize,
    /// Ramp slope [V/cycle]
    pub slope: f64,
}

impl RampSegment {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualSlopeResult {
    pub params: DualSlopeParams,
    pub charge: RampSegment,
    pub discharge: RampSegment,
    /// Concatenated cycle axis
    pub time: Vec<f64>,
    /// Concatenated capacitor voltage
    pub voltage: Vec<f64>,
    pub t1: usize,
    /// Measured discharge time [clock cycles]
    pub t2: usize,
}

impl DualSlopeResult {
    /// Capacitor voltage at the end of the charge phase
    pub fn peak_voltage(&self) -> f64 {
        self.params.charge_slope() * (self.t1 - 1) as f64
    }

    /// Input voltage read back from the cycle counts, `|Vref|·T2 / (T1 − 1)`.
    ///
    /// `None` when `T1 = 1`, where the charge phase never leaves zero.
    pub fn estimated_vin(&self) -> Option<f64> {
        if self.t1 < 2 {
            return None;
        }
        Some(self.params.vref.abs() * self.t2 as f64 / (self.t1 - 1) as f64)
    }
}

/// Run the charge and discharge phases and derive `T2`.
///
/// `T2 = trunc(|v_end / s2|)`; the ratio is non-negative under the
/// preconditions, so truncation and floor agree.
pub fn simulate_dual_slope(params: &DualSlopeParams) -> Result<DualSlopeResult, SimError> {
    params.validate()?;

    let s1 = params.charge_slope();
    let s2 = params.discharge_slope();
    let t1 = params.t1;

    let charge_cycles: Vec<f64> = (0..t1).map(|k| k as f64).collect();
    let charge_voltage: Vec<f64> = charge_cycles.iter().map(|&k| s1 * k).collect();
    let v_end = s1 * (t1 - 1) as f64;

    let ratio = (v_end / s2).abs();
    if !ratio.is_finite() || ratio.trunc() > MAX_CYCLES as f64 {
        return Err(SimError::InvalidParameter(format!(
            "discharge time |v_end / s2| = {ratio} exceeds {MAX_CYCLES} cycles"
        )));
    }
    let t2 = ratio.trunc() as usize;
    let total = t1.checked_add(t2).ok_or_else(|| {
        SimError::InvalidParameter(format!("t1 + t2 overflows ({t1} + {t2})"))
    })?;

    let origin = (t1 - 1) as f64;
    let discharge_cycles: Vec<f64> = (0..t2).map(|k| origin + k as f64).collect();
    let discharge_voltage: Vec<f64> = (0..t2).map(|k| v_end + s2 * k as f64).collect();

    let mut time = Vec::with_capacity(total);
    time.extend_from_slice(&charge_cycles);
    time.extend_from_slice(&discharge_cycles);

    let mut voltage = Vec::with_capacity(total);
    voltage.extend_from_slice(&charge_voltage);
    voltage.extend_from_slice(&discharge_voltage);

    Ok(DualSlopeResult {
        params: *params,
        charge: RampSegment {
            phase: RampPhase::Charge,
            cycles: charge_cycles,
            voltage: charge_voltage,
            duration: t1,
            slope: s1,
        },
        discharge: RampSegment {
            phase: RampPhase::Discharge,
            cycles: discharge_cycles,
            voltage: discharge_voltage,
            duration: t2,
            slope: s2,
        },
        time,
        voltage,
        t1,
        t2,
    })
}
