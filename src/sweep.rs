use serde::{Deserialize, Serialize};

use crate::dual_slope::{simulate_dual_slope, DualSlopeParams};
use crate::SimError;

/// Converter response at one input voltage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearityPoint {
    pub vin: f64,
    pub t2: usize,
    /// Untruncated discharge time `Vin·(T1 − 1)/|Vref|`
    pub t2_ideal: f64,
    pub vin_estimated: Option<f64>,
}

/// `count` evenly spaced voltages from `min` to `max` inclusive.
pub fn vin_grid(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![min];
    }

    let span = max - min;
    let denom = count.saturating_sub(1) as f64;

    (0..count)
        .map(|idx| min + span * idx as f64 / denom)
        .collect()
}

/// Run the converter once per input voltage, holding `T1`, `R` and `Vref`.
pub fn linearity_sweep(
    base: &DualSlopeParams,
    vin_values: &[f64],
) -> Result<Vec<LinearityPoint>, SimError> {
    vin_values
        .iter()
        .map(|&vin| -> Result<LinearityPoint, SimError> {
            let params = DualSlopeParams { vin, ..*base };
            let result = simulate_dual_slope(&params)?;
            Ok(LinearityPoint {
                vin,
                t2: result.t2,
                t2_ideal: vin * (params.t1 - 1) as f64 / params.vref.abs(),
                vin_estimated: result.estimated_vin(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_endpoints() {
        let grid = vin_grid(0.5, 5.0, 10);
        assert_eq!(grid.len(), 10);
        assert_eq!(grid[0], 0.5);
        assert!((grid[9] - 5.0).abs() < 1e-12);
        assert!((grid[1] - 1.0).abs() < 1e-12);
        assert_eq!(vin_grid(2.0, 3.0, 1), vec![2.0]);
    }

    #[test]
    fn sweep_tracks_ideal_response() {
        let grid = vin_grid(0.5, 5.0, 10);
        let points = linearity_sweep(&DualSlopeParams::default(), &grid).unwrap();

        assert_eq!(points.len(), grid.len());
        assert!(points.windows(2).all(|w| w[1].t2 >= w[0].t2));
        for p in &points {
            assert!(p.t2_ideal - (p.t2 as f64) < 1.0 + 1e-9);
            assert!(p.t2 as f64 <= p.t2_ideal + 1e-9);
        }
    }

    #[test]
    fn sweep_propagates_invalid_voltage() {
        let result = linearity_sweep(&DualSlopeParams::default(), &[1.0, -1.0]);
        assert!(matches!(result, Err(SimError::InvalidParameter(_))));
    }
}
