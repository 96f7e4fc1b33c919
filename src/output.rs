use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use log::{debug, info};
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::dual_slope::DualSlopeResult;
use crate::sim::{AmSummary, AmTraces};
use crate::sweep::LinearityPoint;
use crate::{ensure_aligned, SimError};

#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub output_dir: PathBuf,
    pub am_traces_path: PathBuf,
    pub dual_slope_path: PathBuf,
    pub linearity_path: PathBuf,
    pub summary_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub config: &'a SimulationConfig,
    pub am: AmSummary,
    pub t1: usize,
    pub t2: usize,
    pub peak_voltage: f64,
    pub vin_estimated: Option<f64>,
}

/// Digits after the decimal point in every CSV cell.
const CSV_PRECISION: usize = 10;

/// Give up on finding a free run directory after this many attempts.
const MAX_RUN_DIR_ATTEMPTS: u32 = 100;

/// Create `<output_root>/<label>_<UTC timestamp>` for one simulation run.
///
/// Runs started within the same second get a `_2`, `_3`, ... suffix. The
/// label is a single path component, so it may not be empty or contain a
/// separator.
pub fn create_run_dir(output_root: &Path, label: &str) -> Result<PathBuf, SimError> {
    if label.is_empty() || label.contains(['/', '\\']) || label == "." || label == ".." {
        return Err(SimError::InvalidConfig(format!(
            "run label must be a plain directory name, got {label:?}"
        )));
    }
    fs::create_dir_all(output_root)?;

    let stem = format!("{label}_{}", Utc::now().format("%Y%m%d-%H%M%S"));
    for attempt in 1..=MAX_RUN_DIR_ATTEMPTS {
        let name = match attempt {
            1 => stem.clone(),
            n => format!("{stem}_{n}"),
        };
        let run_dir = output_root.join(name);
        match fs::create_dir(&run_dir) {
            Ok(()) => return Ok(run_dir),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(SimError::InvalidConfig(format!(
        "no free run directory for {stem:?} under {}",
        output_root.display()
    )))
}

fn cell(value: f64) -> String {
    format!("{value:.prec$}", prec = CSV_PRECISION)
}

/// Blank when the value is undefined, e.g. an estimate without a discharge.
fn optional_cell(value: Option<f64>) -> String {
    value.map(cell).unwrap_or_default()
}

pub fn write_am_csv(path: &Path, traces: &AmTraces) -> Result<(), SimError> {
    let n = traces.time.len();
    ensure_aligned("carrier", &traces.time, &traces.carrier)?;
    ensure_aligned("physical", &traces.time, &traces.physical)?;
    ensure_aligned("noise", &traces.time, &traces.noise)?;
    ensure_aligned("modulated", &traces.time, &traces.modulated)?;
    ensure_aligned("demod_raw", &traces.time, &traces.demod_raw)?;
    ensure_aligned("filtered", &traces.time, &traces.filtered)?;

    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "t",
        "carrier",
        "physical",
        "noise",
        "modulated",
        "demod_raw",
        "filtered",
    ])?;

    for idx in 0..n {
        writer.write_record([
            cell(traces.time[idx]),
            cell(traces.carrier[idx]),
            cell(traces.physical[idx]),
            cell(traces.noise[idx]),
            cell(traces.modulated[idx]),
            cell(traces.demod_raw[idx]),
            cell(traces.filtered[idx]),
        ])?;
    }

    writer.flush()?;
    debug!("wrote {n} AM samples to {}", path.display());
    Ok(())
}

pub fn write_dual_slope_csv(path: &Path, result: &DualSlopeResult) -> Result<(), SimError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["cycle", "voltage", "phase"])?;

    for segment in [&result.charge, &result.discharge] {
        ensure_aligned(segment.phase.label(), &segment.cycles, &segment.voltage)?;
        for (&cycle, &voltage) in segment.cycles.iter().zip(&segment.voltage) {
            writer.write_record([
                cell(cycle),
                cell(voltage),
                segment.phase.label().to_string(),
            ])?;
        }
    }

    writer.flush()?;
    debug!(
        "wrote dual-slope trace (T1 = {}, T2 = {}) to {}",
        result.t1,
        result.t2,
        path.display()
    );
    Ok(())
}

pub fn write_linearity_csv(path: &Path, points: &[LinearityPoint]) -> Result<(), SimError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["vin", "t2", "t2_ideal", "vin_estimated"])?;

    for point in points {
        writer.write_record([
            cell(point.vin),
            point.t2.to_string(),
            cell(point.t2_ideal),
            optional_cell(point.vin_estimated),
        ])?;
    }

    writer.flush()?;
    debug!("wrote {} linearity points to {}", points.len(), path.display());
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &RunSummary<'_>) -> Result<(), SimError> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write every artifact of one run into `output_dir`.
pub fn write_run_into_dir(
    output_dir: &Path,
    config: &SimulationConfig,
    traces: &AmTraces,
    am: AmSummary,
    dual_slope: &DualSlopeResult,
    linearity: &[LinearityPoint],
) -> Result<RunOutputs, SimError> {
    fs::create_dir_all(output_dir)?;

    let outputs = RunOutputs {
        output_dir: output_dir.to_path_buf(),
        am_traces_path: output_dir.join("am_traces.csv"),
        dual_slope_path: output_dir.join("dual_slope.csv"),
        linearity_path: output_dir.join("linearity.csv"),
        summary_path: output_dir.join("summary.json"),
    };

    write_am_csv(&outputs.am_traces_path, traces)?;
    write_dual_slope_csv(&outputs.dual_slope_path, dual_slope)?;
    write_linearity_csv(&outputs.linearity_path, linearity)?;
    write_summary_json(
        &outputs.summary_path,
        &RunSummary {
            config,
            am,
            t1: dual_slope.t1,
            t2: dual_slope.t2,
            peak_voltage: dual_slope.peak_voltage(),
            vin_estimated: dual_slope.estimated_vin(),
        },
    )?;

    info!("run written to {}", output_dir.display());
    Ok(outputs)
}
