use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use meas_sim::config::SimulationConfig;
use meas_sim::{
    create_run_dir, linearity_sweep, run_am_pipeline, run_dual_slope, summarize_am, vin_grid,
    write_run_into_dir,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "AM synchronous demodulation and dual-slope ADC simulation"
)]
struct Cli {
    /// JSON configuration file (defaults to ./config.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory; each run gets a `<label>_<timestamp>` subdirectory
    #[arg(long, default_value = "output-meas-sim")]
    output: PathBuf,

    /// Run name prefixed to the run directory
    #[arg(long, default_value = "run")]
    label: String,

    /// Carrier frequency [Hz]
    #[arg(long)]
    carrier_hz: Option<f64>,

    /// Measured signal frequency [Hz]
    #[arg(long)]
    signal_hz: Option<f64>,

    /// Modulation depth (strain amplitude)
    #[arg(long)]
    depth: Option<f64>,

    /// White noise mean
    #[arg(long, allow_hyphen_values = true)]
    noise_mean: Option<f64>,

    /// White noise standard deviation
    #[arg(long)]
    noise_std: Option<f64>,

    /// 50 Hz interference amplitude
    #[arg(long)]
    line_amplitude: Option<f64>,

    /// Dual-slope input voltage [V]
    #[arg(long)]
    vin: Option<f64>,

    /// Dual-slope reference voltage [V]
    #[arg(long, allow_hyphen_values = true)]
    vref: Option<f64>,

    /// Fixed integration time [clock cycles]
    #[arg(long)]
    t1: Option<usize>,

    /// Moving-average window [samples]
    #[arg(long)]
    window: Option<usize>,

    /// Random seed for the white-noise generator
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    apply_overrides(&mut cfg, &cli);
    cfg.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let traces = run_am_pipeline(&cfg, &mut rng)?;
    let am = summarize_am(&traces)?;
    let dual_slope = run_dual_slope(&cfg)?;
    let grid = vin_grid(cfg.sweep_vin_min, cfg.sweep_vin_max, cfg.sweep_points);
    let linearity = linearity_sweep(&cfg.dual_slope(), &grid)?;

    let output_dir = create_run_dir(&cli.output, &cli.label)?;
    let outputs = write_run_into_dir(&output_dir, &cfg, &traces, am, &dual_slope, &linearity)?;

    println!(
        "AM: {} samples | recovered/physical gain {:.3} | correlation {:.4}",
        traces.len(),
        am.gain,
        am.correlation
    );
    println!(
        "Dual-slope: Vin = {:.3} V | T1 = {} | T2 = {} cycles | peak {:.3} V",
        cfg.vin,
        dual_slope.t1,
        dual_slope.t2,
        dual_slope.peak_voltage()
    );
    if let Some(estimate) = dual_slope.estimated_vin() {
        println!("Estimated Vin from T2: {estimate:.4} V");
    }
    println!("Run directory: {}", outputs.output_dir.display());
    println!("AM traces: {}", outputs.am_traces_path.display());
    println!("Dual-slope trace: {}", outputs.dual_slope_path.display());
    println!("Linearity: {}", outputs.linearity_path.display());
    println!("Summary: {}", outputs.summary_path.display());

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    let cwd_config = PathBuf::from("config.json");
    if cwd_config.exists() {
        return load_config_file(&cwd_config);
    }

    Ok(SimulationConfig::default())
}

fn load_config_file(path: &Path) -> anyhow::Result<SimulationConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: SimulationConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    log::info!("loaded configuration from {}", path.display());
    Ok(config)
}

fn apply_overrides(cfg: &mut SimulationConfig, cli: &Cli) {
    if let Some(v) = cli.carrier_hz {
        cfg.carrier_hz = v;
    }
    if let Some(v) = cli.signal_hz {
        cfg.signal_hz = v;
    }
    if let Some(v) = cli.depth {
        cfg.depth = v;
    }
    if let Some(v) = cli.noise_mean {
        cfg.white_mean = v;
    }
    if let Some(v) = cli.noise_std {
        cfg.white_std_dev = v;
    }
    if let Some(v) = cli.line_amplitude {
        cfg.line_amplitude = v;
    }
    if let Some(v) = cli.vin {
        cfg.vin = v;
    }
    if let Some(v) = cli.vref {
        cfg.vref = v;
    }
    if let Some(v) = cli.t1 {
        cfg.t1 = v;
    }
    if let Some(v) = cli.window {
        cfg.filter_window = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }
}
