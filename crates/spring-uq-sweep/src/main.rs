mod output;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use spring_uq::sim::max_momentum_along;
use spring_uq::{Config, Error, IntegratorKind};

#[derive(Debug, Parser)]
#[command(author, version, about = "Block-on-spring integrators and Monte Carlo peak-momentum sweep")]
struct Cli {
    /// Configuration file (.json or .toml); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one deterministic simulation and print its final state
    Single {
        #[command(flatten)]
        sim: SimOverrides,
    },
    /// Run a Monte Carlo sweep and write per-run results, histogram and summary
    Sweep {
        #[command(flatten)]
        sim: SimOverrides,

        /// Number of sampled runs
        #[arg(long)]
        runs: Option<usize>,

        /// Random seed; OS entropy when neither this nor the config sets one
        #[arg(long)]
        seed: Option<u64>,

        /// Histogram bin count
        #[arg(long)]
        bins: Option<usize>,

        /// Lower histogram edge (requires --range-max)
        #[arg(long, requires = "range_max")]
        range_min: Option<f64>,

        /// Upper histogram edge (requires --range-min)
        #[arg(long, requires = "range_min")]
        range_max: Option<f64>,

        /// Output base directory
        #[arg(long, default_value = "output-spring-uq")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct SimOverrides {
    /// forward-euler, backward-euler or leapfrog
    #[arg(long)]
    integrator: Option<IntegratorKind>,

    /// Number of integration steps
    #[arg(long)]
    steps: Option<usize>,

    /// Final simulation time
    #[arg(long)]
    end_time: Option<f64>,
}

impl SimOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.integrator {
            config.simulation.integrator = v;
        }
        if let Some(v) = self.steps {
            config.simulation.num_steps = v;
        }
        if let Some(v) = self.end_time {
            config.simulation.end_time = v;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Single { sim } => {
            sim.apply(&mut config);
            config.validate()?;
            run_single(&config)
        }
        Command::Sweep {
            sim,
            runs,
            seed,
            bins,
            range_min,
            range_max,
            output,
        } => {
            sim.apply(&mut config);
            let mc = &mut config.monte_carlo;
            if let Some(v) = runs {
                mc.runs = v;
            }
            if seed.is_some() {
                mc.seed = seed;
            }
            if let Some(v) = bins {
                mc.histogram_bins = v;
            }
            if let (Some(min), Some(max)) = (range_min, range_max) {
                mc.histogram_range = Some([min, max]);
            }
            config.validate()?;
            run_sweep(&config, output)
        }
    }
}

fn run_single(config: &Config) -> anyhow::Result<()> {
    let sim = &config.simulation;
    let axis = config.monte_carlo.momentum_axis;

    let trajectory = match sim.run() {
        Ok(trajectory) => trajectory,
        Err(Error::NumericalDivergence { step, time, .. }) => {
            bail!("{} diverged at step {step} (t = {time})", sim.integrator)
        }
        Err(err) => return Err(err.into()),
    };
    let Some(last) = trajectory.last() else {
        bail!("simulation produced no samples");
    };

    println!(
        "{} | k = {} | m = {} | {} steps over [{}, {}]",
        sim.integrator, sim.spring_constant, sim.mass, sim.num_steps, sim.start_time, sim.end_time
    );
    println!("Angular frequency: {:.6}", sim.params().angular_frequency());
    println!(
        "Final state (t = {:.4}): x = [{:.6}, {:.6}, {:.6}] p = [{:.6}, {:.6}, {:.6}]",
        last.time,
        last.position.x,
        last.position.y,
        last.position.z,
        last.momentum.x,
        last.momentum.y,
        last.momentum.z
    );
    println!(
        "Max momentum (axis {axis}): {:.6}",
        max_momentum_along(&trajectory, axis)?
    );
    println!("Energy drift: {:.3e}", trajectory.energy_drift());
    Ok(())
}

fn run_sweep(config: &Config, output_root: PathBuf) -> anyhow::Result<()> {
    let mc = &config.monte_carlo;
    if mc.seed.is_none() {
        info!("no seed given, sampling from OS entropy");
    }

    let every = (mc.runs / 10).max(1);
    let result = config
        .driver()?
        .run_with_progress(mc.runs, &AtomicBool::new(false), |run| {
            if (run.index + 1) % every == 0 {
                info!("run {}/{} done", run.index + 1, mc.runs);
            }
        });
    let histogram = result.histogram(mc.histogram_bins, mc.histogram_range())?;
    let summary = result.summary();

    let output_dir = output::create_timestamped_output_dir(&output_root)?;
    let outputs = output::write_sweep(&output_dir, config, &result, &histogram)?;

    println!(
        "Sweep complete. Runs: {} | completed: {} | diverged: {} | rejected: {}",
        summary.requested, summary.completed, summary.diverged, summary.rejected
    );
    if let (Some(mean), Some(std), Some(min), Some(max)) = (
        summary.mean_max_momentum,
        summary.std_max_momentum,
        summary.min_max_momentum,
        summary.max_max_momentum,
    ) {
        println!("Max momentum: mean {mean:.6} | std {std:.6} | min {min:.6} | max {max:.6}");
    }
    if let Some(bin) = histogram.mode_bin() {
        let (lower, upper, count) = histogram
            .rows()
            .nth(bin)
            .unwrap_or((histogram.lower(), histogram.upper(), 0));
        println!("Mode bin: [{lower:.6}, {upper:.6}) with {count} runs");
    }
    if histogram.outside > 0 {
        println!("Outside histogram range: {}", histogram.outside);
    }
    println!("Run directory: {}", outputs.output_dir.display());
    println!("Runs CSV: {}", outputs.runs_path.display());
    println!("Histogram CSV: {}", outputs.histogram_path.display());
    println!("Summary: {}", outputs.summary_path.display());
    Ok(())
}
