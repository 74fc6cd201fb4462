//! Monte Carlo sweep over uncertain spring constant and mass
//!
//! Each iteration draws a parameter pair, runs a full trajectory and reduces
//! it to its peak momentum. Iterations run sequentially and share nothing but
//! the sampler's random stream, so a fixed seed reproduces the sweep exactly.
//!
//! A failed iteration never stops the sweep:
//! - a sampled pair outside the physical domain is rejected by the runner and
//!   recorded as [`RunOutcome::Rejected`];
//! - a run that goes non-finite is recorded as [`RunOutcome::Diverged`] with
//!   its partial trajectory.
//!
//! Only completed runs enter the peak-momentum distribution.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::Serialize;

use crate::block::BlockOnSpring;
use crate::error::{Error, Result};
use crate::histogram::Histogram;
use crate::integrator::IntegratorKind;
use crate::params::TimeGrid;
use crate::sampler::{ParameterSample, ParameterSampler, Spread};
use crate::sim::{self, Trajectory};

pub const DEFAULT_MONTE_CARLO_RUNS: usize = 1000;

/// What happened to one iteration
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        trajectory: Trajectory,
        max_momentum: f64,
    },
    Diverged {
        step: usize,
        trajectory: Trajectory,
    },
    Rejected {
        reason: String,
    },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Diverged { .. } => "diverged",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        match self {
            Self::Completed { trajectory, .. } | Self::Diverged { trajectory, .. } => Some(trajectory),
            Self::Rejected { .. } => None,
        }
    }

    pub fn max_momentum(&self) -> Option<f64> {
        match self {
            Self::Completed { max_momentum, .. } => Some(*max_momentum),
            _ => None,
        }
    }
}

/// One iteration of the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloRun {
    pub index: usize,
    pub sample: ParameterSample,
    pub outcome: RunOutcome,
}

/// All iterations of a sweep, keyed by iteration index
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloResult {
    pub runs: BTreeMap<usize, MonteCarloRun>,
    /// Iterations asked for
    pub requested: usize,
    /// Set when the sweep was cancelled before all iterations ran
    pub cancelled: bool,
    /// Momentum component the peaks were taken along
    pub momentum_axis: usize,
}

impl MonteCarloResult {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonteCarloRun> {
        self.runs.values()
    }

    /// Sampled pairs in iteration order
    pub fn samples(&self) -> Vec<ParameterSample> {
        self.iter().map(|run| run.sample).collect()
    }

    /// Peak momentum of every completed run, in iteration order
    pub fn max_momenta(&self) -> Vec<f64> {
        self.iter().filter_map(|run| run.outcome.max_momentum()).collect()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Completed { .. }))
    }

    pub fn diverged(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Diverged { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Rejected { .. }))
    }

    /// Iterations that never ran because of cancellation
    pub fn skipped(&self) -> usize {
        self.requested - self.runs.len()
    }

    fn count(&self, pred: impl Fn(&RunOutcome) -> bool) -> usize {
        self.iter().filter(|run| pred(&run.outcome)).count()
    }

    /// Distribution of peak momenta over completed runs
    pub fn histogram(&self, bins: usize, range: Option<(f64, f64)>) -> Result<Histogram> {
        Histogram::from_values(&self.max_momenta(), bins, range)
    }

    pub fn summary(&self) -> MonteCarloSummary {
        let maxima = self.max_momenta();
        let (mean, min, max) = if maxima.is_empty() {
            (None, None, None)
        } else {
            let mean = maxima.iter().sum::<f64>() / maxima.len() as f64;
            let min = maxima.iter().copied().fold(f64::INFINITY, f64::min);
            let max = maxima.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (Some(mean), Some(min), Some(max))
        };
        let std_dev = mean.map(|mean| {
            let var = maxima.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / maxima.len() as f64;
            var.sqrt()
        });

        MonteCarloSummary {
            requested: self.requested,
            completed: self.completed(),
            diverged: self.diverged(),
            rejected: self.rejected(),
            skipped: self.skipped(),
            cancelled: self.cancelled,
            momentum_axis: self.momentum_axis,
            mean_max_momentum: mean,
            std_max_momentum: std_dev,
            min_max_momentum: min,
            max_max_momentum: max,
        }
    }
}

/// Aggregate counts and peak-momentum statistics of a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloSummary {
    pub requested: usize,
    pub completed: usize,
    pub diverged: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub momentum_axis: usize,
    pub mean_max_momentum: Option<f64>,
    pub std_max_momentum: Option<f64>,
    pub min_max_momentum: Option<f64>,
    pub max_max_momentum: Option<f64>,
}

/// Runs sampled simulations against a fixed grid, integrator and initial state
#[derive(Debug, Clone)]
pub struct MonteCarloDriver {
    grid: TimeGrid,
    integrator: IntegratorKind,
    x0: Vector3<f64>,
    p0: Vector3<f64>,
    momentum_axis: usize,
    sampler: ParameterSampler,
}

impl MonteCarloDriver {
    pub fn new(
        grid: TimeGrid,
        integrator: IntegratorKind,
        x0: Vector3<f64>,
        sampler: ParameterSampler,
    ) -> Result<Self> {
        grid.validate()?;
        check_finite("x0", &x0)?;
        Ok(Self {
            grid,
            integrator,
            x0,
            p0: Vector3::zeros(),
            momentum_axis: 0,
            sampler,
        })
    }

    pub fn with_initial_momentum(mut self, p0: Vector3<f64>) -> Result<Self> {
        check_finite("p0", &p0)?;
        self.p0 = p0;
        Ok(self)
    }

    /// Reduce along momentum component `axis` instead of the first
    pub fn with_momentum_axis(mut self, axis: usize) -> Result<Self> {
        if axis > 2 {
            return Err(Error::invalid(format!("momentum axis must be 0, 1 or 2, got {axis}")));
        }
        self.momentum_axis = axis;
        Ok(self)
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    /// Run `n` iterations
    pub fn run(&mut self, n: usize) -> MonteCarloResult {
        self.run_with_cancel(n, &AtomicBool::new(false))
    }

    /// Run up to `n` iterations, stopping before the next one once `cancel`
    /// is set. Completed iterations are kept.
    pub fn run_with_cancel(&mut self, n: usize, cancel: &AtomicBool) -> MonteCarloResult {
        self.run_with_progress(n, cancel, |_| {})
    }

    /// Like [`run_with_cancel`](Self::run_with_cancel), handing each finished
    /// iteration to `on_run` before the next one starts.
    pub fn run_with_progress<F>(&mut self, n: usize, cancel: &AtomicBool, mut on_run: F) -> MonteCarloResult
    where
        F: FnMut(&MonteCarloRun),
    {
        info!(
            "monte carlo: {n} runs, {} over [{}, {}] in {} steps",
            self.integrator, self.grid.start_time, self.grid.end_time, self.grid.num_steps
        );

        let mut runs = BTreeMap::new();
        let mut cancelled = false;

        for index in 0..n {
            if cancel.load(Ordering::Relaxed) {
                warn!("monte carlo cancelled after {index} of {n} runs");
                cancelled = true;
                break;
            }
            let sample = self.sampler.sample();
            let run = MonteCarloRun {
                index,
                sample,
                outcome: self.run_one(index, &sample),
            };
            on_run(&run);
            runs.insert(index, run);
        }

        let result = MonteCarloResult {
            runs,
            requested: n,
            cancelled,
            momentum_axis: self.momentum_axis,
        };
        info!(
            "monte carlo done: {} completed, {} diverged, {} rejected, {} skipped",
            result.completed(),
            result.diverged(),
            result.rejected(),
            result.skipped()
        );
        result
    }

    fn run_one(&self, index: usize, sample: &ParameterSample) -> RunOutcome {
        let block = BlockOnSpring::new(sample.params(), self.integrator, self.x0)
            .with_initial_momentum(self.p0);

        match sim::run_block(&self.grid, block) {
            Ok(trajectory) => match sim::max_momentum_along(&trajectory, self.momentum_axis) {
                Ok(max_momentum) => {
                    debug!(
                        "run {index}: k = {}, m = {}, max momentum = {max_momentum}",
                        sample.spring_constant, sample.mass
                    );
                    RunOutcome::Completed {
                        trajectory,
                        max_momentum,
                    }
                }
                Err(err) => RunOutcome::Rejected {
                    reason: err.to_string(),
                },
            },
            Err(Error::NumericalDivergence {
                step, trajectory, ..
            }) => RunOutcome::Diverged {
                step,
                trajectory: *trajectory,
            },
            Err(err) => {
                warn!(
                    "run {index} rejected (k = {}, m = {}): {err}",
                    sample.spring_constant, sample.mass
                );
                RunOutcome::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn check_finite(name: &str, v: &Vector3<f64>) -> Result<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(Error::invalid(format!("{name} must be finite, got {v:?}")))
    }
}

/// Sweep `n` sampled runs in one call.
///
/// `seed` makes the sweep reproducible; `None` draws from OS entropy.
pub fn run_monte_carlo(
    n: usize,
    grid: TimeGrid,
    integrator: IntegratorKind,
    spring_constant: Spread,
    mass: Spread,
    x0: Vector3<f64>,
    seed: Option<u64>,
) -> Result<MonteCarloResult> {
    let sampler = ParameterSampler::with_optional_seed(spring_constant, mass, seed)?;
    let mut driver = MonteCarloDriver::new(grid, integrator, x0, sampler)?;
    Ok(driver.run(n))
}
