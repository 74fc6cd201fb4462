//! Trajectory runner for a single block-on-spring simulation
//!
//! Drives a [`BlockOnSpring`] through every tick of a [`TimeGrid`] and records
//! the state before the first step and after each step, giving
//! `num_steps + 1` samples for a complete run.

use log::warn;
use nalgebra::Vector3;

use crate::block::BlockOnSpring;
use crate::error::{Error, Result};
use crate::integrator::IntegratorKind;
use crate::params::{OscillatorParams, TimeGrid};
use crate::state::OscillatorState;

/// Recorded state at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub time: f64,
    pub momentum: Vector3<f64>,
    pub position: Vector3<f64>,
}

/// Full time series produced by one run
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub params: OscillatorParams,
    pub integrator: IntegratorKind,
    pub samples: Vec<TrajectorySample>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    /// Largest first-component momentum over all samples
    pub fn max_momentum(&self) -> Result<f64> {
        max_momentum(self)
    }

    /// Energy of each sample
    pub fn energies(&self) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| OscillatorState::new(s.position, s.momentum).energy(&self.params))
            .collect()
    }

    /// Largest deviation of the energy from its initial value.
    ///
    /// Relative to the initial energy, or absolute when that is zero.
    pub fn energy_drift(&self) -> f64 {
        let energies = self.energies();
        let Some(&e0) = energies.first() else {
            return 0.0;
        };
        let scale = if e0 > 0.0 { e0 } else { 1.0 };
        energies
            .iter()
            .map(|e| (e - e0).abs() / scale)
            .fold(0.0_f64, f64::max)
    }
}

/// Largest value of the first momentum component
pub fn max_momentum(trajectory: &Trajectory) -> Result<f64> {
    max_momentum_along(trajectory, 0)
}

/// Largest value of momentum component `axis` (0, 1 or 2)
pub fn max_momentum_along(trajectory: &Trajectory, axis: usize) -> Result<f64> {
    if axis > 2 {
        return Err(Error::invalid(format!("momentum axis must be 0, 1 or 2, got {axis}")));
    }
    if trajectory.is_empty() {
        return Err(Error::invalid("cannot reduce a trajectory with no samples"));
    }
    Ok(trajectory
        .samples
        .iter()
        .map(|s| s.momentum[axis])
        .fold(f64::NEG_INFINITY, f64::max))
}

/// Simulate a block starting at rest at `x0`
pub fn run(
    grid: &TimeGrid,
    params: OscillatorParams,
    kind: IntegratorKind,
    x0: Vector3<f64>,
) -> Result<Trajectory> {
    run_block(grid, BlockOnSpring::new(params, kind, x0))
}

/// Simulate a prepared block over `grid`
pub fn run_block(grid: &TimeGrid, block: BlockOnSpring) -> Result<Trajectory> {
    run_observed(grid, block, |_| {})
}

/// Simulate a prepared block, handing every recorded sample to `observer`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] before stepping when the block or
/// grid is invalid, and [`Error::NumericalDivergence`] with the partial
/// trajectory when a step produces a non-finite state.
pub fn run_observed<F>(grid: &TimeGrid, mut block: BlockOnSpring, mut observer: F) -> Result<Trajectory>
where
    F: FnMut(&TrajectorySample),
{
    block.initialize(grid)?;

    let mut samples = Vec::with_capacity(grid.sample_count());
    let initial = sample_of(&block, grid.start_time);
    observer(&initial);
    samples.push(initial);

    for step in 1..=grid.num_steps {
        block.update()?;

        let time = grid.time_at(step);
        let sample = sample_of(&block, time);
        observer(&sample);
        samples.push(sample);

        if !block.state().is_finite() {
            warn!(
                "{} diverged at step {step} (t = {time}) with k = {}, m = {}",
                block.kind(),
                block.params().spring_constant,
                block.params().mass
            );
            return Err(Error::NumericalDivergence {
                step,
                time,
                trajectory: Box::new(Trajectory {
                    params: *block.params(),
                    integrator: block.kind(),
                    samples,
                }),
            });
        }
    }

    Ok(Trajectory {
        params: *block.params(),
        integrator: block.kind(),
        samples,
    })
}

fn sample_of(block: &BlockOnSpring, time: f64) -> TrajectorySample {
    let state = block.state();
    TrajectorySample {
        time,
        momentum: state.momentum,
        position: state.position,
    }
}
