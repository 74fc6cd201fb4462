//! Host-facing block-on-spring module
//!
//! A simulation host drives the block through a fixed lifecycle: call
//! [`BlockOnSpring::initialize`] once with the clock, then
//! [`BlockOnSpring::update`] once per clock tick. Between ticks the current
//! position and momentum are published by name for diagnostics.

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::integrator::{Integrator, IntegratorKind};
use crate::params::{OscillatorParams, TimeGrid};
use crate::state::OscillatorState;

/// Resource name for the position vector
pub const POSITION: &str = "position";
/// Resource name for the momentum vector
pub const MOMENTUM: &str = "momentum";

/// A block attached to a spring, advanced by a selected integrator
#[derive(Debug, Clone)]
pub struct BlockOnSpring {
    params: OscillatorParams,
    kind: IntegratorKind,
    x0: Vector3<f64>,
    p0: Vector3<f64>,
    state: OscillatorState,
    integrator: Option<Integrator>,
    steps_taken: usize,
}

impl BlockOnSpring {
    /// Create a block that will start at rest at `x0`
    pub fn new(params: OscillatorParams, kind: IntegratorKind, x0: Vector3<f64>) -> Self {
        Self {
            params,
            kind,
            x0,
            p0: Vector3::zeros(),
            state: OscillatorState::zero(),
            integrator: None,
            steps_taken: 0,
        }
    }

    /// Start with momentum `p0` instead of at rest
    pub fn with_initial_momentum(mut self, p0: Vector3<f64>) -> Self {
        self.p0 = p0;
        self
    }

    /// Validate the configuration, fix `dt` and load the initial state.
    ///
    /// Calling this again resets the block to its initial state.
    pub fn initialize(&mut self, grid: &TimeGrid) -> Result<()> {
        self.params.validate()?;
        grid.validate()?;

        let state = OscillatorState::new(self.x0, self.p0);
        if !state.is_finite() {
            return Err(Error::invalid("initial position and momentum must be finite"));
        }

        self.integrator = Some(Integrator::new(self.kind, grid.dt())?);
        self.state = state;
        self.steps_taken = 0;
        Ok(())
    }

    /// Advance by exactly one step
    pub fn update(&mut self) -> Result<()> {
        let integrator = self
            .integrator
            .ok_or_else(|| Error::invalid("update called before initialize"))?;
        integrator.push(&mut self.state, &self.params);
        self.steps_taken += 1;
        Ok(())
    }

    /// Look up a published vector by name
    pub fn resource(&self, name: &str) -> Option<Vector3<f64>> {
        match name {
            POSITION => Some(self.state.position),
            MOMENTUM => Some(self.state.momentum),
            _ => None,
        }
    }

    /// All published vectors
    pub fn resources(&self) -> [(&'static str, Vector3<f64>); 2] {
        [
            (POSITION, self.state.position),
            (MOMENTUM, self.state.momentum),
        ]
    }

    pub fn state(&self) -> &OscillatorState {
        &self.state
    }

    pub fn params(&self) -> &OscillatorParams {
        &self.params
    }

    pub fn kind(&self) -> IntegratorKind {
        self.kind
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Step size fixed at initialization
    pub fn dt(&self) -> Option<f64> {
        self.integrator.map(|i| i.dt())
    }
}
