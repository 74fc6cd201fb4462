//! Oscillator parameters and the fixed time grid
//!
//! Both are immutable for the duration of a run and validated before the
//! first step is taken.

use crate::error::{Error, Result};

/// Physical constants of the block on a spring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    /// Block mass (must be > 0)
    pub mass: f64,
    /// Spring constant k (must be >= 0)
    pub spring_constant: f64,
}

impl OscillatorParams {
    /// Create new oscillator parameters
    pub fn new(mass: f64, spring_constant: f64) -> Self {
        Self {
            mass,
            spring_constant,
        }
    }

    /// Angular frequency sqrt(k / m)
    pub fn angular_frequency(&self) -> f64 {
        (self.spring_constant / self.mass).sqrt()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(Error::invalid(format!(
                "mass must be finite and > 0, got {}",
                self.mass
            )));
        }
        if !self.spring_constant.is_finite() || self.spring_constant < 0.0 {
            return Err(Error::invalid(format!(
                "spring_constant must be finite and >= 0, got {}",
                self.spring_constant
            )));
        }
        Ok(())
    }
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Fixed-step clock: `num_steps` equal increments from `start_time` to `end_time`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    pub start_time: f64,
    pub end_time: f64,
    pub num_steps: usize,
}

impl TimeGrid {
    pub fn new(start_time: f64, end_time: f64, num_steps: usize) -> Self {
        Self {
            start_time,
            end_time,
            num_steps,
        }
    }

    /// Build a grid from a start time, a step size and a step count
    pub fn from_step(start_time: f64, dt: f64, num_steps: usize) -> Self {
        Self::new(start_time, start_time + dt * num_steps as f64, num_steps)
    }

    /// Step size `(end_time - start_time) / num_steps`
    pub fn dt(&self) -> f64 {
        (self.end_time - self.start_time) / self.num_steps as f64
    }

    /// Time after `step` increments
    pub fn time_at(&self, step: usize) -> f64 {
        self.start_time + step as f64 * self.dt()
    }

    /// Number of recorded samples for a complete run
    pub fn sample_count(&self) -> usize {
        self.num_steps + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_steps < 1 {
            return Err(Error::invalid("num_steps must be at least 1"));
        }
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(Error::invalid("start_time and end_time must be finite"));
        }
        if self.end_time <= self.start_time {
            return Err(Error::invalid(format!(
                "end_time ({}) must be greater than start_time ({})",
                self.end_time, self.start_time
            )));
        }
        if self.dt() <= 0.0 {
            return Err(Error::invalid("time step collapsed to zero"));
        }
        Ok(())
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::new(0.0, 12.0, 1200)
    }
}
