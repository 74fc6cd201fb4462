//! Oscillator state representation
//!
//! The state consists of two 3-vectors:
//! - position: displacement from the spring's rest point
//! - momentum: mass times velocity
//!
//! Each component evolves independently under the same linear rule, so a
//! one-dimensional problem simply leaves the other two components at rest.

use nalgebra::Vector3;

use crate::params::OscillatorParams;

/// Phase-space state of the block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorState {
    /// Position
    pub position: Vector3<f64>,
    /// Momentum
    pub momentum: Vector3<f64>,
}

impl OscillatorState {
    /// Create a new state
    pub fn new(position: Vector3<f64>, momentum: Vector3<f64>) -> Self {
        Self { position, momentum }
    }

    /// Block displaced to `position` and held at rest
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self::new(position, Vector3::zeros())
    }

    /// Create a zero state
    pub fn zero() -> Self {
        Self::at_rest(Vector3::zeros())
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.momentum.iter()).all(|v| v.is_finite())
    }

    /// Total mechanical energy `|p|^2 / 2m + k |x|^2 / 2`
    pub fn energy(&self, params: &OscillatorParams) -> f64 {
        0.5 * self.momentum.norm_squared() / params.mass
            + 0.5 * params.spring_constant * self.position.norm_squared()
    }
}

impl Default for OscillatorState {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_splits_into_kinetic_and_potential() {
        let params = OscillatorParams::new(2.0, 3.0);
        let state = OscillatorState::new(Vector3::new(0.0, 1.0, 0.0), Vector3::new(2.0, 0.0, 0.0));
        // 4 / (2 * 2) + 3 * 1 / 2
        assert!((state.energy(&params) - 2.5).abs() < 1e-15);
    }

    #[test]
    fn finiteness_checks_every_component() {
        let mut state = OscillatorState::at_rest(Vector3::new(0.0, 1.0, 0.0));
        assert!(state.is_finite());
        state.momentum.z = f64::INFINITY;
        assert!(!state.is_finite());
        state.momentum.z = 0.0;
        state.position.x = f64::NAN;
        assert!(!state.is_finite());
    }
}
