//! Fixed-step integrators for the block on a spring
//!
//! With `x` the position, `p` the momentum, `k` the spring constant, `m` the
//! mass and `h` the step size, the three rules are:
//!
//! ```text
//! ForwardEuler   p' = p - h k x          x' = x + h p / m
//! BackwardEuler  x' = (x + h p / m) / (1 + h^2 k / m)
//!                p' = p - h k x'
//! Leapfrog       x' = x + h p / m        p' = p - h k x'
//! ```
//!
//! Forward Euler gains energy every step and Backward Euler loses it. Both
//! drifts are properties of the schemes and are kept as-is. Leapfrog
//! (symplectic Euler) keeps the energy bounded around its initial value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::params::OscillatorParams;
use crate::state::OscillatorState;

/// Closed set of supported integration rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IntegratorKind {
    ForwardEuler,
    BackwardEuler,
    Leapfrog,
}

impl IntegratorKind {
    pub const ALL: [IntegratorKind; 3] = [
        IntegratorKind::ForwardEuler,
        IntegratorKind::BackwardEuler,
        IntegratorKind::Leapfrog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ForwardEuler => "ForwardEuler",
            Self::BackwardEuler => "BackwardEuler",
            Self::Leapfrog => "Leapfrog",
        }
    }

    /// Advance `state` by one step of size `dt`.
    ///
    /// Pure: the result depends only on the arguments.
    pub fn step(self, state: &OscillatorState, params: &OscillatorParams, dt: f64) -> OscillatorState {
        let OscillatorState { position, momentum } = *state;
        let mass = params.mass;
        let k = params.spring_constant;

        match self {
            Self::ForwardEuler => {
                // Both updates read the pre-step state.
                let next_momentum = momentum - position * (dt * k);
                let next_position = position + momentum * dt / mass;
                OscillatorState::new(next_position, next_momentum)
            }
            Self::BackwardEuler => {
                let alpha = 1.0 / (1.0 + dt * dt * k / mass);
                let next_position = (position + momentum * dt / mass) * alpha;
                let next_momentum = momentum - next_position * (dt * k);
                OscillatorState::new(next_position, next_momentum)
            }
            Self::Leapfrog => {
                let next_position = position + momentum * dt / mass;
                let next_momentum = momentum - next_position * (dt * k);
                OscillatorState::new(next_position, next_momentum)
            }
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegratorKind {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "forwardeuler" | "euler" => Ok(Self::ForwardEuler),
            "backwardeuler" | "impliciteuler" => Ok(Self::BackwardEuler),
            "leapfrog" | "symplecticeuler" => Ok(Self::Leapfrog),
            _ => Err(Error::invalid(format!("unknown integrator: {raw}"))),
        }
    }
}

impl TryFrom<String> for IntegratorKind {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<IntegratorKind> for String {
    fn from(kind: IntegratorKind) -> Self {
        kind.name().to_string()
    }
}

/// An integration rule bound to the step size of one run
///
/// `dt` is fixed when the integrator is created and cannot change mid-run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    kind: IntegratorKind,
    dt: f64,
}

impl Integrator {
    pub fn new(kind: IntegratorKind, dt: f64) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::invalid(format!("dt must be finite and > 0, got {dt}")));
        }
        Ok(Self { kind, dt })
    }

    pub fn kind(&self) -> IntegratorKind {
        self.kind
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Advance `state` in place by one step
    pub fn push(&self, state: &mut OscillatorState, params: &OscillatorParams) {
        *state = self.kind.step(state, params, self.dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use proptest::prelude::*;

    fn run(kind: IntegratorKind, params: OscillatorParams, dt: f64, steps: usize) -> Vec<OscillatorState> {
        let integrator = Integrator::new(kind, dt).unwrap();
        let mut state = OscillatorState::at_rest(Vector3::new(0.0, 1.0, 0.0));
        let mut states = vec![state];
        for _ in 0..steps {
            integrator.push(&mut state, &params);
            states.push(state);
        }
        states
    }

    fn extrema(values: &[f64]) -> Vec<f64> {
        values
            .windows(3)
            .filter(|w| (w[1] > w[0] && w[1] >= w[2]) || (w[1] < w[0] && w[1] <= w[2]))
            .map(|w| w[1])
            .collect()
    }

    #[test]
    fn forward_euler_uses_pre_step_momentum() {
        let params = OscillatorParams::new(2.0, 3.0);
        let state = OscillatorState::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(4.0, 0.0, 0.0));
        let next = IntegratorKind::ForwardEuler.step(&state, &params, 0.5);
        assert_relative_eq!(next.momentum.x, 4.0 - 0.5 * 3.0 * 1.0);
        assert_relative_eq!(next.position.x, 1.0 + 0.5 * 4.0 / 2.0);
    }

    #[test]
    fn backward_euler_satisfies_implicit_equations() {
        let params = OscillatorParams::new(2.0, 3.0);
        let dt = 0.25;
        let state = OscillatorState::new(Vector3::new(1.0, -0.5, 0.0), Vector3::new(0.3, 2.0, 0.0));
        let next = IntegratorKind::BackwardEuler.step(&state, &params, dt);

        // x' = x + h p' / m and p' = p - h k x'
        let x_residual = next.position - (state.position + next.momentum * dt / params.mass);
        let p_residual = next.momentum - (state.momentum - next.position * (dt * params.spring_constant));
        assert!(x_residual.norm() < 1e-14);
        assert!(p_residual.norm() < 1e-14);
    }

    #[test]
    fn leapfrog_uses_updated_position() {
        let params = OscillatorParams::new(1.0, 1.0);
        let state = OscillatorState::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let next = IntegratorKind::Leapfrog.step(&state, &params, 0.1);
        assert_eq!(next.position.x, 0.1);
        assert_eq!(next.momentum.x, 0.99);
    }

    #[test]
    fn leapfrog_energy_stays_bounded() {
        let params = OscillatorParams::new(1.0, 1.0);
        let states = run(IntegratorKind::Leapfrog, params, 0.01, 1000);
        let e0 = states[0].energy(&params);
        let max_drift = states
            .iter()
            .map(|s| (s.energy(&params) - e0).abs() / e0)
            .fold(0.0_f64, f64::max);
        assert!(max_drift < 0.02, "leapfrog energy drift {max_drift}");

        // |p| <= sqrt(2 m E) with the same slack
        let bound = (2.0 * params.mass * e0 * 1.02).sqrt();
        assert!(states.iter().all(|s| s.momentum.norm() <= bound));
    }

    #[test]
    fn backward_euler_energy_never_increases() {
        let params = OscillatorParams::new(1.0, 1.0);
        let states = run(IntegratorKind::BackwardEuler, params, 0.01, 1000);
        let energies: Vec<f64> = states.iter().map(|s| s.energy(&params)).collect();
        assert!(energies.windows(2).all(|w| w[1] <= w[0]));

        let bound = (2.0 * params.mass * energies[0]).sqrt();
        assert!(states.iter().all(|s| s.momentum.norm() <= bound));
    }

    #[test]
    fn forward_euler_amplitude_grows_every_half_cycle() {
        let params = OscillatorParams::new(1.0, 1.0);
        let states = run(IntegratorKind::ForwardEuler, params, 0.01, 1000);

        let energies: Vec<f64> = states.iter().map(|s| s.energy(&params)).collect();
        assert!(energies.windows(2).all(|w| w[1] > w[0]));

        let positions: Vec<f64> = states.iter().map(|s| s.position.y).collect();
        let amplitudes: Vec<f64> = extrema(&positions).iter().map(|v| v.abs()).collect();
        assert!(amplitudes.len() >= 3, "expected several half cycles, got {amplitudes:?}");
        assert!(amplitudes.windows(2).all(|w| w[1] > w[0]), "{amplitudes:?}");
        assert!(amplitudes[0] > 1.0);

        let swings: Vec<f64> = extrema(&positions).windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        assert!(swings.windows(2).all(|w| w[1] > w[0]), "{swings:?}");
    }

    #[test]
    fn integrators_are_deterministic() {
        let params = OscillatorParams::new(0.7, 2.3);
        for kind in IntegratorKind::ALL {
            assert_eq!(run(kind, params, 0.03, 200), run(kind, params, 0.03, 200));
        }
    }

    #[test]
    fn integrator_rejects_bad_step() {
        assert!(Integrator::new(IntegratorKind::Leapfrog, 0.0).is_err());
        assert!(Integrator::new(IntegratorKind::Leapfrog, -0.1).is_err());
        assert!(Integrator::new(IntegratorKind::Leapfrog, f64::NAN).is_err());
    }

    #[test]
    fn names_round_trip_through_parsing() {
        for kind in IntegratorKind::ALL {
            assert_eq!(kind.name().parse::<IntegratorKind>().unwrap(), kind);
        }
        assert_eq!("backward-euler".parse::<IntegratorKind>().unwrap(), IntegratorKind::BackwardEuler);
        assert_eq!("LEAPFROG".parse::<IntegratorKind>().unwrap(), IntegratorKind::Leapfrog);
        assert!("runge_kutta".parse::<IntegratorKind>().is_err());
    }

    proptest! {
        #[test]
        fn zero_spring_constant_is_free_motion(
            x in prop::array::uniform3(-1.0e3..1.0e3_f64),
            p in prop::array::uniform3(-1.0e3..1.0e3_f64),
            mass in 1.0e-3..1.0e3_f64,
            dt in 1.0e-4..1.0_f64,
        ) {
            let params = OscillatorParams::new(mass, 0.0);
            let state = OscillatorState::new(Vector3::from(x), Vector3::from(p));
            let expected = state.position + state.momentum * dt / mass;

            for kind in IntegratorKind::ALL {
                let next = kind.step(&state, &params, dt);
                prop_assert_eq!(next.momentum, state.momentum);
                prop_assert_eq!(next.position, expected);
            }
        }
    }
}
