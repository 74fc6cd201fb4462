//! spring-uq - uncertainty propagation for a block on a spring
//!
//! Fixed-step integrators (Forward Euler, Backward Euler, Leapfrog) advance a
//! damped-free harmonic oscillator, and a Monte Carlo driver samples the
//! spring constant and mass to characterise the distribution of peak
//! momentum over a fixed horizon.

pub mod block;
pub mod config;
pub mod error;
pub mod histogram;
pub mod integrator;
pub mod monte_carlo;
pub mod params;
pub mod sampler;
pub mod sim;
pub mod state;

// Re-export main types
pub use block::BlockOnSpring;
pub use config::{Config, MonteCarloConfig, SimulationConfig};
pub use error::{Error, Result};
pub use histogram::Histogram;
pub use integrator::{Integrator, IntegratorKind};
pub use monte_carlo::{
    run_monte_carlo, MonteCarloDriver, MonteCarloResult, MonteCarloRun, MonteCarloSummary,
    RunOutcome,
};
pub use params::{OscillatorParams, TimeGrid};
pub use sampler::{ParameterSample, ParameterSampler, Spread};
pub use sim::{max_momentum, Trajectory, TrajectorySample};
pub use state::OscillatorState;
