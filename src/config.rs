//! Configuration surface for single runs and sweeps
//!
//! Loaded from `.json` or `.toml`; every field has a default, so a file only
//! needs the values it changes.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::block::BlockOnSpring;
use crate::error::{Error, Result};
use crate::histogram::DEFAULT_BINS;
use crate::integrator::IntegratorKind;
use crate::monte_carlo::{MonteCarloDriver, DEFAULT_MONTE_CARLO_RUNS};
use crate::params::{OscillatorParams, TimeGrid};
use crate::sampler::{ParameterSampler, Spread};
use crate::sim::{self, Trajectory};

/// Time grid, physical constants, initial state and integrator of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub start_time: f64,
    pub end_time: f64,
    pub num_steps: usize,
    pub mass: f64,
    pub spring_constant: f64,
    pub x0: [f64; 3],
    pub p0: [f64; 3],
    pub integrator: IntegratorKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 12.0,
            num_steps: 1200,
            mass: 1.0,
            spring_constant: 1.0,
            x0: [1.0, 0.0, 0.0],
            p0: [0.0, 0.0, 0.0],
            integrator: IntegratorKind::Leapfrog,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        self.time_grid().validate()?;
        self.params().validate()?;
        if self.x0.iter().chain(&self.p0).any(|v| !v.is_finite()) {
            return Err(Error::invalid("x0 and p0 must be finite"));
        }
        Ok(())
    }

    pub fn time_grid(&self) -> TimeGrid {
        TimeGrid::new(self.start_time, self.end_time, self.num_steps)
    }

    pub fn params(&self) -> OscillatorParams {
        OscillatorParams::new(self.mass, self.spring_constant)
    }

    pub fn x0(&self) -> Vector3<f64> {
        Vector3::from(self.x0)
    }

    pub fn p0(&self) -> Vector3<f64> {
        Vector3::from(self.p0)
    }

    pub fn block(&self) -> BlockOnSpring {
        BlockOnSpring::new(self.params(), self.integrator, self.x0()).with_initial_momentum(self.p0())
    }

    /// Run the configured deterministic simulation
    pub fn run(&self) -> Result<Trajectory> {
        sim::run_block(&self.time_grid(), self.block())
    }
}

/// Sampling, sweep size and histogram settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub runs: usize,
    pub mean_spring_constant: f64,
    pub mean_mass: f64,
    pub sd_spring_constant: f64,
    pub sd_mass: f64,
    /// `None` seeds from OS entropy
    pub seed: Option<u64>,
    pub histogram_bins: usize,
    /// `[min, max]`; the data range is used when absent
    pub histogram_range: Option<[f64; 2]>,
    pub momentum_axis: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            runs: DEFAULT_MONTE_CARLO_RUNS,
            mean_spring_constant: 3.0,
            mean_mass: 1.0,
            sd_spring_constant: 0.05,
            sd_mass: 0.05,
            seed: None,
            histogram_bins: DEFAULT_BINS,
            histogram_range: None,
            momentum_axis: 0,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<()> {
        if self.histogram_bins == 0 {
            return Err(Error::invalid("histogram_bins must be greater than zero"));
        }
        if self.momentum_axis > 2 {
            return Err(Error::invalid("momentum_axis must be 0, 1 or 2"));
        }
        for (name, sd) in [
            ("sd_spring_constant", self.sd_spring_constant),
            ("sd_mass", self.sd_mass),
        ] {
            if !sd.is_finite() || sd < 0.0 {
                return Err(Error::invalid(format!("{name} must be finite and >= 0")));
            }
        }
        if !self.mean_spring_constant.is_finite() || !self.mean_mass.is_finite() {
            return Err(Error::invalid("parameter means must be finite"));
        }
        if let Some([min, max]) = self.histogram_range {
            if !min.is_finite() || !max.is_finite() || max <= min {
                return Err(Error::invalid(
                    "histogram_range must be finite with max greater than min",
                ));
            }
        }
        Ok(())
    }

    pub fn spring_constant(&self) -> Spread {
        Spread::new(self.mean_spring_constant, self.sd_spring_constant)
    }

    pub fn mass(&self) -> Spread {
        Spread::new(self.mean_mass, self.sd_mass)
    }

    pub fn histogram_range(&self) -> Option<(f64, f64)> {
        self.histogram_range.map(|[min, max]| (min, max))
    }

    pub fn sampler(&self) -> Result<ParameterSampler> {
        ParameterSampler::with_optional_seed(self.spring_constant(), self.mass(), self.seed)
    }
}

/// Complete configuration surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub monte_carlo: MonteCarloConfig,
}

impl Config {
    /// Load from a `.json` or `.toml` file. Missing fields take their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            Some("toml") => toml::from_str(&raw)?,
            _ => {
                return Err(Error::invalid(format!(
                    "unsupported config format: {} (expected .json or .toml)",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.monte_carlo.validate()
    }

    /// Sweep driver using the simulation grid, integrator and initial state
    pub fn driver(&self) -> Result<MonteCarloDriver> {
        self.validate()?;
        let sim = &self.simulation;
        MonteCarloDriver::new(sim.time_grid(), sim.integrator, sim.x0(), self.monte_carlo.sampler()?)?
            .with_initial_momentum(sim.p0())?
            .with_momentum_axis(self.monte_carlo.momentum_axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.simulation.integrator, IntegratorKind::Leapfrog);
        assert_eq!(config.monte_carlo.histogram_bins, 50);
        assert_eq!(config.monte_carlo.runs, 1000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let raw = r#"{
            "simulation": { "integrator": "BackwardEuler", "num_steps": 100, "end_time": 10 },
            "monte_carlo": { "runs": 5, "seed": 42, "histogram_range": [0.0, 3.0] }
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.simulation.integrator, IntegratorKind::BackwardEuler);
        assert_eq!(config.simulation.num_steps, 100);
        assert_eq!(config.simulation.mass, 1.0);
        assert_eq!(config.monte_carlo.seed, Some(42));
        assert_eq!(config.monte_carlo.histogram_range(), Some((0.0, 3.0)));
        assert_eq!(config.monte_carlo.sd_mass, 0.05);
    }

    #[test]
    fn toml_sections_parse() {
        let raw = r#"
            [simulation]
            integrator = "forward-euler"
            x0 = [0.0, 1.0, 0.0]

            [monte_carlo]
            runs = 3
            mean_spring_constant = 2.0
            sd_spring_constant = 0.0
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.simulation.integrator, IntegratorKind::ForwardEuler);
        assert_eq!(config.simulation.x0(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(config.monte_carlo.spring_constant(), Spread::exact(2.0));
    }

    #[test]
    fn unknown_integrator_is_a_parse_error() {
        let raw = r#"{ "simulation": { "integrator": "RK4" } }"#;
        assert!(serde_json::from_str::<Config>(raw).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = Config::default();
        config.simulation.mass = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.num_steps = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monte_carlo.histogram_range = Some([1.0, 1.0]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monte_carlo.sd_mass = -1.0;
        assert!(config.driver().is_err());
    }

    #[test]
    fn simulation_config_runs_one_trajectory() {
        let config = SimulationConfig {
            num_steps: 10,
            end_time: 1.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.run().unwrap().len(), 11);
    }
}
