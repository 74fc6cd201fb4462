//! Parameter sampler for uncertain spring constant and mass
//!
//! Each parameter is drawn independently from `Normal(mean, sd)`. The random
//! stream is owned by the sampler, so two samplers built from the same seed
//! produce the same sequence of draws.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::params::OscillatorParams;

/// One draw of the uncertain parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSample {
    pub spring_constant: f64,
    pub mass: f64,
}

impl ParameterSample {
    pub fn params(&self) -> OscillatorParams {
        OscillatorParams::new(self.mass, self.spring_constant)
    }

    /// Describe the first parameter outside its physical domain, if any.
    ///
    /// Anomalous samples are reported as drawn; nothing is clamped or redrawn.
    pub fn anomaly(&self) -> Option<Error> {
        if self.mass.is_nan() || self.mass <= 0.0 {
            return Some(Error::SamplingAnomaly {
                parameter: "mass",
                value: self.mass,
            });
        }
        if self.spring_constant.is_nan() || self.spring_constant < 0.0 {
            return Some(Error::SamplingAnomaly {
                parameter: "spring_constant",
                value: self.spring_constant,
            });
        }
        None
    }
}

/// Mean and standard deviation of one normally distributed parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub sd: f64,
}

impl Spread {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    /// Fixed value, no uncertainty
    pub fn exact(mean: f64) -> Self {
        Self::new(mean, 0.0)
    }

    /// `None` for a point mass, otherwise the distribution to draw from
    fn distribution(&self, name: &str) -> Result<Option<Normal<f64>>> {
        if !self.mean.is_finite() {
            return Err(Error::invalid(format!("mean of {name} must be finite")));
        }
        if !self.sd.is_finite() || self.sd < 0.0 {
            return Err(Error::invalid(format!(
                "standard deviation of {name} must be finite and >= 0, got {}",
                self.sd
            )));
        }
        if self.sd == 0.0 {
            return Ok(None);
        }
        Normal::new(self.mean, self.sd).map(Some).map_err(|e| {
            Error::invalid(format!("standard deviation of {name} ({}): {e}", self.sd))
        })
    }

    fn draw<R: Rng + ?Sized>(&self, dist: Option<&Normal<f64>>, rng: &mut R) -> f64 {
        match dist {
            Some(dist) => dist.sample(rng),
            None => self.mean,
        }
    }
}

/// Draws `(spring_constant, mass)` pairs from an owned random stream
#[derive(Debug, Clone)]
pub struct ParameterSampler {
    spring_constant: Spread,
    mass: Spread,
    spring_dist: Option<Normal<f64>>,
    mass_dist: Option<Normal<f64>>,
    rng: StdRng,
}

impl ParameterSampler {
    /// Build a sampler drawing from `rng`
    pub fn new(spring_constant: Spread, mass: Spread, rng: StdRng) -> Result<Self> {
        Ok(Self {
            spring_dist: spring_constant.distribution("spring_constant")?,
            mass_dist: mass.distribution("mass")?,
            spring_constant,
            mass,
            rng,
        })
    }

    /// Reproducible sampler
    pub fn seeded(spring_constant: Spread, mass: Spread, seed: u64) -> Result<Self> {
        Self::new(spring_constant, mass, StdRng::seed_from_u64(seed))
    }

    /// Sampler seeded from the operating system's entropy source
    pub fn from_entropy(spring_constant: Spread, mass: Spread) -> Result<Self> {
        Self::new(spring_constant, mass, StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, entropy-backed otherwise
    pub fn with_optional_seed(spring_constant: Spread, mass: Spread, seed: Option<u64>) -> Result<Self> {
        match seed {
            Some(seed) => Self::seeded(spring_constant, mass, seed),
            None => Self::from_entropy(spring_constant, mass),
        }
    }

    pub fn spring_constant(&self) -> Spread {
        self.spring_constant
    }

    pub fn mass(&self) -> Spread {
        self.mass
    }

    /// Draw the next pair. The spring constant is drawn before the mass.
    ///
    /// A zero standard deviation returns the mean exactly and consumes no
    /// randomness.
    pub fn sample(&mut self) -> ParameterSample {
        let spring_constant = self
            .spring_constant
            .draw(self.spring_dist.as_ref(), &mut self.rng);
        let mass = self.mass.draw(self.mass_dist.as_ref(), &mut self.rng);

        let sample = ParameterSample {
            spring_constant,
            mass,
        };
        if let Some(anomaly) = sample.anomaly() {
            warn!("{anomaly}");
        }
        sample
    }
}

/// One-shot draw from the given means and deviations using `rng`
pub fn sample<R: Rng + ?Sized>(
    mean_k: f64,
    mean_m: f64,
    sd_k: f64,
    sd_m: f64,
    rng: &mut R,
) -> Result<ParameterSample> {
    let k = Spread::new(mean_k, sd_k);
    let m = Spread::new(mean_m, sd_m);
    let k_dist = k.distribution("spring_constant")?;
    let m_dist = m.distribution("mass")?;

    let drawn = ParameterSample {
        spring_constant: k.draw(k_dist.as_ref(), rng),
        mass: m.draw(m_dist.as_ref(), rng),
    };
    if let Some(anomaly) = drawn.anomaly() {
        warn!("{anomaly}");
    }
    Ok(drawn)
}
