//! Error taxonomy for the oscillator core
//!
//! Every failure is terminal for the run it belongs to. Nothing in the core
//! retries.

use thiserror::Error;

use crate::sim::Trajectory;

/// Errors raised by configuration, integration and sampling
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any stepping takes place
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A step produced a non-finite position or momentum.
    ///
    /// `trajectory` holds every sample recorded up to and including the
    /// offending step.
    #[error("numerical divergence at step {step} (t = {time})")]
    NumericalDivergence {
        step: usize,
        time: f64,
        trajectory: Box<Trajectory>,
    },

    /// A sampled parameter fell outside its physical domain
    #[error("sampling anomaly: drew {parameter} = {value}")]
    SamplingAnomaly { parameter: &'static str, value: f64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// The partial trajectory carried by a divergence, if any
    pub fn partial_trajectory(&self) -> Option<&Trajectory> {
        match self {
            Self::NumericalDivergence { trajectory, .. } => Some(trajectory),
            _ => None,
        }
    }
}
