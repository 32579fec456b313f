//! Observation and space metadata
//!
//! The environment observes `[balance, shares_held, price]`. Space metadata
//! lets a driver size its policy without knowing the environment type.

use serde::{Deserialize, Serialize};

/// Dimension of the observation vector
pub const OBSERVATION_DIM: usize = 3;

/// What the agent sees after a reset or a step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Cash balance
    pub balance: f64,
    /// Shares currently held
    pub shares_held: f64,
    /// Close price at the environment's current step
    pub price: f64,
}

impl Observation {
    pub fn new(balance: f64, shares_held: u64, price: f64) -> Self {
        Self {
            balance,
            shares_held: shares_held as f64,
            price,
        }
    }

    /// Fixed-length numeric form, as fed to a policy
    pub fn to_array(&self) -> [f32; OBSERVATION_DIM] {
        [self.balance as f32, self.shares_held as f32, self.price as f32]
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }
}

/// Action space description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpace {
    /// `n` mutually exclusive choices indexed `0..n`
    Discrete { n: usize },
}

impl ActionSpace {
    pub fn n(&self) -> usize {
        match self {
            ActionSpace::Discrete { n } => *n,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.n()
    }
}

/// Box-shaped observation space with per-component bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl ObservationSpace {
    /// Non-negative, unbounded above
    pub fn non_negative(dim: usize) -> Self {
        Self {
            low: vec![0.0; dim],
            high: vec![f32::INFINITY; dim],
        }
    }

    pub fn shape(&self) -> [usize; 1] {
        [self.low.len()]
    }

    /// Check that a vector lies inside the bounds
    pub fn contains(&self, obs: &[f32]) -> bool {
        obs.len() == self.low.len()
            && obs
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }
}
