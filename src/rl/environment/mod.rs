//! Trading Environment for RL Training
//!
//! This module provides a gym-like environment for training RL agents on
//! historical bar data, plus the `Environment` contract any driver can use.

mod trading;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::rl::core::{ActionSpace, Observation, ObservationSpace};

pub use trading::{
    EpisodeState, RenderMode, StepInfo, StepResult, TradingEnvConfig, TradingEnvironment,
    DEFAULT_INITIAL_BALANCE,
};

/// Options passed through `reset`; accepted for driver compatibility
pub type ResetOptions = serde_json::Map<String, serde_json::Value>;

/// Lifecycle contract between an environment and the driver stepping it
pub trait Environment {
    /// Start a new episode
    fn reset(&mut self, seed: Option<u64>, options: Option<&ResetOptions>)
        -> (Observation, StepInfo);

    /// Apply a raw action index and advance one step
    fn step(&mut self, action: usize) -> Result<StepResult>;

    /// Whether stepping is currently out of contract
    fn is_terminal(&self) -> bool;

    fn action_space(&self) -> ActionSpace;

    fn observation_space(&self) -> ObservationSpace;
}

/// Builds environment instances for a driver.
///
/// Each call yields an independent instance; whatever the closure captures
/// (typically a shared dataset) is reused across instances.
pub struct EnvFactory<E> {
    make: Arc<dyn Fn() -> Result<E> + Send + Sync>,
}

impl<E> EnvFactory<E> {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self {
            make: Arc::new(make),
        }
    }

    /// Build a new environment instance
    pub fn make(&self) -> Result<E> {
        (self.make)()
    }
}

impl<E> Clone for EnvFactory<E> {
    fn clone(&self) -> Self {
        Self {
            make: Arc::clone(&self.make),
        }
    }
}

impl<E> fmt::Debug for EnvFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvFactory").finish_non_exhaustive()
    }
}
