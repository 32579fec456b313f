//! Reinforcement Learning Module
//!
//! A single-asset trading environment over historical bars, together with an
//! on-policy PPO trainer that drives it.
//!
//! # Layout
//!
//! - **core**: observation vector, action and space descriptions
//! - **environment**: the trading state machine and the factory used to build it
//! - **memory**: rollout storage with GAE
//! - **algorithms**: linear actor-critic policy and the PPO update
//! - **training**: training loop, evaluation, and checkpoints

pub mod algorithms;
pub mod config;
pub mod core;
pub mod environment;
pub mod memory;
pub mod training;

pub use config::{PPOConfig, RLConfig, TrainingConfig};

pub use core::{ActionSpace, Observation, ObservationSpace, TradeAction, NUM_ACTIONS, OBSERVATION_DIM};

pub use environment::{
    EnvFactory, Environment, StepInfo, StepResult, TradingEnvConfig, TradingEnvironment,
};

pub use training::{Checkpointer, EvaluationReport, PolicyTrainer, TrainingResult};
