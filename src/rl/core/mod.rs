//! Core RL Components
//!
//! Action space and observation definitions shared by the environment and
//! the trainer.

pub mod action;
pub mod observation;

pub use action::{TradeAction, NUM_ACTIONS};
pub use observation::{ActionSpace, Observation, ObservationSpace, OBSERVATION_DIM};
