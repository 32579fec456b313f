//! Experience Memory
//!
//! Rollout storage for on-policy training.

pub mod rollout_buffer;

pub use rollout_buffer::{Estimate, RolloutBuffer, Sample, Transition};
