//! RL Algorithms
//!
//! Policy representation and the PPO update rule.

pub mod policy;
pub mod ppo;

pub use policy::{FeatureNormalizer, LinearPolicy};
pub use ppo::{PPOOutput, PPOTrainer};
