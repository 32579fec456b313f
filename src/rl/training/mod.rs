//! Training Infrastructure
//!
//! Training loop, checkpointing, and evaluation utilities.

pub mod checkpointing;
pub mod evaluation;
pub mod trainer;

pub use checkpointing::{iteration_name, timestamped_name, Checkpointer};
pub use evaluation::{evaluate, evaluate_with, EvaluationReport};
pub use trainer::{EpisodeResult, PolicyCheckpoint, PolicyTrainer, TrainingResult};
