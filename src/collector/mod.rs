//! Market data collection
//!
//! Loads historical OHLCV bars into memory for training and evaluation.

pub mod ohlcv_loader;

pub use ohlcv_loader::{load_dataset, BarSource};
