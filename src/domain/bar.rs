use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{Result, TraderError};

/// One OHLCV bar at a single step of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    /// Position of the bar in the dataset (contiguous from 0)
    pub step_index: usize,
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Transaction and mark price used by the environment
    pub close: f64,
    pub volume: f64,
}

impl MarketBar {
    /// Check that every price/volume field is finite and non-negative
    fn validate(&self) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];

        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(TraderError::InvalidMarketData(format!(
                    "bar {} has invalid {}: {}",
                    self.step_index, name, value
                )));
            }
        }

        Ok(())
    }
}

/// Ordered, non-empty, read-only sequence of bars.
///
/// Cloning is cheap: every clone shares the same backing storage, so one
/// loaded dataset can feed any number of environment instances.
#[derive(Debug, Clone)]
pub struct MarketDataset {
    bars: Arc<[MarketBar]>,
}

impl MarketDataset {
    /// Build a dataset, checking that it is non-empty, that step indices run
    /// 0..n without gaps or duplicates, and that all values are non-negative.
    pub fn new(bars: Vec<MarketBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(TraderError::InvalidConfig(
                "dataset must contain at least one bar".to_string(),
            ));
        }

        for (expected, bar) in bars.iter().enumerate() {
            if bar.step_index != expected {
                return Err(TraderError::InvalidMarketData(format!(
                    "expected step index {} but found {}",
                    expected, bar.step_index
                )));
            }
            bar.validate()?;
        }

        Ok(Self { bars: bars.into() })
    }

    /// Build a dataset from rows already in time order, assigning step
    /// indices by position.
    pub fn from_ordered(mut bars: Vec<MarketBar>) -> Result<Self> {
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.step_index = i;
        }
        Self::new(bars)
    }

    /// Close price of bar `step`
    ///
    /// Panics if `step` is out of range; the environment never asks for a
    /// step past `len() - 1`.
    pub fn price_at(&self, step: usize) -> f64 {
        self.bars[step].close
    }

    pub fn first(&self) -> &MarketBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &MarketBar {
        &self.bars[self.bars.len() - 1]
    }

    /// Lowest and highest close in the dataset
    pub fn close_range(&self) -> (f64, f64) {
        self.bars
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), bar| {
                (lo.min(bar.close), hi.max(bar.close))
            })
    }

    pub fn bars(&self) -> &[MarketBar] {
        &self.bars
    }
}

impl Deref for MarketDataset {
    type Target = [MarketBar];

    fn deref(&self) -> &Self::Target {
        &self.bars
    }
}

/// Build a dataset from close prices only (open/high/low set to the close,
/// zero volume, one-minute spacing). Used by tests and demos.
pub fn dataset_from_closes(closes: &[f64]) -> Result<MarketDataset> {
    let start = DateTime::<Utc>::default();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| MarketBar {
            step_index: i,
            timestamp: start + chrono::Duration::minutes(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        })
        .collect();

    MarketDataset::new(bars)
}
