//! Action Space
//!
//! The three-way discrete action space of the trading environment.

use serde::{Deserialize, Serialize};

use crate::error::TraderError;

/// Number of discrete actions
pub const NUM_ACTIONS: usize = 3;

/// Discrete trading action, one share at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradeAction {
    /// Do nothing
    #[default]
    Hold = 0,
    /// Buy one share at the current close
    Buy = 1,
    /// Sell one share at the current close
    Sell = 2,
}

impl TradeAction {
    /// Convert from action index
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Hold),
            1 => Some(Self::Buy),
            2 => Some(Self::Sell),
            _ => None,
        }
    }

    /// Convert to action index
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Get all possible actions
    pub fn all() -> &'static [TradeAction] {
        &[Self::Hold, Self::Buy, Self::Sell]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "HOLD",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl TryFrom<usize> for TradeAction {
    type Error = TraderError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or(TraderError::InvalidAction(index))
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
