//! Trading Environment for RL Training
//!
//! Replays a historical bar series one step at a time. The agent trades a
//! single share per step at the close of the current bar; the reward is the
//! change in mark-to-market portfolio value.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EnvFactory, Environment, ResetOptions};
use crate::domain::MarketDataset;
use crate::error::{Result, TraderError};
use crate::rl::core::{
    ActionSpace, Observation, ObservationSpace, TradeAction, NUM_ACTIONS, OBSERVATION_DIM,
};

/// Default starting cash
pub const DEFAULT_INITIAL_BALANCE: f64 = 10_000.0;

/// Trading environment configuration
#[derive(Debug, Clone)]
pub struct TradingEnvConfig {
    dataset: MarketDataset,
    initial_balance: f64,
}

impl TradingEnvConfig {
    /// Create a configuration with the default initial balance
    pub fn new(dataset: MarketDataset) -> Self {
        Self {
            dataset,
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }

    /// Create a configuration with an explicit initial balance.
    ///
    /// The balance must be finite and strictly positive.
    pub fn with_initial_balance(dataset: MarketDataset, initial_balance: f64) -> Result<Self> {
        if !initial_balance.is_finite() || initial_balance <= 0.0 {
            return Err(TraderError::InvalidConfig(format!(
                "initial_balance must be positive, got {}",
                initial_balance
            )));
        }

        Ok(Self {
            dataset,
            initial_balance,
        })
    }

    pub fn dataset(&self) -> &MarketDataset {
        &self.dataset
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }
}

/// Per-episode mutable state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub current_step: usize,
    pub balance: f64,
    pub shares_held: u64,
    pub total_portfolio_value: f64,
}

impl EpisodeState {
    fn initial(initial_balance: f64) -> Self {
        Self {
            current_step: 0,
            balance: initial_balance,
            shares_held: 0,
            total_portfolio_value: initial_balance,
        }
    }
}

/// Auxiliary information returned with every reset and step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Mark-to-market value after the transition
    pub total_portfolio_value: f64,
}

/// Result of taking a step in the environment
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Observation at the new step
    pub observation: Observation,
    /// Change in portfolio value caused by this step
    pub reward: f64,
    /// Whether the episode reached its last tradable step
    pub terminated: bool,
    /// Always false; there is no external time limit
    pub truncated: bool,
    /// Additional info
    pub info: StepInfo,
}

impl StepResult {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Where `render` sends its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Plain text on stdout
    #[default]
    Human,
    /// One structured `tracing` event
    Log,
}

/// Trading environment for RL training
#[derive(Debug, Clone)]
pub struct TradingEnvironment {
    config: TradingEnvConfig,
    state: EpisodeState,
    seed: Option<u64>,
}

impl TradingEnvironment {
    /// Create a new trading environment, ready for its first episode
    pub fn new(config: TradingEnvConfig) -> Self {
        let state = EpisodeState::initial(config.initial_balance);
        Self {
            config,
            state,
            seed: None,
        }
    }

    /// Factory that builds a fresh environment per call, sharing the dataset
    pub fn factory(config: TradingEnvConfig) -> EnvFactory<TradingEnvironment> {
        EnvFactory::new(move || Ok(TradingEnvironment::new(config.clone())))
    }

    /// Reset the environment for a new episode
    pub fn reset(
        &mut self,
        seed: Option<u64>,
        _options: Option<&ResetOptions>,
    ) -> (Observation, StepInfo) {
        if seed.is_some() {
            self.seed = seed;
        }
        self.state = EpisodeState::initial(self.config.initial_balance);

        (self.observation(), self.info())
    }

    /// Take a step with a raw action index
    pub fn step(&mut self, action: usize) -> Result<StepResult> {
        let action = TradeAction::try_from(action)?;
        self.step_action(action)
    }

    /// Take a step with a typed action
    pub fn step_action(&mut self, action: TradeAction) -> Result<StepResult> {
        if self.is_terminal() {
            return Err(TraderError::EpisodeTerminated {
                step: self.state.current_step,
            });
        }

        let price = self.current_price();
        let state = &mut self.state;

        match action {
            TradeAction::Hold => {}
            TradeAction::Buy => {
                if state.balance >= price {
                    state.balance -= price;
                    state.shares_held += 1;
                }
            }
            TradeAction::Sell => {
                if state.shares_held > 0 {
                    state.balance += price;
                    state.shares_held -= 1;
                }
            }
        }

        let new_total_value = state.balance + state.shares_held as f64 * price;
        let reward = new_total_value - state.total_portfolio_value;
        state.total_portfolio_value = new_total_value;
        state.current_step += 1;

        let terminated = self.is_terminal();

        debug!(
            step = self.state.current_step,
            action = %action,
            price,
            reward,
            terminated,
            "env step"
        );

        Ok(StepResult {
            observation: self.observation(),
            reward,
            terminated,
            truncated: false,
            info: self.info(),
        })
    }

    /// Whether the current episode has reached its last tradable step.
    ///
    /// The final bar is never traded against; it only supplies the price in
    /// the last observation.
    pub fn is_terminal(&self) -> bool {
        self.state.current_step >= self.max_steps()
    }

    /// Steps in one full episode (`len(dataset) - 1`)
    pub fn max_steps(&self) -> usize {
        self.config.dataset.len() - 1
    }

    /// Close price at the current step
    pub fn current_price(&self) -> f64 {
        self.config.dataset.price_at(self.state.current_step)
    }

    fn observation(&self) -> Observation {
        Observation::new(
            self.state.balance,
            self.state.shares_held,
            self.current_price(),
        )
    }

    fn info(&self) -> StepInfo {
        StepInfo {
            total_portfolio_value: self.state.total_portfolio_value,
        }
    }

    /// Dump the current state for diagnostics
    pub fn render(&self, mode: RenderMode) -> io::Result<()> {
        match mode {
            RenderMode::Human => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                self.render_to(&mut out)
            }
            RenderMode::Log => {
                info!(
                    step = self.state.current_step,
                    balance = self.state.balance,
                    shares_held = self.state.shares_held,
                    total_value = self.state.total_portfolio_value,
                    price = self.current_price(),
                    "env state"
                );
                Ok(())
            }
        }
    }

    /// Write the human-readable state dump to any sink
    pub fn render_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Step: {}", self.state.current_step)?;
        writeln!(out, "Balance: {:.2}", self.state.balance)?;
        writeln!(out, "Shares held: {}", self.state.shares_held)?;
        writeln!(out, "Total Value: {:.2}", self.state.total_portfolio_value)?;
        writeln!(out, "Current Price: {:.2}", self.current_price())
    }

    /// Current episode state
    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    pub fn config(&self) -> &TradingEnvConfig {
        &self.config
    }

    /// Seed passed to the most recent seeded reset
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Get observation dimension
    pub fn observation_dim(&self) -> usize {
        OBSERVATION_DIM
    }

    /// Get action dimension
    pub fn action_dim(&self) -> usize {
        NUM_ACTIONS
    }
}

impl Environment for TradingEnvironment {
    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&ResetOptions>,
    ) -> (Observation, StepInfo) {
        TradingEnvironment::reset(self, seed, options)
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        TradingEnvironment::step(self, action)
    }

    fn is_terminal(&self) -> bool {
        TradingEnvironment::is_terminal(self)
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: NUM_ACTIONS }
    }

    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::non_negative(OBSERVATION_DIM)
    }
}
