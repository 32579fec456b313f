//! Training Loop
//!
//! Drives environments produced by an injected factory, collects on-policy
//! rollouts and applies PPO updates to a linear policy.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TraderError};
use crate::rl::algorithms::{LinearPolicy, PPOOutput, PPOTrainer};
use crate::rl::config::RLConfig;
use crate::rl::environment::{EnvFactory, Environment};
use crate::rl::memory::{RolloutBuffer, Transition};

/// Summary of one completed episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    /// Total reward for episode
    pub total_reward: f64,
    /// Episode length in steps
    pub length: usize,
    /// Portfolio value at the end of the episode
    pub final_portfolio_value: f64,
}

/// Statistics reported after each training iteration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub iteration: usize,
    pub timesteps_this_iter: usize,
    pub timesteps_total: usize,
    pub episodes_this_iter: usize,
    pub episodes_total: usize,
    /// `None` when no episode finished during the iteration
    pub episode_reward_mean: Option<f64>,
    pub episode_reward_min: Option<f64>,
    pub episode_reward_max: Option<f64>,
    pub episode_len_mean: Option<f64>,
    pub final_portfolio_value_mean: Option<f64>,
    /// Number of gradient steps applied this iteration
    pub num_updates: usize,
    #[serde(flatten)]
    pub learner: PPOOutput,
}

impl TrainingResult {
    /// Pretty JSON, for console output
    pub fn pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Serializable snapshot of a trained policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    pub iteration: usize,
    pub timesteps_total: usize,
    pub created_at: DateTime<Utc>,
    pub policy: LinearPolicy,
}

/// In-flight episode carried across iterations
struct ActiveEpisode<E> {
    env: E,
    observation: Vec<f32>,
    reward: f64,
    length: usize,
}

/// On-policy trainer driving environments from a factory
pub struct PolicyTrainer<E: Environment> {
    config: RLConfig,
    factory: EnvFactory<E>,
    policy: LinearPolicy,
    ppo: PPOTrainer,
    buffer: RolloutBuffer,
    rng: StdRng,
    active: Option<ActiveEpisode<E>>,
    iteration: usize,
    timesteps_total: usize,
    episodes_total: usize,
}

impl<E: Environment> PolicyTrainer<E> {
    /// Build a trainer, reading the spaces of one environment from the
    /// factory.
    pub fn new(config: RLConfig, factory: EnvFactory<E>) -> Result<Self> {
        let template = factory.make()?;
        let obs_dim = template.observation_space().shape()[0];
        let num_actions = template.action_space().n();
        let policy = LinearPolicy::new(obs_dim, num_actions);

        Self::from_policy(config, factory, policy)
    }

    /// Build a trainer that continues from an existing policy
    pub fn from_policy(
        config: RLConfig,
        factory: EnvFactory<E>,
        policy: LinearPolicy,
    ) -> Result<Self> {
        if let Err(errors) = config.validate() {
            return Err(TraderError::InvalidConfig(errors.join("; ")));
        }

        let rng = match config.training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            ppo: PPOTrainer::new(config.ppo.clone()),
            buffer: RolloutBuffer::new(config.training.rollout_steps),
            config,
            factory,
            policy,
            rng,
            active: None,
            iteration: 0,
            timesteps_total: 0,
            episodes_total: 0,
        })
    }

    /// Run one training iteration: collect a rollout, then update the policy
    pub fn train(&mut self) -> Result<TrainingResult> {
        let episodes = self.collect_rollout()?;
        let timesteps = self.buffer.len();

        let last_value = match (&self.active, self.buffer.transitions().last()) {
            (Some(active), Some(last)) if !last.done => {
                let features = self.policy.features(&active.observation);
                self.policy.value(&features)
            }
            _ => 0.0,
        };
        self.buffer.finish(
            self.config.ppo.gamma,
            self.config.ppo.gae_lambda,
            last_value,
        );

        let mut learner = PPOOutput::default();
        let mut num_updates = 0;
        'epochs: for epoch in 0..self.config.ppo.n_epochs {
            let minibatches = self
                .buffer
                .minibatches(self.config.ppo.batch_size, &mut self.rng);

            for batch in &minibatches {
                let output = self.ppo.train_step(&mut self.policy, batch);
                num_updates += 1;
                learner.accumulate(&output, num_updates);

                if self.ppo.should_stop_early(output.approx_kl) {
                    debug!(
                        epoch,
                        approx_kl = output.approx_kl,
                        "KL target exceeded, stopping update early"
                    );
                    break 'epochs;
                }
            }
        }
        self.buffer.clear();

        self.iteration += 1;
        self.timesteps_total += timesteps;
        self.episodes_total += episodes.len();

        let result = build_result(
            self.iteration,
            timesteps,
            self.timesteps_total,
            self.episodes_total,
            &episodes,
            num_updates,
            learner,
        );

        info!(
            iteration = result.iteration,
            timesteps_total = result.timesteps_total,
            episodes = result.episodes_this_iter,
            reward_mean = ?result.episode_reward_mean,
            policy_loss = result.learner.policy_loss,
            value_loss = result.learner.value_loss,
            "training iteration complete"
        );

        Ok(result)
    }

    /// Step environments until the rollout buffer is full
    fn collect_rollout(&mut self) -> Result<Vec<EpisodeResult>> {
        let mut finished = Vec::new();

        while !self.buffer.is_full() {
            let mut active = match self.active.take() {
                Some(active) => active,
                None => self.start_episode()?,
            };

            self.policy.observe(&active.observation);
            let features = self.policy.features(&active.observation);
            let (action, log_prob) = self.policy.sample(&features, &mut self.rng);
            let value = self.policy.value(&features);

            let result = active.env.step(action)?;
            let done = result.done();

            active.reward += result.reward;
            active.length += 1;
            self.buffer.push(Transition::new(
                features,
                action,
                result.reward as f32,
                done,
                log_prob,
                value,
            ));

            if done {
                finished.push(EpisodeResult {
                    total_reward: active.reward,
                    length: active.length,
                    final_portfolio_value: result.info.total_portfolio_value,
                });
                // Reuse the instance for the next episode
                let (observation, _) = active.env.reset(None, None);
                self.active = Some(ActiveEpisode {
                    env: active.env,
                    observation: observation.to_vec(),
                    reward: 0.0,
                    length: 0,
                });
            } else {
                active.observation = result.observation.to_vec();
                self.active = Some(active);
            }
        }

        Ok(finished)
    }

    fn start_episode(&mut self) -> Result<ActiveEpisode<E>> {
        let mut env = self.factory.make()?;
        let (observation, _) = env.reset(self.config.training.seed, None);

        if env.is_terminal() {
            return Err(TraderError::InvalidConfig(
                "environment is terminal right after reset; the dataset needs at least two bars"
                    .to_string(),
            ));
        }

        Ok(ActiveEpisode {
            env,
            observation: observation.to_vec(),
            reward: 0.0,
            length: 0,
        })
    }

    /// Choose an action for an observation without updating statistics
    pub fn act(&mut self, observation: &[f32], explore: bool) -> usize {
        let features = self.policy.features(observation);
        if explore {
            self.policy.sample(&features, &mut self.rng).0
        } else {
            self.policy.greedy(&features)
        }
    }

    /// Snapshot of the current policy for persistence
    pub fn checkpoint(&self) -> PolicyCheckpoint {
        PolicyCheckpoint {
            iteration: self.iteration,
            timesteps_total: self.timesteps_total,
            created_at: Utc::now(),
            policy: self.policy.clone(),
        }
    }

    /// Release the in-flight environment and any buffered experience
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            debug!("dropped in-flight episode");
        }
        if !self.buffer.is_empty() {
            warn!(
                transitions = self.buffer.len(),
                "discarding unused rollout data"
            );
            self.buffer.clear();
        }
    }

    pub fn policy(&self) -> &LinearPolicy {
        &self.policy
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn timesteps_total(&self) -> usize {
        self.timesteps_total
    }

    pub fn episodes_total(&self) -> usize {
        self.episodes_total
    }

    pub fn config(&self) -> &RLConfig {
        &self.config
    }
}

fn build_result(
    iteration: usize,
    timesteps_this_iter: usize,
    timesteps_total: usize,
    episodes_total: usize,
    episodes: &[EpisodeResult],
    num_updates: usize,
    learner: PPOOutput,
) -> TrainingResult {
    let mut result = TrainingResult {
        iteration,
        timesteps_this_iter,
        timesteps_total,
        episodes_this_iter: episodes.len(),
        episodes_total,
        num_updates,
        learner,
        ..Default::default()
    };

    if episodes.is_empty() {
        return result;
    }

    let n = episodes.len() as f64;
    let rewards = episodes.iter().map(|e| e.total_reward);

    result.episode_reward_mean = Some(rewards.clone().sum::<f64>() / n);
    result.episode_reward_min = rewards.clone().reduce(f64::min);
    result.episode_reward_max = rewards.reduce(f64::max);
    result.episode_len_mean = Some(episodes.iter().map(|e| e.length as f64).sum::<f64>() / n);
    result.final_portfolio_value_mean =
        Some(episodes.iter().map(|e| e.final_portfolio_value).sum::<f64>() / n);

    result
}
