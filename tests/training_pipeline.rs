use std::env::temp_dir;
use std::fs;

use rltrader::domain::dataset_from_closes;
use rltrader::error::Result;
use rltrader::rl::core::{ActionSpace, Observation, ObservationSpace};
use rltrader::rl::environment::{ResetOptions, StepInfo, StepResult};
use rltrader::rl::training::{
    evaluate, iteration_name, timestamped_name, Checkpointer, PolicyCheckpoint,
};
use rltrader::rl::{
    EnvFactory, Environment, PolicyTrainer, RLConfig, TradingEnvConfig, TradingEnvironment,
};

fn trending_factory() -> EnvFactory<TradingEnvironment> {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 * 2.0).collect();
    let dataset = dataset_from_closes(&closes).unwrap();
    TradingEnvironment::factory(TradingEnvConfig::with_initial_balance(dataset, 1000.0).unwrap())
}

fn config(seed: u64) -> RLConfig {
    let mut config = RLConfig::default();
    config.training.rollout_steps = 128;
    config.training.seed = Some(seed);
    config.ppo.lr = 0.05;
    config.ppo.batch_size = 32;
    config.ppo.n_epochs = 4;
    config.ppo.target_kl = None;
    config
}

#[test]
fn trainer_reports_consistent_totals() {
    let mut trainer = PolicyTrainer::new(config(3), trending_factory()).unwrap();

    let mut episodes = 0;
    for i in 1..=3 {
        let result = trainer.train().unwrap();
        episodes += result.episodes_this_iter;

        assert_eq!(result.iteration, i);
        assert_eq!(result.timesteps_this_iter, 128);
        assert_eq!(result.timesteps_total, 128 * i);
        assert_eq!(result.episodes_total, episodes);
        assert!(result.learner.policy_loss.is_finite());
        assert!(result.learner.entropy > 0.0);
    }

    let json = trainer.train().unwrap().pretty().unwrap();
    assert!(json.contains("\"episode_reward_mean\""));
    assert!(json.contains("\"policy_loss\""));
}

#[test]
fn seeded_runs_match() {
    let run = |seed| {
        let mut trainer = PolicyTrainer::new(config(seed), trending_factory()).unwrap();
        let results: Vec<_> = (0..2).map(|_| trainer.train().unwrap()).collect();
        (results, trainer.policy().clone())
    };

    assert_eq!(run(11), run(11));
    assert_ne!(run(11).1, run(12).1);
}

/// Holding any shares in a steadily rising market can only gain value.
#[test]
fn training_in_rising_market_is_profitable() {
    let factory = trending_factory();
    let mut trainer = PolicyTrainer::new(config(5), factory.clone()).unwrap();

    let mut last = None;
    for _ in 0..10 {
        last = Some(trainer.train().unwrap());
    }
    let last = last.unwrap();
    assert!(last.final_portfolio_value_mean.unwrap() > 1000.0);
    assert!(last.episode_reward_min.unwrap() >= 0.0);

    let report = evaluate(trainer.policy(), &factory).unwrap();
    assert_eq!(report.steps, 39);
    assert!(report.total_return_pct >= 0.0, "{:?}", report);
}

#[test]
fn checkpoint_round_trip_preserves_policy() {
    let dir = temp_dir().join(format!("rltrader_pipeline_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let factory = trending_factory();
    let mut trainer = PolicyTrainer::new(config(8), factory.clone()).unwrap();
    trainer.train().unwrap();
    trainer.stop();

    let checkpointer = Checkpointer::new(&dir, 2).unwrap();
    checkpointer.save(&trainer.checkpoint(), "ppo_it000001").unwrap();

    let restored: PolicyCheckpoint = checkpointer.load("ppo_it000001").unwrap();
    assert_eq!(&restored.policy, trainer.policy());
    assert_eq!(restored.iteration, 1);

    let before = evaluate(trainer.policy(), &factory).unwrap();
    let after = evaluate(&restored.policy, &factory).unwrap();
    assert_eq!(before, after);

    // Training resumes from the restored parameters
    let mut resumed =
        PolicyTrainer::from_policy(config(8), factory, restored.policy.clone()).unwrap();
    resumed.train().unwrap();

    let _ = fs::remove_dir_all(&dir);
}

/// A longer run saved after a shorter one must not be pruned or shadowed by
/// the older checkpoint whose name sorts later.
#[test]
fn second_run_checkpoint_is_latest() {
    let dir = temp_dir().join(format!("rltrader_two_runs_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let checkpointer = Checkpointer::new(&dir, 1).unwrap();

    let mut first = PolicyTrainer::new(config(21), trending_factory()).unwrap();
    for _ in 0..2 {
        first.train().unwrap();
    }
    first.stop();
    checkpointer
        .save(&first.checkpoint(), &iteration_name("ppo", first.iteration()))
        .unwrap();

    let mut second = PolicyTrainer::new(config(22), trending_factory()).unwrap();
    second.train().unwrap();
    second.stop();
    let name = timestamped_name(&iteration_name("ppo", second.iteration()));
    let path = checkpointer.save(&second.checkpoint(), &name).unwrap();

    assert!(path.exists());
    assert_eq!(checkpointer.list_checkpoints(), vec![name.clone()]);
    let latest: PolicyCheckpoint = checkpointer
        .load(&checkpointer.latest_checkpoint().unwrap())
        .unwrap();
    assert_eq!(latest.iteration, 1);
    assert_eq!(&latest.policy, second.policy());

    let _ = fs::remove_dir_all(&dir);
}

/// Two-state chain that rewards action 1; any `Environment` can be trained.
struct Chain {
    position: usize,
}

impl Environment for Chain {
    fn reset(&mut self, _seed: Option<u64>, _options: Option<&ResetOptions>) -> (Observation, StepInfo) {
        self.position = 0;
        (Observation::new(1.0, 0, 1.0), StepInfo::default())
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        self.position += 1;
        let terminated = self.position >= 5;
        Ok(StepResult {
            observation: Observation::new(1.0, self.position as u64, 1.0),
            reward: if action == 1 { 1.0 } else { 0.0 },
            terminated,
            truncated: false,
            info: StepInfo::default(),
        })
    }

    fn is_terminal(&self) -> bool {
        self.position >= 5
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: 2 }
    }

    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::non_negative(3)
    }
}

#[test]
fn trainer_accepts_any_environment_factory() {
    let factory = EnvFactory::new(|| Ok(Chain { position: 0 }));
    let mut trainer = PolicyTrainer::new(config(1), factory).unwrap();

    for _ in 0..20 {
        trainer.train().unwrap();
    }

    assert_eq!(trainer.policy().num_actions(), 2);
    assert_eq!(trainer.act(&[1.0, 0.0, 1.0], false), 1);
}
