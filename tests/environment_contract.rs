use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rltrader::domain::dataset_from_closes;
use rltrader::error::TraderError;
use rltrader::rl::{Environment, TradeAction, TradingEnvConfig, TradingEnvironment};

fn env(closes: &[f64], balance: f64) -> TradingEnvironment {
    let dataset = dataset_from_closes(closes).expect("valid closes");
    let config = TradingEnvConfig::with_initial_balance(dataset, balance).expect("valid balance");
    TradingEnvironment::new(config)
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

/// Buy then sell over three bars, checking every observation and reward.
#[test]
fn worked_example_buy_then_sell() {
    let mut env = env(&[100.0, 105.0, 103.0], 1000.0);

    let (obs, info) = env.reset(None, None);
    assert_eq!(obs.to_array(), [1000.0, 0.0, 100.0]);
    assert_eq!(info.total_portfolio_value, 1000.0);

    let first = env.step(TradeAction::Buy.to_index()).unwrap();
    assert_eq!(first.observation.to_array(), [900.0, 1.0, 105.0]);
    assert_eq!(first.reward, 0.0);
    assert!(!first.terminated);
    assert!(!first.truncated);

    let second = env.step(TradeAction::Sell.to_index()).unwrap();
    assert_eq!(second.observation.to_array(), [1005.0, 0.0, 103.0]);
    assert_eq!(second.reward, 5.0);
    assert!(second.terminated);
    assert_eq!(second.info.total_portfolio_value, 1005.0);

    let err = env.step(TradeAction::Hold.to_index()).unwrap_err();
    assert!(matches!(err, TraderError::EpisodeTerminated { step: 2 }));
    assert_eq!(env.state().balance, 1005.0);
}

/// Random action sequences keep the books balanced and never go negative.
#[test]
fn accounting_identity_holds_for_random_actions() {
    let closes = [50.0, 52.5, 49.0, 61.0, 58.25, 40.0, 44.0, 70.0, 69.5, 72.0];
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let mut env = env(&closes, 150.0);
        env.reset(None, None);
        let s = env.state();
        assert_close(s.total_portfolio_value, s.balance + s.shares_held as f64 * closes[0]);

        while !env.is_terminal() {
            let accounting_price = env.current_price();
            let action = rng.gen_range(0..3);
            env.step(action).unwrap();

            let s = env.state();
            assert!(s.balance >= 0.0);
            assert_close(
                s.total_portfolio_value,
                s.balance + s.shares_held as f64 * accounting_price,
            );
        }
    }
}

#[test]
fn reset_is_idempotent() {
    let mut env = env(&[10.0, 11.0, 12.0, 13.0], 100.0);

    let first = env.reset(Some(3), None);
    env.step(1).unwrap();
    env.step(1).unwrap();
    let second = env.reset(None, None);
    let third = env.reset(None, None);

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(env.state().current_step, 0);
    assert_eq!(env.state().shares_held, 0);
}

#[test]
fn n_bars_give_n_minus_one_steps() {
    for n in 2..8 {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let mut env = env(&closes, 1000.0);
        env.reset(None, None);

        let mut steps = 0;
        loop {
            let result = env.step(0).unwrap();
            steps += 1;
            if result.terminated {
                break;
            }
        }
        assert_eq!(steps, n - 1);
    }
}

#[test]
fn buy_without_funds_is_a_no_op() {
    let mut env = env(&[100.0, 101.0, 102.0], 50.0);
    env.reset(None, None);

    let result = env.step(1).unwrap();

    assert_eq!(result.reward, 0.0);
    assert_eq!(env.state().balance, 50.0);
    assert_eq!(env.state().shares_held, 0);
}

#[test]
fn invalid_action_leaves_state_unchanged() {
    let mut env = env(&[100.0, 101.0, 102.0], 1000.0);
    env.reset(None, None);
    let before = *env.state();

    assert!(matches!(env.step(3), Err(TraderError::InvalidAction(3))));
    assert_eq!(*env.state(), before);
}

#[test]
fn single_bar_dataset_is_terminal_after_reset() {
    let mut env = env(&[100.0], 1000.0);
    let (obs, _) = env.reset(None, None);

    assert_eq!(obs.to_array(), [1000.0, 0.0, 100.0]);
    assert!(env.is_terminal());
    assert!(matches!(
        env.step(0),
        Err(TraderError::EpisodeTerminated { step: 0 })
    ));
}

#[test]
fn spaces_describe_the_contract() {
    let env = env(&[1.0, 2.0], 10.0);

    assert_eq!(env.action_space().n(), 3);
    assert_eq!(env.observation_space().shape(), [3]);
    assert!(env.observation_space().contains(&[0.0, 0.0, 0.0]));
    assert!(!env.observation_space().contains(&[-1.0, 0.0, 0.0]));
}

#[test]
fn rejects_invalid_configuration() {
    let dataset = dataset_from_closes(&[1.0, 2.0]).unwrap();
    assert!(TradingEnvConfig::with_initial_balance(dataset.clone(), 0.0).is_err());
    assert!(TradingEnvConfig::with_initial_balance(dataset, f64::NAN).is_err());
    assert!(dataset_from_closes(&[]).is_err());
    assert!(dataset_from_closes(&[1.0, -2.0]).is_err());
}
