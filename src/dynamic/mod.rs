//! Dynamic dispatching.
//!
//! - [`Environment`] — the epoch state machine contract
//! - [`DispatchStrategy`] — greedy, lazy, random, or rollout dispatching
//! - [`run_dynamic()`] — the epoch loop: decide, solve, submit
//! - [`solve_hindsight()`] — oracle bound on the revealed problem

pub mod environment;
mod rollout;
mod simulate;

pub use environment::{
    Environment, EpochInstance, EpochObservation, StaticInfo, StepOutcome,
};

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{DynamicConfig, SolverConfig};
use crate::error::SolverError;
use crate::ga::{self, SolveResult};
use crate::models::Individual;
use crate::stop::StopCriterion;

/// Length of one epoch, in the same time unit as instance durations.
pub const EPOCH_DURATION: i64 = 3600;

/// How the dispatcher chooses which pending requests to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Dispatch every pending request.
    Greedy,
    /// Dispatch only must-dispatch requests.
    Lazy,
    /// Dispatch each optional request with probability one half.
    Random,
    /// Dispatch what the rollout simulations rarely postpone.
    Rollout,
}

impl DispatchStrategy {
    /// Parses a strategy name from configuration.
    pub fn parse(name: &str) -> Result<Self, SolverError> {
        match name {
            "greedy" => Ok(Self::Greedy),
            "lazy" => Ok(Self::Lazy),
            "random" => Ok(Self::Random),
            "rollout" => Ok(Self::Rollout),
            other => Err(SolverError::InvalidConfig(format!(
                "unknown strategy {other:?}"
            ))),
        }
    }
}

/// Outcome of a full dynamic run.
#[derive(Debug, Clone)]
pub struct DynamicResult {
    /// Sum of epoch rewards (negative total routing cost).
    pub total_reward: i64,
    /// The solution submitted each epoch, as routes of request ids.
    pub epoch_solutions: Vec<Vec<Vec<i64>>>,
}

impl DynamicResult {
    /// Total routing cost over all epochs.
    pub fn total_cost(&self) -> i64 {
        -self.total_reward
    }
}

/// Plays all epochs of the environment with the configured strategy.
///
/// The dispatcher owns an RNG stream separate from the solver streams, so
/// static and dynamic randomness do not interfere. If an epoch's dispatch
/// instance cannot be solved feasibly, the epoch falls back to dispatching
/// only its must-dispatch requests.
pub fn run_dynamic<E: Environment>(
    env: &mut E,
    config: &DynamicConfig,
    seed: u64,
) -> Result<DynamicResult, SolverError> {
    config.validate()?;
    let strategy = DispatchStrategy::parse(&config.strategy)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);

    let (mut observation, info) = env.reset()?;
    let mut total_reward = 0;
    let mut epoch_solutions = Vec::new();

    loop {
        let epoch_started = Instant::now();
        let epoch = &observation.epoch_instance;

        let mask = match strategy {
            DispatchStrategy::Greedy => vec![true; epoch.len()],
            DispatchStrategy::Lazy => must_dispatch_mask(epoch),
            DispatchStrategy::Random => {
                let mut mask = must_dispatch_mask(epoch);
                for flag in mask.iter_mut().skip(1) {
                    *flag = *flag || rng.random_bool(0.5);
                }
                mask
            }
            DispatchStrategy::Rollout => {
                rollout::rollout_dispatch(&observation, &info, config, &mut rng)?
            }
        };

        let mut dispatch = epoch.filter(&mask);
        let remaining = info.epoch_tlim.saturating_sub(epoch_started.elapsed());
        let mut result = solve_epoch(&dispatch, &info, config, rng.random(), remaining)?;

        if result.best_feasible.is_none() {
            log::warn!(
                "epoch {}: dispatch instance infeasible, falling back to must-dispatch",
                observation.current_epoch
            );
            dispatch = epoch.filter(&must_dispatch_mask(epoch));
            let remaining = info.epoch_tlim.saturating_sub(epoch_started.elapsed());
            result = solve_epoch(&dispatch, &info, config, rng.random(), remaining)?;
        }
        let best = result.best_feasible_or_err()?;

        let solution = dispatch.routes_to_requests(best);
        let outcome = env.step(solution.clone())?;
        log::info!(
            "epoch {}: dispatched {} of {} requests, reward {}",
            observation.current_epoch,
            dispatch.num_requests(),
            epoch.num_requests(),
            outcome.reward
        );

        total_reward += outcome.reward;
        epoch_solutions.push(solution);

        if outcome.done {
            break;
        }
        observation = outcome.observation.ok_or_else(|| {
            SolverError::EnvironmentError("missing observation before the run is done".into())
        })?;
    }

    Ok(DynamicResult {
        total_reward,
        epoch_solutions,
    })
}

/// Solves the revealed hindsight problem as a static instance.
///
/// Fails with [`SolverError::Infeasible`] when even hindsight admits no
/// feasible solution.
pub fn solve_hindsight<E: Environment>(
    env: &mut E,
    config: &SolverConfig,
    seed: u64,
) -> Result<(SolveResult, Individual), SolverError> {
    let instance = env.hindsight_problem()?;
    let stop = config.stop_criterion()?;
    let result = ga::solve(&instance, config, seed, &stop)?;
    let best = result.best_feasible_or_err()?.clone();
    Ok((result, best))
}

fn must_dispatch_mask(epoch: &EpochInstance) -> Vec<bool> {
    (0..epoch.len())
        .map(|i| epoch.is_depot[i] || epoch.must_dispatch[i])
        .collect()
}

fn solve_epoch(
    dispatch: &EpochInstance,
    info: &StaticInfo,
    config: &DynamicConfig,
    seed: u64,
    budget: std::time::Duration,
) -> Result<SolveResult, SolverError> {
    let instance = dispatch.to_instance(&info.context)?;
    ga::solve(
        &instance,
        &config.dispatch,
        seed,
        &StopCriterion::MaxRuntime(budget),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instance, Matrix};
    use std::time::Duration;

    /// A deterministic in-memory environment: a fixed set of requests per
    /// epoch, rewards computed from the static duration matrix.
    struct TestEnvironment {
        context: Instance,
        epochs: Vec<EpochInstance>,
        epoch_tlim: Duration,
        current: usize,
    }

    impl TestEnvironment {
        fn new(context: Instance, epochs: Vec<EpochInstance>, epoch_tlim: Duration) -> Self {
            Self {
                context,
                epochs,
                epoch_tlim,
                current: 0,
            }
        }

        fn observation(&self) -> EpochObservation {
            EpochObservation {
                current_epoch: self.current,
                planning_start_time: self.current as i64 * EPOCH_DURATION,
                epoch_instance: self.epochs[self.current].clone(),
            }
        }

        fn route_cost(&self, requests: &[i64]) -> Result<i64, SolverError> {
            let epoch = &self.epochs[self.current];
            let mut cost = 0;
            let mut prev = 0;
            for &request in requests {
                let entry = epoch
                    .request_idx
                    .iter()
                    .position(|&r| r == request)
                    .ok_or_else(|| {
                        SolverError::EnvironmentError(format!("unknown request {request}"))
                    })?;
                let customer = epoch.customer_idx[entry];
                cost += self.context.duration(prev, customer);
                prev = customer;
            }
            cost += self.context.duration(prev, 0);
            Ok(cost)
        }
    }

    impl Environment for TestEnvironment {
        fn reset(&mut self) -> Result<(EpochObservation, StaticInfo), SolverError> {
            self.current = 0;
            let info = StaticInfo {
                start_epoch: 0,
                end_epoch: self.epochs.len() - 1,
                epoch_tlim: self.epoch_tlim,
                context: self.context.clone(),
            };
            Ok((self.observation(), info))
        }

        fn step(&mut self, solution: Vec<Vec<i64>>) -> Result<StepOutcome, SolverError> {
            let epoch = &self.epochs[self.current];
            let dispatched: Vec<i64> = solution.iter().flatten().copied().collect();
            for (entry, &request) in epoch.request_idx.iter().enumerate() {
                if epoch.must_dispatch[entry] && !dispatched.contains(&request) {
                    return Err(SolverError::EnvironmentError(format!(
                        "must-dispatch request {request} was not dispatched"
                    )));
                }
            }

            let mut cost = 0;
            for route in &solution {
                cost += self.route_cost(route)?;
            }

            self.current += 1;
            let done = self.current >= self.epochs.len();
            Ok(StepOutcome {
                observation: (!done).then(|| self.observation()),
                reward: -cost,
                done,
            })
        }

        fn hindsight_problem(&self) -> Result<Instance, SolverError> {
            // Every request of every epoch, released at its epoch start.
            let horizon =
                self.epochs.len() as i64 * EPOCH_DURATION + self.context.late(0);
            let mut customer_idx = vec![0];
            let mut demands = vec![0];
            let mut time_windows = vec![(self.context.early(0), horizon)];
            let mut service_times = vec![0];
            let mut release_times = vec![0];
            for (epoch_no, epoch) in self.epochs.iter().enumerate() {
                for entry in 1..epoch.len() {
                    customer_idx.push(epoch.customer_idx[entry]);
                    demands.push(epoch.demands[entry]);
                    let (early, late) = epoch.time_windows[entry];
                    let shift = epoch_no as i64 * EPOCH_DURATION;
                    time_windows.push((early + shift, late + shift));
                    service_times.push(epoch.service_times[entry]);
                    release_times.push(shift);
                }
            }
            let coords = customer_idx
                .iter()
                .map(|&c| self.context.coords(c))
                .collect();
            Instance::new(
                coords,
                demands,
                time_windows,
                service_times,
                release_times,
                self.context.capacity(),
                self.context.durations().submatrix(&customer_idx),
            )
        }
    }

    /// Static context: three clustered customers far from the depot, huge
    /// windows, and a depot that closes before any lookahead sample could
    /// return (so simulations see only the epoch's own requests).
    fn context() -> Instance {
        let durations = Matrix::from_data(
            4,
            vec![
                0, 100, 101, 102, //
                100, 0, 1, 2, //
                101, 1, 0, 1, //
                102, 2, 1, 0,
            ],
        )
        .expect("valid");
        Instance::new(
            vec![(0, 0), (100, 0), (101, 0), (102, 0)],
            vec![0, 1, 1, 1],
            vec![(0, 3000); 4],
            vec![0; 4],
            vec![0; 4],
            100,
            durations,
        )
        .expect("valid instance")
    }

    fn epoch(requests: &[(i64, usize, bool)]) -> EpochInstance {
        let mut ep = EpochInstance {
            request_idx: vec![0],
            customer_idx: vec![0],
            is_depot: vec![true],
            must_dispatch: vec![false],
            demands: vec![0],
            time_windows: vec![(0, 3000)],
            service_times: vec![0],
            release_times: vec![0],
        };
        for &(id, customer, must) in requests {
            ep.request_idx.push(id);
            ep.customer_idx.push(customer);
            ep.is_depot.push(false);
            ep.must_dispatch.push(must);
            ep.demands.push(1);
            ep.time_windows.push((0, 3000));
            ep.service_times.push(0);
            ep.release_times.push(0);
        }
        ep
    }

    fn three_epochs() -> Vec<EpochInstance> {
        vec![
            epoch(&[(1, 1, true), (2, 2, false), (3, 3, false)]),
            epoch(&[(4, 2, true), (5, 1, false)]),
            epoch(&[(6, 3, true), (7, 1, true)]),
        ]
    }

    fn fast_config(strategy: &str, thresholds: Vec<f64>) -> DynamicConfig {
        let solver = crate::config::SolverConfig {
            min_pop_size: 2,
            generation_size: 4,
            nb_elite: 1,
            nb_close: 1,
            nb_granular: 3,
            ..crate::config::SolverConfig::default()
        };
        DynamicConfig {
            strategy: strategy.into(),
            simulate_tlim_factor: 0.5,
            n_cycles: 1,
            n_simulations: 2,
            n_lookahead: 1,
            n_requests: 5,
            postpone_thresholds: thresholds,
            dispatch: solver.clone(),
            simulate: solver,
        }
    }

    fn dispatched_ids(result: &DynamicResult) -> Vec<Vec<i64>> {
        result
            .epoch_solutions
            .iter()
            .map(|routes| {
                let mut ids: Vec<i64> = routes.iter().flatten().copied().collect();
                ids.sort_unstable();
                ids
            })
            .collect()
    }

    fn run(strategy: &str, thresholds: Vec<f64>) -> DynamicResult {
        let mut env = TestEnvironment::new(
            context(),
            three_epochs(),
            Duration::from_millis(400),
        );
        run_dynamic(&mut env, &fast_config(strategy, thresholds), 99).expect("dynamic run")
    }

    #[test]
    fn test_greedy_dispatches_everything() {
        let result = run("greedy", vec![0.85]);
        assert_eq!(
            dispatched_ids(&result),
            vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]
        );
    }

    #[test]
    fn test_lazy_dispatches_must_only() {
        let result = run("lazy", vec![0.85]);
        assert_eq!(dispatched_ids(&result), vec![vec![1], vec![4], vec![6, 7]]);
    }

    #[test]
    fn test_rollout_threshold_zero_matches_lazy() {
        // Threshold 0 postpones every optional request regardless of the
        // simulations; the final epoch still dispatches everything.
        let rollout = run("rollout", vec![0.0]);
        let lazy = run("lazy", vec![0.85]);
        assert_eq!(dispatched_ids(&rollout), dispatched_ids(&lazy));
    }

    #[test]
    fn test_rollout_threshold_one_matches_greedy() {
        // The clustered geometry makes one route through all requests
        // optimal, so every simulation dispatches everyone alongside the
        // must-dispatch request; threshold 1 then postpones nothing.
        let rollout = run("rollout", vec![1.0]);
        let greedy = run("greedy", vec![0.85]);
        assert_eq!(dispatched_ids(&rollout), dispatched_ids(&greedy));
    }

    #[test]
    fn test_random_respects_must_dispatch() {
        let result = run("random", vec![0.85]);
        let ids = dispatched_ids(&result);
        assert!(ids[0].contains(&1));
        assert!(ids[1].contains(&4));
        assert!(ids[2].contains(&6) && ids[2].contains(&7));
    }

    #[test]
    fn test_hindsight_bounds_dynamic_cost() {
        let mut env = TestEnvironment::new(
            context(),
            three_epochs(),
            Duration::from_millis(400),
        );
        let config = fast_config("greedy", vec![0.85]);
        let dynamic = run_dynamic(&mut env, &config, 7).expect("dynamic run");

        let mut hindsight_config = config.dispatch.clone();
        hindsight_config.min_pop_size = 5;
        hindsight_config.generation_size = 10;
        hindsight_config.max_iterations = Some(1000);
        let (_, best) = solve_hindsight(&mut env, &hindsight_config, 7).expect("hindsight");
        assert!(best.distance() <= dynamic.total_cost());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(DispatchStrategy::parse("psychic").is_err());
        assert_eq!(
            DispatchStrategy::parse("rollout").expect("known"),
            DispatchStrategy::Rollout
        );
    }
}
