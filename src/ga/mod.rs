//! Hybrid genetic search.
//!
//! - [`Population`] — dual sub-populations with diversity-biased fitness
//! - [`CrossoverOperator`] — SREX and broken-pairs exchange
//! - [`GeneticAlgorithm`] — the driver: select, cross, educate, insert
//! - [`solve()`] / [`solve_all()`] — entry points for one or many instances
//!
//! Each offspring is refined by granular local search; infeasible offspring
//! may get a second, penalty-boosted pass. Penalty weights adapt towards a
//! feasibility target, and long stagnation triggers a population restart.

pub mod crossover;
mod population;

pub use crossover::CrossoverOperator;
pub use population::{Population, PopulationParams};

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::evaluation::{verify_individual, PenaltyManager};
use crate::models::{Individual, Instance};
use crate::search::{LocalSearch, Neighbourhood};
use crate::stop::StopCriterion;

/// Outcome of one solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Best feasible individual found, by raw distance.
    pub best_feasible: Option<Individual>,
    /// Best infeasible individual found, by penalized cost at observation.
    pub best_infeasible: Option<Individual>,
    /// Genetic-algorithm iterations executed.
    pub iterations: u64,
    /// Wall-clock time spent.
    pub runtime: Duration,
}

impl SolveResult {
    /// The best individual found: feasible if one exists.
    pub fn best(&self) -> &Individual {
        self.best_feasible
            .as_ref()
            .or(self.best_infeasible.as_ref())
            .expect("a solve always produces at least one individual")
    }

    /// Returns the best feasible individual or [`SolverError::Infeasible`].
    pub fn best_feasible_or_err(&self) -> Result<&Individual, SolverError> {
        self.best_feasible.as_ref().ok_or(SolverError::Infeasible)
    }
}

/// The genetic algorithm driver.
///
/// Owns the population, penalty manager and RNG of one solve; instance and
/// neighbourhood data are shared read-only.
pub struct GeneticAlgorithm<'a> {
    instance: &'a Instance,
    config: SolverConfig,
    penalty: PenaltyManager,
    population: Population,
    local_search: LocalSearch<'a>,
    rng: ChaCha8Rng,
    best_feasible: Option<Individual>,
    best_infeasible: Option<Individual>,
    stagnation: u64,
}

const CROSSOVERS: [CrossoverOperator; 2] = [
    CrossoverOperator::SelectiveRouteExchange,
    CrossoverOperator::BrokenPairsExchange,
];

impl<'a> GeneticAlgorithm<'a> {
    /// Creates a driver with validated configuration.
    pub fn new(
        instance: &'a Instance,
        neighbourhood: &'a Neighbourhood,
        config: &SolverConfig,
        seed: u64,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Self {
            instance,
            penalty: PenaltyManager::new(config.penalty_params())?,
            population: Population::new(config.population_params())?,
            local_search: LocalSearch::new(instance, neighbourhood, config.search_params()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            best_feasible: None,
            best_infeasible: None,
            stagnation: 0,
            config: config.clone(),
        })
    }

    /// Runs until the stop criterion is met; returns the best individuals.
    pub fn run(&mut self, stop: &StopCriterion) -> Result<SolveResult, SolverError> {
        let started = Instant::now();
        self.local_search.set_deadline(stop.deadline(started));

        self.seed_population();

        let mut iterations = 0;
        while !stop.should_stop(iterations, started) {
            iterations += 1;
            self.iterate();

            if self.stagnation >= self.config.nb_iter {
                log::info!(
                    "restart after {} iterations without improvement",
                    self.stagnation
                );
                self.restart();
            }
        }

        if let Some(best) = &self.best_feasible {
            verify_individual(self.instance, best)?;
        }
        if let Some(best) = &self.best_infeasible {
            verify_individual(self.instance, best)?;
        }
        Ok(SolveResult {
            best_feasible: self.best_feasible.clone(),
            best_infeasible: self.best_infeasible.clone(),
            iterations,
            runtime: started.elapsed(),
        })
    }

    /// One iteration: select, cross, educate, maybe repair, insert, adapt.
    fn iterate(&mut self) {
        let weights = self.penalty.weights();
        let (parent_a, parent_b) = self.population.select_parents(weights, &mut self.rng);

        let operator = CROSSOVERS[self.rng.random_range(0..CROSSOVERS.len())];
        let child = operator.apply(
            self.instance,
            weights,
            (&parent_a, &parent_b),
            &mut self.rng,
        );

        let mut educated = self.local_search.search(&child, weights, &mut self.rng);
        if !educated.is_feasible()
            && self.rng.random_range(0..100) < self.config.repair_probability
        {
            let repaired =
                self.local_search
                    .search(&educated, self.penalty.boosted_weights(), &mut self.rng);
            if repaired.is_feasible() {
                educated = repaired;
            }
        }

        self.penalty.register(
            educated.is_capacity_feasible(),
            educated.is_time_warp_feasible(),
        );
        let improved = self.observe(&educated);
        self.population.insert(educated, self.penalty.weights());

        if improved {
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
    }

    /// Seeds the population with educated random individuals: four batches
    /// of `minPopSize`, alternating booster use on infeasible ones.
    fn seed_population(&mut self) {
        for batch in 0..4 * self.config.min_pop_size {
            let random = Individual::random(self.instance, &mut self.rng);
            let weights = self.penalty.weights();
            let mut educated = self.local_search.search(&random, weights, &mut self.rng);
            if !educated.is_feasible() && batch % 2 == 0 {
                let repaired = self.local_search.search(
                    &educated,
                    self.penalty.boosted_weights(),
                    &mut self.rng,
                );
                if repaired.is_feasible() {
                    educated = repaired;
                }
            }
            self.observe(&educated);
            self.population.insert(educated, weights);
        }
    }

    /// Clears the population (keeping configured elites) and re-seeds it.
    fn restart(&mut self) {
        self.population
            .restart(self.config.nb_keep_on_restart, self.penalty.weights());
        self.seed_population();
        self.stagnation = 0;
    }

    /// Tracks the best individuals seen; returns `true` on a new best
    /// feasible solution.
    fn observe(&mut self, candidate: &Individual) -> bool {
        if candidate.is_feasible() {
            let improved = self
                .best_feasible
                .as_ref()
                .map_or(true, |best| candidate.distance() < best.distance());
            if improved {
                log::info!("new best feasible solution: {}", candidate.distance());
                self.best_feasible = Some(candidate.clone());
            }
            improved
        } else {
            let weights = self.penalty.weights();
            let improved = self.best_infeasible.as_ref().map_or(true, |best| {
                candidate.cost(weights) < best.cost(weights)
                    || (candidate.cost(weights) == best.cost(weights)
                        && candidate.distance() < best.distance())
            });
            if improved {
                self.best_infeasible = Some(candidate.clone());
            }
            false
        }
    }
}

/// Solves one instance with the given configuration, seed and stop
/// criterion.
///
/// Instances with zero or one client short-circuit without running the
/// genetic algorithm.
pub fn solve(
    instance: &Instance,
    config: &SolverConfig,
    seed: u64,
    stop: &StopCriterion,
) -> Result<SolveResult, SolverError> {
    config.validate()?;

    if instance.num_clients() <= 1 {
        let routes = if instance.num_clients() == 0 {
            Vec::new()
        } else {
            vec![vec![1]]
        };
        let individual = Individual::new(instance, routes);
        verify_individual(instance, &individual)?;
        let (best_feasible, best_infeasible) = if individual.is_feasible() {
            (Some(individual), None)
        } else {
            (None, Some(individual))
        };
        return Ok(SolveResult {
            best_feasible,
            best_infeasible,
            iterations: 0,
            runtime: Duration::ZERO,
        });
    }

    let bounded;
    let instance = if config.nb_veh > 0 {
        bounded = instance.clone().with_num_vehicles(config.nb_veh as usize);
        &bounded
    } else {
        instance
    };
    let neighbourhood = Neighbourhood::new(
        instance,
        config.nb_granular,
        config.weight_wait_time,
        config.weight_time_warp,
    );
    let mut algorithm = GeneticAlgorithm::new(instance, &neighbourhood, config, seed)?;
    algorithm.run(stop)
}

/// Solves many instances in parallel; a failure taints only its own entry.
pub fn solve_all(
    instances: &[Instance],
    config: &SolverConfig,
    seed: u64,
    stop: &StopCriterion,
) -> Vec<Result<SolveResult, SolverError>> {
    instances
        .par_iter()
        .map(|instance| solve(instance, config, seed, stop))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Matrix;

    fn test_config() -> SolverConfig {
        SolverConfig {
            min_pop_size: 4,
            generation_size: 6,
            nb_elite: 1,
            nb_close: 2,
            nb_granular: 5,
            nb_penalty_management: 20,
            nb_iter: 200,
            ..SolverConfig::default()
        }
    }

    fn single_client_instance() -> Instance {
        let durations = Matrix::from_data(2, vec![0, 7, 9, 0]).expect("valid");
        Instance::new(
            vec![(0, 0), (3, 4)],
            vec![0, 10],
            vec![(0, 100), (0, 80)],
            vec![0, 10],
            vec![0, 0],
            30,
            durations,
        )
        .expect("valid instance")
    }

    fn two_tight_clients_instance() -> Instance {
        // Each demand fills a vehicle: the optimum is two round trips.
        let durations = Matrix::from_data(
            3,
            vec![
                0, 10, 12, //
                10, 0, 5, //
                12, 5, 0,
            ],
        )
        .expect("valid");
        Instance::new(
            vec![(0, 0), (10, 0), (0, 12)],
            vec![0, 30, 30],
            vec![(0, 1000); 3],
            vec![0; 3],
            vec![0; 3],
            30,
            durations,
        )
        .expect("valid instance")
    }

    #[test]
    fn test_single_client_shortcut() {
        let inst = single_client_instance();
        let stop = StopCriterion::MaxIterations(1);
        let result = solve(&inst, &test_config(), 1, &stop).expect("solve");
        assert_eq!(result.iterations, 0);
        let best = result.best_feasible_or_err().expect("feasible");
        assert_eq!(best.distance(), 7 + 9);
        assert_eq!(best.nonempty_routes().count(), 1);
    }

    #[test]
    fn test_empty_instance_shortcut() {
        let durations = Matrix::from_data(1, vec![0]).expect("valid");
        let inst = Instance::new(
            vec![(0, 0)],
            vec![0],
            vec![(0, 100)],
            vec![0],
            vec![0],
            10,
            durations,
        )
        .expect("valid instance");
        let stop = StopCriterion::MaxIterations(1);
        let result = solve(&inst, &test_config(), 1, &stop).expect("solve");
        let best = result.best_feasible_or_err().expect("feasible");
        assert_eq!(best.distance(), 0);
        assert_eq!(best.num_nonempty_routes(), 0);
    }

    #[test]
    fn test_two_tight_clients() {
        let inst = two_tight_clients_instance();
        let stop = StopCriterion::MaxIterations(30);
        let result = solve(&inst, &test_config(), 42, &stop).expect("solve");
        let best = result.best_feasible_or_err().expect("feasible");
        assert_eq!(best.num_nonempty_routes(), 2);
        assert_eq!(best.distance(), (10 + 10) + (12 + 12));
    }

    #[test]
    fn test_time_window_infeasibility_reported() {
        // The client's window closes before any vehicle can arrive.
        let durations = Matrix::from_data(2, vec![0, 50, 50, 0]).expect("valid");
        let inst = Instance::new(
            vec![(0, 0), (50, 0)],
            vec![0, 10],
            vec![(0, 1000), (0, 20)],
            vec![0, 0],
            vec![0, 0],
            30,
            durations,
        )
        .expect("valid instance");
        let stop = StopCriterion::MaxIterations(1);
        let result = solve(&inst, &test_config(), 1, &stop).expect("solve");
        assert!(result.best_feasible.is_none());
        assert!(matches!(
            result.best_feasible_or_err(),
            Err(SolverError::Infeasible)
        ));
        let best = result.best();
        assert_eq!(best.time_warp(), 30);
        assert_eq!(best.distance(), 100);
    }

    #[test]
    fn test_deterministic_replay() {
        let inst = two_tight_clients_instance();
        let stop = StopCriterion::MaxIterations(50);
        let config = test_config();
        let first = solve(&inst, &config, 7, &stop).expect("solve");
        let second = solve(&inst, &config, 7, &stop).expect("solve");
        assert_eq!(
            first.best().distance(),
            second.best().distance()
        );
        assert_eq!(first.best().giant_tour(), second.best().giant_tour());
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn test_solve_all_isolates_failures() {
        let good = two_tight_clients_instance();
        let stop = StopCriterion::MaxIterations(10);
        let mut bad_config = test_config();
        bad_config.target_feasible = 2.0;

        let results = solve_all(&[good.clone(), good], &test_config(), 1, &stop);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));

        let bad = solve(&two_tight_clients_instance(), &bad_config, 1, &stop);
        assert!(matches!(bad, Err(SolverError::InvalidConfig(_))));
    }
}
