//! Population management.
//!
//! Two sub-populations (feasible and infeasible) hold the candidate pool.
//! Each member's fitness blends its cost rank with a diversity rank derived
//! from broken-pairs distances to its closest peers, so survivor selection
//! keeps both good and mutually different individuals.

use rand::Rng;

use crate::error::SolverError;
use crate::evaluation::PenaltyWeights;
use crate::models::Individual;

/// Parameters bounding the sub-populations and biasing selection.
#[derive(Debug, Clone)]
pub struct PopulationParams {
    /// Lower bound of each sub-population after survivor selection.
    pub min_pop_size: usize,
    /// Slack above the minimum before survivor selection triggers.
    pub generation_size: usize,
    /// Number of best-by-cost members with guaranteed best fitness.
    pub nb_elite: usize,
    /// Number of nearest peers averaged into the diversity measure.
    pub nb_close: usize,
    /// Percent chance the binary tournament returns the fitter contender.
    pub select_probability: u32,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            min_pop_size: 25,
            generation_size: 40,
            nb_elite: 4,
            nb_close: 5,
            select_probability: 90,
        }
    }
}

impl PopulationParams {
    /// Checks all parameters against their documented ranges.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.min_pop_size == 0 {
            return Err(SolverError::InvalidConfig("minPopSize must be positive".into()));
        }
        if self.select_probability > 100 {
            return Err(SolverError::InvalidConfig(format!(
                "selectProbability {} not in [0, 100]",
                self.select_probability
            )));
        }
        Ok(())
    }
}

struct Member {
    individual: Individual,
    fitness: f64,
    id: u64,
    /// Broken-pairs distance to every other member of the same
    /// sub-population, ascending.
    proximity: Vec<(i64, u64)>,
}

/// The candidate pool of the genetic algorithm.
pub struct Population {
    params: PopulationParams,
    feasible: Vec<Member>,
    infeasible: Vec<Member>,
    next_id: u64,
}

impl Population {
    /// Creates an empty population with validated parameters.
    pub fn new(params: PopulationParams) -> Result<Self, SolverError> {
        params.validate()?;
        Ok(Self {
            params,
            feasible: Vec::new(),
            infeasible: Vec::new(),
            next_id: 0,
        })
    }

    /// Number of feasible members.
    pub fn num_feasible(&self) -> usize {
        self.feasible.len()
    }

    /// Number of infeasible members.
    pub fn num_infeasible(&self) -> usize {
        self.infeasible.len()
    }

    /// Total number of members.
    pub fn size(&self) -> usize {
        self.feasible.len() + self.infeasible.len()
    }

    /// The best feasible member by raw distance, if any.
    pub fn best_feasible(&self) -> Option<&Individual> {
        self.feasible
            .iter()
            .map(|m| &m.individual)
            .min_by_key(|i| i.distance())
    }

    /// Inserts an offspring into the matching sub-population.
    ///
    /// A duplicate of an existing member (identical giant tour) is discarded
    /// outright: the later arrival always loses. When the sub-population
    /// exceeds its upper bound, survivor selection shrinks it back to the
    /// minimum size, evicting worst-fitness members.
    pub fn insert(&mut self, individual: Individual, weights: PenaltyWeights) {
        let id = self.next_id;
        self.next_id += 1;

        let subpop = if individual.is_feasible() {
            &mut self.feasible
        } else {
            &mut self.infeasible
        };

        let mut proximity = Vec::with_capacity(subpop.len());
        for member in subpop.iter() {
            let distance = individual.broken_pairs_distance(&member.individual);
            if distance == 0 {
                return;
            }
            proximity.push((distance, member.id));
        }

        for (member, &(distance, _)) in subpop.iter_mut().zip(proximity.iter()) {
            let entry = (distance, id);
            let at = member.proximity.partition_point(|&p| p < entry);
            member.proximity.insert(at, entry);
        }
        proximity.sort_unstable();

        subpop.push(Member {
            individual,
            fitness: 0.0,
            id,
            proximity,
        });

        let limit = self.params.min_pop_size + self.params.generation_size;
        if subpop.len() > limit {
            let target = self.params.min_pop_size;
            Self::shrink(subpop, target, &self.params, weights);
        }
    }

    fn shrink(subpop: &mut Vec<Member>, target: usize, params: &PopulationParams, weights: PenaltyWeights) {
        while subpop.len() > target {
            Self::update_fitness(subpop, params, weights);
            let worst = (0..subpop.len())
                .max_by(|&a, &b| {
                    subpop[a]
                        .fitness
                        .partial_cmp(&subpop[b].fitness)
                        .expect("fitness is never NaN")
                })
                .expect("sub-population is nonempty");
            let removed = subpop.swap_remove(worst);
            for member in subpop.iter_mut() {
                member.proximity.retain(|&(_, id)| id != removed.id);
            }
        }
    }

    /// Recomputes biased fitness for every member of a sub-population.
    fn update_fitness(subpop: &mut [Member], params: &PopulationParams, weights: PenaltyWeights) {
        let size = subpop.len();
        if size == 0 {
            return;
        }
        if size == 1 {
            subpop[0].fitness = 0.0;
            return;
        }

        let mut by_cost: Vec<usize> = (0..size).collect();
        by_cost.sort_by(|&a, &b| subpop[a].individual.compare(&subpop[b].individual, weights));

        let diversity: Vec<f64> = subpop
            .iter()
            .map(|member| {
                let close = member.proximity.iter().take(params.nb_close);
                let count = close.clone().count();
                if count == 0 {
                    0.0
                } else {
                    close.map(|&(d, _)| d as f64).sum::<f64>() / count as f64
                }
            })
            .collect();
        let mut by_diversity: Vec<usize> = (0..size).collect();
        by_diversity.sort_by(|&a, &b| {
            diversity[b]
                .partial_cmp(&diversity[a])
                .expect("diversity is never NaN")
        });

        let alpha = (1.0 - params.nb_elite as f64 / size as f64).max(0.0);
        let denom = (size - 1) as f64;
        for (rank, &idx) in by_cost.iter().enumerate() {
            subpop[idx].fitness = alpha * rank as f64 / denom;
        }
        for (rank, &idx) in by_diversity.iter().enumerate() {
            subpop[idx].fitness += (1.0 - alpha) * rank as f64 / denom;
        }
    }

    /// Selects two parents by independent binary tournaments.
    pub fn select_parents<R: Rng>(
        &mut self,
        weights: PenaltyWeights,
        rng: &mut R,
    ) -> (Individual, Individual) {
        Self::update_fitness(&mut self.feasible, &self.params, weights);
        Self::update_fitness(&mut self.infeasible, &self.params, weights);
        let first = self.tournament(rng).clone();
        let second = self.tournament(rng).clone();
        (first, second)
    }

    fn member(&self, index: usize) -> &Member {
        if index < self.feasible.len() {
            &self.feasible[index]
        } else {
            &self.infeasible[index - self.feasible.len()]
        }
    }

    fn tournament<R: Rng>(&self, rng: &mut R) -> &Individual {
        let total = self.size();
        assert!(total > 0, "tournament on an empty population");
        let a = self.member(rng.random_range(0..total));
        let b = self.member(rng.random_range(0..total));
        let (better, worse) = if a.fitness <= b.fitness { (a, b) } else { (b, a) };
        if rng.random_range(0..100) < self.params.select_probability {
            &better.individual
        } else {
            &worse.individual
        }
    }

    /// Clears the population, keeping at most `keep` best feasible members.
    ///
    /// The caller re-seeds with fresh random individuals afterwards.
    pub fn restart(&mut self, keep: usize, weights: PenaltyWeights) {
        let mut elites: Vec<Individual> = std::mem::take(&mut self.feasible)
            .into_iter()
            .map(|m| m.individual)
            .collect();
        elites.sort_by(|a, b| a.compare(b, weights));
        elites.truncate(keep);

        self.infeasible.clear();
        for elite in elites {
            self.insert(elite, weights);
        }
    }
}
