//! Solver and dispatcher configuration.
//!
//! A configuration document is a JSON object with `static`, `dynamic` and
//! `hindsight` sections. Every key has a default; unknown keys are rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::evaluation::PenaltyParams;
use crate::ga::PopulationParams;
use crate::search::SearchParams;
use crate::stop::StopCriterion;

/// Parameters of one static solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SolverConfig {
    /// Lower bound of each sub-population.
    pub min_pop_size: usize,
    /// Slack above the minimum before survivor selection.
    pub generation_size: usize,
    /// Top-by-cost members with guaranteed best fitness.
    pub nb_elite: usize,
    /// Peers averaged into the diversity measure.
    pub nb_close: usize,
    /// Granular neighbourhood size.
    pub nb_granular: usize,
    /// Initial weight on capacity excess.
    pub initial_capacity_penalty: i64,
    /// Initial weight on time warp.
    pub initial_time_warp_penalty: i64,
    /// Penalty adaptation window, in offspring.
    pub nb_penalty_management: usize,
    /// Multiplicative penalty increase factor.
    pub penalty_increase: f64,
    /// Multiplicative penalty decrease factor.
    pub penalty_decrease: f64,
    /// Target fraction of feasible offspring.
    pub target_feasible: f64,
    /// Percent chance of a boosted repair pass on infeasible offspring.
    pub repair_probability: u32,
    /// Penalty multiplier during repair.
    pub repair_booster: i64,
    /// Iterations without improvement before a restart.
    pub nb_iter: u64,
    /// Elites carried over across a restart.
    pub nb_keep_on_restart: usize,
    /// Percent chance the binary tournament returns the fitter contender.
    pub select_probability: u32,
    /// Whether to run route operators and post-processing.
    pub should_intensify: bool,
    /// Extra angular tolerance (degrees) in the sector overlap test.
    pub circle_sector_overlap_tolerance: i64,
    /// Minimum sector width (degrees) before the overlap test.
    pub min_circle_sector_size: i64,
    /// Maximum subpath length enumerated after local-search convergence.
    pub post_process_path_length: usize,
    /// Waiting-time weight in the granular proximity proxy.
    pub weight_wait_time: i64,
    /// Time-warp weight in the granular proximity proxy.
    pub weight_time_warp: i64,
    /// Vehicle-count upper bound; non-positive selects the packing heuristic.
    pub nb_veh: i64,
    /// Iteration budget; mutually exclusive with `maxRuntime`.
    pub max_iterations: Option<u64>,
    /// Wall-clock budget in seconds; mutually exclusive with `maxIterations`.
    pub max_runtime: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            min_pop_size: 25,
            generation_size: 40,
            nb_elite: 4,
            nb_close: 5,
            nb_granular: 40,
            initial_capacity_penalty: 20,
            initial_time_warp_penalty: 6,
            nb_penalty_management: 100,
            penalty_increase: 1.2,
            penalty_decrease: 0.85,
            target_feasible: 0.43,
            repair_probability: 50,
            repair_booster: 10,
            nb_iter: 10_000,
            nb_keep_on_restart: 0,
            select_probability: 90,
            should_intensify: true,
            circle_sector_overlap_tolerance: 0,
            min_circle_sector_size: 15,
            post_process_path_length: 4,
            weight_wait_time: 2,
            weight_time_warp: 10,
            nb_veh: -1,
            max_iterations: None,
            max_runtime: None,
        }
    }
}

impl SolverConfig {
    /// Checks every parameter against its documented range.
    pub fn validate(&self) -> Result<(), SolverError> {
        self.penalty_params().validate()?;
        self.population_params().validate()?;
        if self.repair_probability > 100 {
            return Err(SolverError::InvalidConfig(format!(
                "repairProbability {} not in [0, 100]",
                self.repair_probability
            )));
        }
        if self.nb_granular == 0 {
            return Err(SolverError::InvalidConfig(
                "nbGranular must be positive".into(),
            ));
        }
        if self.nb_iter == 0 {
            return Err(SolverError::InvalidConfig("nbIter must be positive".into()));
        }
        if self.weight_wait_time < 0 || self.weight_time_warp < 0 {
            return Err(SolverError::InvalidConfig(
                "proximity weights must be non-negative".into(),
            ));
        }
        if self.max_iterations.is_some() && self.max_runtime.is_some() {
            return Err(SolverError::InvalidConfig(
                "maxIterations and maxRuntime are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    /// The penalty-manager parameters carried by this config.
    pub fn penalty_params(&self) -> PenaltyParams {
        PenaltyParams {
            init_capacity_penalty: self.initial_capacity_penalty,
            init_time_warp_penalty: self.initial_time_warp_penalty,
            repair_booster: self.repair_booster,
            num_registrations: self.nb_penalty_management,
            penalty_increase: self.penalty_increase,
            penalty_decrease: self.penalty_decrease,
            target_feasible: self.target_feasible,
        }
    }

    /// The population parameters carried by this config.
    pub fn population_params(&self) -> PopulationParams {
        PopulationParams {
            min_pop_size: self.min_pop_size,
            generation_size: self.generation_size,
            nb_elite: self.nb_elite,
            nb_close: self.nb_close,
            select_probability: self.select_probability,
        }
    }

    /// The local-search parameters carried by this config.
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            should_intensify: self.should_intensify,
            sector_overlap_tolerance_degrees: self.circle_sector_overlap_tolerance,
            min_sector_size_degrees: self.min_circle_sector_size,
            post_process_path_length: self.post_process_path_length,
        }
    }

    /// The stop criterion; exactly one of the two limits must be set.
    pub fn stop_criterion(&self) -> Result<StopCriterion, SolverError> {
        StopCriterion::from_limits(
            self.max_iterations,
            self.max_runtime.map(Duration::from_secs_f64),
        )
    }

    /// Returns a copy with the given runtime budget replacing any limits.
    pub fn with_runtime(&self, runtime: Duration) -> Self {
        Self {
            max_iterations: None,
            max_runtime: Some(runtime.as_secs_f64()),
            ..self.clone()
        }
    }
}

/// Parameters of the dynamic dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct DynamicConfig {
    /// Dispatch strategy: `greedy`, `lazy`, `random`, or `rollout`.
    pub strategy: String,
    /// Fraction of the epoch budget spent on simulations.
    pub simulate_tlim_factor: f64,
    /// Number of postpone-update cycles per epoch.
    pub n_cycles: usize,
    /// Simulations per cycle.
    pub n_simulations: usize,
    /// Future epochs sampled into each simulation instance.
    pub n_lookahead: usize,
    /// Candidate requests sampled per future epoch.
    pub n_requests: usize,
    /// Postpone thresholds per epoch; the last value repeats.
    pub postpone_thresholds: Vec<f64>,
    /// Solver parameters for the dispatch instance of each epoch.
    pub dispatch: SolverConfig,
    /// Solver parameters for the simulation instances.
    pub simulate: SolverConfig,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            strategy: "rollout".into(),
            simulate_tlim_factor: 0.5,
            n_cycles: 1,
            n_simulations: 50,
            n_lookahead: 1,
            n_requests: 100,
            postpone_thresholds: vec![0.85],
            dispatch: SolverConfig::default(),
            simulate: SolverConfig {
                min_pop_size: 5,
                generation_size: 20,
                repair_probability: 100,
                nb_granular: 20,
                ..SolverConfig::default()
            },
        }
    }
}

impl DynamicConfig {
    /// Checks every parameter against its documented range.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !matches!(self.strategy.as_str(), "greedy" | "lazy" | "random" | "rollout") {
            return Err(SolverError::InvalidConfig(format!(
                "unknown strategy {:?}",
                self.strategy
            )));
        }
        if !(0.0..=1.0).contains(&self.simulate_tlim_factor) {
            return Err(SolverError::InvalidConfig(format!(
                "simulate_tlim_factor {} not in [0, 1]",
                self.simulate_tlim_factor
            )));
        }
        if self.n_cycles == 0 || self.n_simulations == 0 {
            return Err(SolverError::InvalidConfig(
                "n_cycles and n_simulations must be positive".into(),
            ));
        }
        if self.postpone_thresholds.is_empty() {
            return Err(SolverError::InvalidConfig(
                "postpone_thresholds must not be empty".into(),
            ));
        }
        for &threshold in &self.postpone_thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(SolverError::InvalidConfig(format!(
                    "postpone threshold {threshold} not in [0, 1]"
                )));
            }
        }
        self.dispatch.validate()?;
        self.simulate.validate()
    }

    /// Threshold for the given zero-based epoch offset; the last configured
    /// value applies to all later epochs.
    pub fn threshold_for(&self, epoch_offset: usize) -> f64 {
        let idx = epoch_offset.min(self.postpone_thresholds.len() - 1);
        self.postpone_thresholds[idx]
    }
}

/// The full configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDocument {
    /// Parameters for static solves.
    #[serde(rename = "static")]
    pub static_solver: SolverConfig,
    /// Parameters for the dynamic dispatcher.
    pub dynamic: DynamicConfig,
    /// Parameters for the hindsight (oracle) solve.
    pub hindsight: SolverConfig,
}

impl ConfigDocument {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, SolverError> {
        let document: Self = serde_json::from_str(text)
            .map_err(|e| SolverError::InvalidConfig(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), SolverError> {
        self.static_solver.validate()?;
        self.dynamic.validate()?;
        self.hindsight.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SolverConfig::default().validate().is_ok());
        assert!(DynamicConfig::default().validate().is_ok());
        assert!(ConfigDocument::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_key() {
        let text = r#"{ "static": { "minPopSize": 10, "popSize": 3 } }"#;
        assert!(matches!(
            ConfigDocument::from_json(text),
            Err(SolverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let text = r#"{ "static": { "targetFeasible": 1.5 } }"#;
        assert!(matches!(
            ConfigDocument::from_json(text),
            Err(SolverError::InvalidConfig(_))
        ));

        let text = r#"{ "dynamic": { "strategy": "psychic" } }"#;
        assert!(matches!(
            ConfigDocument::from_json(text),
            Err(SolverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parses_sections() {
        let text = r#"
        {
            "static": { "minPopSize": 10, "nbGranular": 20, "maxIterations": 500 },
            "dynamic": {
                "strategy": "rollout",
                "n_cycles": 2,
                "n_simulations": 10,
                "postpone_thresholds": [0.9, 0.75],
                "simulate": { "minPopSize": 5 }
            },
            "hindsight": { "maxIterations": 1000 }
        }"#;
        let document = ConfigDocument::from_json(text).expect("valid");
        assert_eq!(document.static_solver.min_pop_size, 10);
        assert_eq!(document.dynamic.n_cycles, 2);
        assert_eq!(document.dynamic.threshold_for(0), 0.9);
        assert_eq!(document.dynamic.threshold_for(1), 0.75);
        assert_eq!(document.dynamic.threshold_for(7), 0.75);
        assert_eq!(
            document.static_solver.stop_criterion().expect("set"),
            crate::stop::StopCriterion::MaxIterations(500)
        );
    }

    #[test]
    fn test_conflicting_stop_criteria() {
        let mut config = SolverConfig::default();
        config.max_iterations = Some(10);
        config.max_runtime = Some(1.0);
        assert!(config.validate().is_err());

        config.max_runtime = None;
        assert!(config.validate().is_ok());

        config.max_iterations = None;
        assert!(config.stop_criterion().is_err());
    }
}
