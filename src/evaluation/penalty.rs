//! Penalty weights and their adaptation.

use crate::error::SolverError;

/// Dead band around the feasibility target within which weights are left
/// alone.
const TARGET_DEVIATION: f64 = 0.05;

/// The pair of integer penalty weights applied to constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyWeights {
    /// Weight on each unit of load above capacity.
    pub capacity: i64,
    /// Weight on each unit of time warp.
    pub time_warp: i64,
}

impl PenaltyWeights {
    /// Penalized cost of the given cost components.
    #[inline]
    pub fn cost(&self, distance: i64, capacity_excess: i64, time_warp: i64) -> i64 {
        distance + self.capacity * capacity_excess + self.time_warp * time_warp
    }
}

/// Parameters governing penalty initialization and adaptation.
#[derive(Debug, Clone)]
pub struct PenaltyParams {
    /// Initial weight on capacity excess.
    pub init_capacity_penalty: i64,
    /// Initial weight on time warp.
    pub init_time_warp_penalty: i64,
    /// Multiplier applied to both weights during repair.
    pub repair_booster: i64,
    /// Window length: weights adapt after this many registered offspring.
    pub num_registrations: usize,
    /// Multiplicative increase factor, at least 1.
    pub penalty_increase: f64,
    /// Multiplicative decrease factor, in `(0, 1]`.
    pub penalty_decrease: f64,
    /// Target fraction of feasible offspring, in `[0, 1]`.
    pub target_feasible: f64,
}

impl Default for PenaltyParams {
    fn default() -> Self {
        Self {
            init_capacity_penalty: 20,
            init_time_warp_penalty: 6,
            repair_booster: 10,
            num_registrations: 100,
            penalty_increase: 1.2,
            penalty_decrease: 0.85,
            target_feasible: 0.43,
        }
    }
}

impl PenaltyParams {
    /// Checks all parameters against their documented ranges.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !(0.0..=1.0).contains(&self.target_feasible) {
            return Err(SolverError::InvalidConfig(format!(
                "targetFeasible {} not in [0, 1]",
                self.target_feasible
            )));
        }
        if self.penalty_increase < 1.0 {
            return Err(SolverError::InvalidConfig(format!(
                "penaltyIncrease {} must be at least 1",
                self.penalty_increase
            )));
        }
        if self.penalty_decrease <= 0.0 || self.penalty_decrease > 1.0 {
            return Err(SolverError::InvalidConfig(format!(
                "penaltyDecrease {} not in (0, 1]",
                self.penalty_decrease
            )));
        }
        if self.repair_booster < 1 {
            return Err(SolverError::InvalidConfig(format!(
                "repairBooster {} must be at least 1",
                self.repair_booster
            )));
        }
        if self.init_capacity_penalty < 1 || self.init_time_warp_penalty < 1 {
            return Err(SolverError::InvalidConfig(
                "initial penalties must be at least 1".into(),
            ));
        }
        if self.num_registrations == 0 {
            return Err(SolverError::InvalidConfig(
                "nbPenaltyManagement must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Maintains the capacity and time-warp penalty weights.
///
/// Offspring feasibility is registered per constraint; once the window of
/// `num_registrations` offspring fills up, each weight moves towards the
/// feasibility target: multiplied up (rounded up) when too few offspring were
/// feasible, multiplied down when too many were.
///
/// # Examples
///
/// ```
/// use hgs_vrptw::evaluation::{PenaltyManager, PenaltyParams};
///
/// let mut pm = PenaltyManager::new(PenaltyParams::default()).unwrap();
/// let before = pm.weights();
/// for _ in 0..100 {
///     pm.register(false, false); // nothing feasible: weights go up
/// }
/// assert!(pm.weights().capacity > before.capacity);
/// assert!(pm.weights().time_warp > before.time_warp);
/// ```
#[derive(Debug, Clone)]
pub struct PenaltyManager {
    params: PenaltyParams,
    capacity_penalty: i64,
    time_warp_penalty: i64,
    capacity_feasible: Vec<bool>,
    time_warp_feasible: Vec<bool>,
}

impl PenaltyManager {
    /// Creates a manager with validated parameters.
    pub fn new(params: PenaltyParams) -> Result<Self, SolverError> {
        params.validate()?;
        Ok(Self {
            capacity_penalty: params.init_capacity_penalty,
            time_warp_penalty: params.init_time_warp_penalty,
            capacity_feasible: Vec::with_capacity(params.num_registrations),
            time_warp_feasible: Vec::with_capacity(params.num_registrations),
            params,
        })
    }

    /// Current penalty weights.
    pub fn weights(&self) -> PenaltyWeights {
        PenaltyWeights {
            capacity: self.capacity_penalty,
            time_warp: self.time_warp_penalty,
        }
    }

    /// Weights multiplied by the repair booster, for the repair phase of
    /// local search on infeasible offspring.
    pub fn boosted_weights(&self) -> PenaltyWeights {
        PenaltyWeights {
            capacity: self.capacity_penalty * self.params.repair_booster,
            time_warp: self.time_warp_penalty * self.params.repair_booster,
        }
    }

    /// Registers one offspring's per-constraint feasibility; adapts the
    /// weights whenever the observation window fills up.
    pub fn register(&mut self, capacity_feasible: bool, time_warp_feasible: bool) {
        self.capacity_feasible.push(capacity_feasible);
        self.time_warp_feasible.push(time_warp_feasible);

        if self.capacity_feasible.len() < self.params.num_registrations {
            return;
        }

        let cap_frac = fraction(&self.capacity_feasible);
        let tw_frac = fraction(&self.time_warp_feasible);
        self.capacity_penalty = self.adapted(self.capacity_penalty, cap_frac);
        self.time_warp_penalty = self.adapted(self.time_warp_penalty, tw_frac);
        log::debug!(
            "penalty update: capacity {} (feasible {:.2}), time warp {} (feasible {:.2})",
            self.capacity_penalty,
            cap_frac,
            self.time_warp_penalty,
            tw_frac
        );
        self.capacity_feasible.clear();
        self.time_warp_feasible.clear();
    }

    fn adapted(&self, weight: i64, feasible_fraction: f64) -> i64 {
        let target = self.params.target_feasible;
        let updated = if feasible_fraction < target - TARGET_DEVIATION {
            (weight as f64 * self.params.penalty_increase).ceil() as i64
        } else if feasible_fraction > target + TARGET_DEVIATION {
            (weight as f64 * self.params.penalty_decrease).floor() as i64
        } else {
            weight
        };
        updated.max(1)
    }
}

fn fraction(window: &[bool]) -> f64 {
    window.iter().filter(|&&feasible| feasible).count() as f64 / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_cost() {
        let weights = PenaltyWeights {
            capacity: 3,
            time_warp: 5,
        };
        assert_eq!(weights.cost(100, 2, 4), 100 + 6 + 20);
        assert_eq!(weights.cost(100, 0, 0), 100);
    }

    #[test]
    fn test_validation() {
        let mut params = PenaltyParams::default();
        params.target_feasible = 1.5;
        assert!(PenaltyManager::new(params).is_err());

        let mut params = PenaltyParams::default();
        params.penalty_increase = 0.9;
        assert!(PenaltyManager::new(params).is_err());

        let mut params = PenaltyParams::default();
        params.penalty_decrease = 1.4;
        assert!(PenaltyManager::new(params).is_err());
    }

    #[test]
    fn test_increase_on_infeasibility() {
        let params = PenaltyParams {
            num_registrations: 4,
            ..PenaltyParams::default()
        };
        let mut pm = PenaltyManager::new(params).expect("valid");
        for _ in 0..4 {
            pm.register(false, true);
        }
        // Capacity weight rises (ceil(20 * 1.2) = 24); time-warp weight
        // falls (floor(6 * 0.85) = 5) because every offspring was feasible.
        assert_eq!(pm.weights().capacity, 24);
        assert_eq!(pm.weights().time_warp, 5);
    }

    #[test]
    fn test_weights_never_drop_below_one() {
        let params = PenaltyParams {
            num_registrations: 1,
            init_capacity_penalty: 1,
            init_time_warp_penalty: 1,
            ..PenaltyParams::default()
        };
        let mut pm = PenaltyManager::new(params).expect("valid");
        for _ in 0..10 {
            pm.register(true, true);
        }
        assert_eq!(pm.weights().capacity, 1);
        assert_eq!(pm.weights().time_warp, 1);
    }

    #[test]
    fn test_within_dead_band_unchanged() {
        let params = PenaltyParams {
            num_registrations: 100,
            target_feasible: 0.43,
            ..PenaltyParams::default()
        };
        let mut pm = PenaltyManager::new(params).expect("valid");
        let before = pm.weights();
        // 43 feasible out of 100 lands exactly on target.
        for i in 0..100 {
            pm.register(i < 43, i < 43);
        }
        assert_eq!(pm.weights(), before);
    }

    #[test]
    fn test_booster() {
        let pm = PenaltyManager::new(PenaltyParams::default()).expect("valid");
        let boosted = pm.boosted_weights();
        let base = pm.weights();
        assert_eq!(boosted.capacity, base.capacity * 10);
        assert_eq!(boosted.time_warp, base.time_warp * 10);
    }
}
