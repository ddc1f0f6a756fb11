//! The dynamic environment contract.
//!
//! The dispatcher drives an external state machine: `reset` yields the first
//! epoch observation and the static context, `step` submits an epoch
//! solution and yields the reward, and the hindsight problem reveals the
//! realized requests after the run for offline bounding.

use crate::error::SolverError;
use crate::models::{Individual, Instance};

/// The pending requests of one epoch.
///
/// Entry `0` is the depot; entries `1..` are requests. `request_idx` carries
/// ids that are stable across epochs, `customer_idx` maps every entry into
/// the static context. Time windows and release times are local to the
/// epoch's planning start time.
#[derive(Debug, Clone)]
pub struct EpochInstance {
    /// Stable request ids (0 for the depot, negative for simulated ones).
    pub request_idx: Vec<i64>,
    /// Index of each entry in the static context.
    pub customer_idx: Vec<usize>,
    /// Depot mask; exactly entry 0 is set.
    pub is_depot: Vec<bool>,
    /// Requests whose deadline forbids postponing them.
    pub must_dispatch: Vec<bool>,
    /// Demand per entry.
    pub demands: Vec<i64>,
    /// Local time windows per entry.
    pub time_windows: Vec<(i64, i64)>,
    /// Service time per entry.
    pub service_times: Vec<i64>,
    /// Local release time per entry.
    pub release_times: Vec<i64>,
}

impl EpochInstance {
    /// Number of entries, including the depot.
    pub fn len(&self) -> usize {
        self.request_idx.len()
    }

    /// Returns `true` if only the depot is present.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Number of requests (entries excluding the depot).
    pub fn num_requests(&self) -> usize {
        self.len() - 1
    }

    /// Keeps the entries selected by the mask; the depot always survives.
    pub fn filter(&self, mask: &[bool]) -> EpochInstance {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| i == 0 || mask[i])
            .collect();
        EpochInstance {
            request_idx: keep.iter().map(|&i| self.request_idx[i]).collect(),
            customer_idx: keep.iter().map(|&i| self.customer_idx[i]).collect(),
            is_depot: keep.iter().map(|&i| self.is_depot[i]).collect(),
            must_dispatch: keep.iter().map(|&i| self.must_dispatch[i]).collect(),
            demands: keep.iter().map(|&i| self.demands[i]).collect(),
            time_windows: keep.iter().map(|&i| self.time_windows[i]).collect(),
            service_times: keep.iter().map(|&i| self.service_times[i]).collect(),
            release_times: keep.iter().map(|&i| self.release_times[i]).collect(),
        }
    }

    /// Builds a solvable instance: durations are sliced out of the static
    /// context by customer index, all other attributes are local.
    pub fn to_instance(&self, context: &Instance) -> Result<Instance, SolverError> {
        for &customer in &self.customer_idx {
            if customer >= context.num_locations() {
                return Err(SolverError::EnvironmentError(format!(
                    "customer index {customer} outside the static context"
                )));
            }
        }
        let coords = self
            .customer_idx
            .iter()
            .map(|&c| context.coords(c))
            .collect();
        Instance::new(
            coords,
            self.demands.clone(),
            self.time_windows.clone(),
            self.service_times.clone(),
            self.release_times.clone(),
            context.capacity(),
            context.durations().submatrix(&self.customer_idx),
        )
    }

    /// Maps a solved individual's routes back to environment request ids.
    pub fn routes_to_requests(&self, individual: &Individual) -> Vec<Vec<i64>> {
        individual
            .nonempty_routes()
            .map(|route| route.iter().map(|&c| self.request_idx[c]).collect())
            .collect()
    }
}

/// Static information revealed once, at reset.
#[derive(Debug, Clone)]
pub struct StaticInfo {
    /// First epoch index.
    pub start_epoch: usize,
    /// Last epoch index.
    pub end_epoch: usize,
    /// Wall-clock budget per epoch.
    pub epoch_tlim: std::time::Duration,
    /// The full static context requests are sampled from.
    pub context: Instance,
}

/// One epoch's observation.
#[derive(Debug, Clone)]
pub struct EpochObservation {
    /// Index of the current epoch.
    pub current_epoch: usize,
    /// Absolute time the epoch's planning starts at.
    pub planning_start_time: i64,
    /// The pending requests.
    pub epoch_instance: EpochInstance,
}

/// Result of submitting an epoch solution.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The next observation, absent once the run is done.
    pub observation: Option<EpochObservation>,
    /// Negative routing cost of the submitted epoch solution.
    pub reward: i64,
    /// Whether all epochs have been played.
    pub done: bool,
}

/// The dispatcher's view of the epoch state machine.
pub trait Environment {
    /// Starts a run; returns the first observation and the static info.
    fn reset(&mut self) -> Result<(EpochObservation, StaticInfo), SolverError>;

    /// Submits the epoch solution (routes of request ids).
    fn step(&mut self, solution: Vec<Vec<i64>>) -> Result<StepOutcome, SolverError>;

    /// Reveals the realized problem; only valid after the run is done.
    fn hindsight_problem(&self) -> Result<Instance, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Matrix;

    fn context() -> Instance {
        let durations = Matrix::from_data(
            4,
            vec![
                0, 4, 6, 9, //
                4, 0, 5, 7, //
                6, 5, 0, 3, //
                9, 7, 3, 0,
            ],
        )
        .expect("valid");
        Instance::new(
            vec![(0, 0), (4, 0), (0, 6), (3, 8)],
            vec![0, 10, 20, 5],
            vec![(0, 10_000); 4],
            vec![0, 10, 10, 10],
            vec![0; 4],
            30,
            durations,
        )
        .expect("valid instance")
    }

    fn epoch() -> EpochInstance {
        EpochInstance {
            request_idx: vec![0, 17, 18],
            customer_idx: vec![0, 2, 3],
            is_depot: vec![true, false, false],
            must_dispatch: vec![false, true, false],
            demands: vec![0, 20, 5],
            time_windows: vec![(0, 5000), (0, 4000), (0, 4000)],
            service_times: vec![0, 10, 10],
            release_times: vec![0, 0, 0],
        }
    }

    #[test]
    fn test_filter_keeps_depot() {
        let filtered = epoch().filter(&[false, false, true]);
        assert_eq!(filtered.request_idx, vec![0, 18]);
        assert_eq!(filtered.customer_idx, vec![0, 3]);
        assert!(filtered.is_depot[0]);
    }

    #[test]
    fn test_to_instance_slices_durations() {
        let ctx = context();
        let instance = epoch().to_instance(&ctx).expect("valid");
        assert_eq!(instance.num_locations(), 3);
        // Entry 1 is customer 2, entry 2 is customer 3.
        assert_eq!(instance.duration(1, 2), ctx.duration(2, 3));
        assert_eq!(instance.duration(2, 1), ctx.duration(3, 2));
        assert_eq!(instance.demand(1), 20);
    }

    #[test]
    fn test_to_instance_rejects_bad_customer() {
        let ctx = context();
        let mut ep = epoch();
        ep.customer_idx[2] = 9;
        assert!(matches!(
            ep.to_instance(&ctx),
            Err(SolverError::EnvironmentError(_))
        ));
    }

    #[test]
    fn test_routes_to_requests() {
        let ctx = context();
        let ep = epoch();
        let instance = ep.to_instance(&ctx).expect("valid");
        let individual = crate::models::Individual::new(&instance, vec![vec![1, 2]]);
        assert_eq!(ep.routes_to_requests(&individual), vec![vec![17, 18]]);
    }
}
