//! Stopping criteria.

use std::time::{Duration, Instant};

use crate::error::SolverError;

/// When the genetic algorithm should stop.
///
/// Exactly one criterion governs a run: either an iteration budget (fully
/// deterministic given a seed) or a wall-clock budget (a soft bound: the
/// iteration underway when the budget runs out is allowed to complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCriterion {
    /// Stop after this many genetic-algorithm iterations.
    MaxIterations(u64),
    /// Stop once this much wall-clock time has elapsed.
    MaxRuntime(Duration),
}

impl StopCriterion {
    /// Builds a criterion from optional limits; exactly one must be set.
    pub fn from_limits(
        max_iterations: Option<u64>,
        max_runtime: Option<Duration>,
    ) -> Result<Self, SolverError> {
        match (max_iterations, max_runtime) {
            (Some(iterations), None) => Ok(Self::MaxIterations(iterations)),
            (None, Some(runtime)) => Ok(Self::MaxRuntime(runtime)),
            (Some(_), Some(_)) => Err(SolverError::InvalidConfig(
                "maxIterations and maxRuntime are mutually exclusive".into(),
            )),
            (None, None) => Err(SolverError::InvalidConfig(
                "one of maxIterations or maxRuntime must be set".into(),
            )),
        }
    }

    /// Returns `true` once the budget is exhausted.
    pub fn should_stop(&self, iterations: u64, started: Instant) -> bool {
        match self {
            Self::MaxIterations(limit) => iterations >= *limit,
            Self::MaxRuntime(budget) => started.elapsed() >= *budget,
        }
    }

    /// The wall-clock deadline, if this is a runtime criterion.
    pub fn deadline(&self, started: Instant) -> Option<Instant> {
        match self {
            Self::MaxIterations(_) => None,
            Self::MaxRuntime(budget) => Some(started + *budget),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_limit() {
        assert!(StopCriterion::from_limits(Some(10), None).is_ok());
        assert!(StopCriterion::from_limits(None, Some(Duration::from_secs(1))).is_ok());
        assert!(StopCriterion::from_limits(None, None).is_err());
        assert!(StopCriterion::from_limits(Some(10), Some(Duration::from_secs(1))).is_err());
    }

    #[test]
    fn test_iteration_budget() {
        let stop = StopCriterion::MaxIterations(5);
        let started = Instant::now();
        assert!(!stop.should_stop(4, started));
        assert!(stop.should_stop(5, started));
        assert!(stop.deadline(started).is_none());
    }

    #[test]
    fn test_runtime_budget() {
        let stop = StopCriterion::MaxRuntime(Duration::from_secs(3600));
        let started = Instant::now();
        assert!(!stop.should_stop(0, started));
        assert!(stop.deadline(started).is_some());

        let exhausted = StopCriterion::MaxRuntime(Duration::ZERO);
        assert!(exhausted.should_stop(0, started));
    }
}
