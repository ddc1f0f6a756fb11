//! Rollout dispatching.
//!
//! # Algorithm
//!
//! Each epoch, Monte-Carlo simulations of the near future decide which
//! pending requests can wait. A simulation samples lookahead requests,
//! solves the combined instance, and counts a request as dispatched when its
//! route carries at least one must-dispatch request. After each cycle of
//! simulations the rarely-dispatched requests are marked postponed (which
//! pushes their release time into the next epoch for subsequent cycles);
//! after the final cycle everything not postponed is dispatched.

use std::time::Instant;

use rand::Rng;

use crate::config::DynamicConfig;
use crate::error::SolverError;
use crate::ga;
use crate::stop::StopCriterion;

use super::environment::{EpochObservation, StaticInfo};
use super::simulate::simulate_instance;

/// Computes the dispatch mask for the current epoch.
///
/// The final epoch dispatches everything. Otherwise the mask is
/// `depot ∪ must-dispatch ∪ not-postponed` after the simulation cycles.
pub(crate) fn rollout_dispatch<R: Rng>(
    observation: &EpochObservation,
    info: &StaticInfo,
    config: &DynamicConfig,
    rng: &mut R,
) -> Result<Vec<bool>, SolverError> {
    let epoch = &observation.epoch_instance;
    let n = epoch.len();

    if observation.current_epoch >= info.end_epoch {
        return Ok(vec![true; n]);
    }

    let budget = info.epoch_tlim.mul_f64(config.simulate_tlim_factor);
    let per_sim = budget / (config.n_cycles * config.n_simulations) as u32;
    let cycle_cost = per_sim * config.n_simulations as u32;
    let started = Instant::now();

    let epochs_left = info.end_epoch - observation.current_epoch;
    let threshold = config.threshold_for(observation.current_epoch - info.start_epoch);

    let mut postpone = vec![false; n];
    for cycle in 0..config.n_cycles {
        // A cycle that cannot fit in the remaining budget is skipped, never
        // interrupted halfway.
        if started.elapsed() + cycle_cost > budget {
            log::debug!("skipping rollout cycle {cycle}: budget exhausted");
            break;
        }

        let mut dispatched_count = vec![0usize; n];
        let mut sims_done = 0usize;
        for _ in 0..config.n_simulations {
            let sim = simulate_instance(
                &info.context,
                epoch,
                &postpone,
                observation.planning_start_time,
                epochs_left,
                config.n_lookahead,
                config.n_requests,
                rng,
            );
            let instance = sim.to_instance(&info.context)?;
            let result = ga::solve(
                &instance,
                &config.simulate,
                rng.random(),
                &StopCriterion::MaxRuntime(per_sim),
            )?;
            let Some(best) = result.best_feasible else {
                continue;
            };

            for route in best.nonempty_routes() {
                let carries_must_dispatch = route
                    .iter()
                    .any(|&c| c < n && epoch.must_dispatch[c]);
                if !carries_must_dispatch {
                    continue;
                }
                for &c in route {
                    if c < n {
                        dispatched_count[c] += 1;
                    }
                }
            }
            sims_done += 1;
        }

        let denom = if sims_done > 0 {
            sims_done
        } else {
            config.n_simulations
        };
        for i in 1..n {
            if !epoch.must_dispatch[i] {
                postpone[i] =
                    (denom - dispatched_count[i]) as f64 >= threshold * denom as f64;
            }
        }
    }

    Ok((0..n)
        .map(|i| epoch.is_depot[i] || epoch.must_dispatch[i] || !postpone[i])
        .collect())
}
