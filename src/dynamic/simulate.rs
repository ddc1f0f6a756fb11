//! Lookahead instance sampling.
//!
//! # Algorithm
//!
//! Future epochs are simulated by sampling candidate requests from the
//! static context: for each one, independent uniform draws pick the customer
//! identity and the time-window, demand and service templates. A candidate
//! survives only if a dedicated vehicle could still serve it in a round trip
//! after its release. Survivors are appended to the epoch instance with
//! negative request ids so the dispatcher can tell them apart.

use rand::Rng;

use crate::models::Instance;

use super::environment::EpochInstance;
use super::EPOCH_DURATION;

/// Bounded retries when sampling yields no feasible request at all.
const MAX_SAMPLE_RETRIES: usize = 3;

/// Builds a simulation instance: the epoch's requests (with postponed ones
/// released one epoch later) plus sampled requests for the lookahead epochs.
pub(crate) fn simulate_instance<R: Rng>(
    context: &Instance,
    epoch: &EpochInstance,
    postpone: &[bool],
    start_time: i64,
    epochs_left: usize,
    n_lookahead: usize,
    n_requests: usize,
    rng: &mut R,
) -> EpochInstance {
    let mut sim = epoch.clone();
    for (i, release) in sim.release_times.iter_mut().enumerate() {
        *release = if postpone[i] { EPOCH_DURATION } else { 0 };
    }

    let lookahead = n_lookahead.min(epochs_left);
    if lookahead == 0 || context.num_clients() == 0 {
        return sim;
    }

    for _ in 0..MAX_SAMPLE_RETRIES {
        let before = sim.len();
        for future_epoch in 1..=lookahead {
            sample_epoch(context, &mut sim, start_time, future_epoch, n_requests, rng);
        }
        if sim.len() > before {
            break;
        }
    }
    sim
}

/// Samples one future epoch's worth of candidate requests into `sim`.
fn sample_epoch<R: Rng>(
    context: &Instance,
    sim: &mut EpochInstance,
    start_time: i64,
    future_epoch: usize,
    n_requests: usize,
    rng: &mut R,
) {
    let n = context.num_clients();
    let release = start_time + future_epoch as i64 * EPOCH_DURATION;

    for _ in 0..n_requests {
        let customer = rng.random_range(1..=n);
        let tw_template = rng.random_range(1..=n);
        let demand_template = rng.random_range(1..=n);
        let service_template = rng.random_range(1..=n);

        let (early, late) = (context.early(tw_template), context.late(tw_template));
        let service = context.service(service_template);

        // Feasibility as a singleton round trip: reach the customer within
        // its window and return before the depot closes.
        let earliest_arrival = (release + context.duration(0, customer)).max(early);
        let earliest_return = earliest_arrival + service + context.duration(customer, 0);
        if earliest_arrival > late || earliest_return > context.late(0) {
            continue;
        }

        let next_id = -(sim.request_idx.iter().filter(|&&r| r < 0).count() as i64 + 1);
        sim.request_idx.push(next_id);
        sim.customer_idx.push(customer);
        sim.is_depot.push(false);
        sim.must_dispatch.push(false);
        sim.demands.push(context.demand(demand_template));
        // Times are local to the planning start; the past is clipped away.
        sim.time_windows
            .push(((early - start_time).max(0), late - start_time));
        sim.service_times.push(service);
        sim.release_times.push(release - start_time);
    }
}
