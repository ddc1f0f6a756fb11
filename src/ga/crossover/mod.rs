//! Crossover operators.
//!
//! - [`selective_route_exchange()`] — SREX: a block of routes from one
//!   parent, completed in the other parent's order
//! - [`broken_pairs_exchange()`] — BPX: destroy edges the parents disagree
//!   on, reinsert greedily
//!
//! Both operators are fail-safe: whatever the parents look like, the child
//! serves every client exactly once (it may be infeasible, never invalid).

mod bpx;
mod srex;

pub use bpx::broken_pairs_exchange;
pub use srex::selective_route_exchange;

use rand::Rng;

use crate::evaluation::PenaltyWeights;
use crate::models::{Individual, Instance};
use crate::search::SearchRoute;

/// The crossover operators the driver can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverOperator {
    /// Selective route exchange.
    SelectiveRouteExchange,
    /// Broken pairs exchange.
    BrokenPairsExchange,
}

impl CrossoverOperator {
    /// Produces one child from the two parents.
    pub fn apply<R: Rng>(
        self,
        instance: &Instance,
        weights: PenaltyWeights,
        parents: (&Individual, &Individual),
        rng: &mut R,
    ) -> Individual {
        match self {
            Self::SelectiveRouteExchange => {
                selective_route_exchange(instance, weights, parents, rng)
            }
            Self::BrokenPairsExchange => broken_pairs_exchange(instance, weights, parents, rng),
        }
    }
}

/// Greedily inserts the given clients into the routes, each at the position
/// of minimum penalized insertion cost, in the order given.
pub(crate) fn greedy_insert(
    instance: &Instance,
    weights: PenaltyWeights,
    routes: &mut [SearchRoute],
    clients: &[usize],
) {
    for &client in clients {
        let mut best: Option<(i64, usize, usize)> = None;
        for (route_idx, route) in routes.iter().enumerate() {
            let base = route.cost(instance, weights);
            for after in 0..=route.len() {
                let delta =
                    route.replaced_cost(instance, weights, after + 1, after, &[client]) - base;
                if best.map_or(true, |(b, ..)| delta < b) {
                    best = Some((delta, route_idx, after));
                }
            }
        }
        let (_, route_idx, after) = best.expect("at least one route to insert into");
        routes[route_idx].clients_mut().insert(after, client);
        routes[route_idx].rebuild(instance);
    }
}

/// Shuffles a client list in place (Fisher-Yates).
pub(crate) fn shuffle<R: Rng>(clients: &mut [usize], rng: &mut R) {
    for i in (1..clients.len()).rev() {
        let j = rng.random_range(0..=i);
        clients.swap(i, j);
    }
}
