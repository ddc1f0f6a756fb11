//! RelocateStar route operator.
//!
//! For a pair of routes, finds the single best relocation of one client from
//! either route into any position of the other, and applies it when it
//! strictly improves the penalized cost. Runs after the node operators have
//! converged, where only moves beyond the granular neighbourhood remain.

use crate::evaluation::PenaltyWeights;
use crate::models::Instance;

use super::route::SearchRoute;

/// Tries the best relocation between the two routes; applies and returns
/// `true` if one strictly improves.
pub(crate) fn relocate_star(
    instance: &Instance,
    weights: PenaltyWeights,
    routes: &mut [SearchRoute],
    r1: usize,
    r2: usize,
) -> bool {
    let mut best: Option<(i64, usize, usize, usize, usize)> = None;

    for (from, to) in [(r1, r2), (r2, r1)] {
        let route_from = &routes[from];
        let route_to = &routes[to];
        let old = route_from.cost(instance, weights) + route_to.cost(instance, weights);

        for idx in 1..=route_from.len() {
            let client = route_from.stop_at(idx);
            let removed = route_from.replaced_cost(instance, weights, idx, idx, &[]);
            for after in 0..=route_to.len() {
                let inserted =
                    route_to.replaced_cost(instance, weights, after + 1, after, &[client]);
                let delta = removed + inserted - old;
                if best.map_or(delta < 0, |(b, ..)| delta < b) {
                    best = Some((delta, from, to, idx, after));
                }
            }
        }
    }

    match best {
        Some((delta, from, to, idx, after)) if delta < 0 => {
            let client = routes[from].clients_mut().remove(idx - 1);
            routes[to].clients_mut().insert(after, client);
            routes[from].rebuild(instance);
            routes[to].rebuild(instance);
            true
        }
        _ => false,
    }
}
