//! Selective route exchange.
//!
//! # Algorithm
//!
//! A contiguous block of routes is copied verbatim from the first parent.
//! The remaining clients are taken from the second parent in its own route
//! order, skipping those already served by the block. When the vehicle bound
//! leaves no room for a leftover route, its clients are repaired into the
//! child by greedy cheapest insertion.
//!
//! # Reference
//!
//! Nagata, Y., Bräysy, O. (2009). "Edge assembly-based memetic algorithm
//! for the capacitated vehicle routing problem", *Networks* 54(4), 205-215.

use rand::Rng;

use crate::evaluation::PenaltyWeights;
use crate::models::{Individual, Instance};
use crate::search::SearchRoute;

use super::greedy_insert;

/// Combines two parents into one child by exchanging a block of routes.
pub fn selective_route_exchange<R: Rng>(
    instance: &Instance,
    weights: PenaltyWeights,
    parents: (&Individual, &Individual),
    rng: &mut R,
) -> Individual {
    let (parent_a, parent_b) = parents;
    let a_routes: Vec<&Vec<usize>> = parent_a.nonempty_routes().collect();
    if a_routes.is_empty() {
        return parent_b.clone();
    }

    // A contiguous (wrapping) block of routes from parent A.
    let num_routes = a_routes.len();
    let block_size = rng.random_range(1..=(num_routes / 2).max(1));
    let block_start = rng.random_range(0..num_routes);

    let mut in_block = vec![false; instance.num_locations()];
    let mut child_routes: Vec<Vec<usize>> = Vec::new();
    for offset in 0..block_size {
        let route = a_routes[(block_start + offset) % num_routes];
        for &client in route {
            in_block[client] = true;
        }
        child_routes.push(route.clone());
    }

    // Complete from parent B, respecting its ordering. Routes that no
    // longer fit under the vehicle bound spill into the repair set.
    let max_routes = instance.num_vehicles().max(block_size);
    let mut leftovers: Vec<usize> = Vec::new();
    for route in parent_b.nonempty_routes() {
        let filtered: Vec<usize> = route
            .iter()
            .copied()
            .filter(|&c| !in_block[c])
            .collect();
        if filtered.is_empty() {
            continue;
        }
        if child_routes.len() < max_routes {
            child_routes.push(filtered);
        } else {
            leftovers.extend(filtered);
        }
    }

    if leftovers.is_empty() {
        return Individual::new(instance, child_routes);
    }

    let mut routes: Vec<SearchRoute> = child_routes
        .into_iter()
        .map(|clients| SearchRoute::new(instance, clients))
        .collect();
    greedy_insert(instance, weights, &mut routes, &leftovers);
    Individual::new(
        instance,
        routes.into_iter().map(|r| r.clients().to_vec()).collect(),
    )
}
