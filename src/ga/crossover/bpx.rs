//! Broken pairs exchange.
//!
//! # Algorithm
//!
//! The clients on whose successor the parents disagree mark the edges worth
//! questioning. Half of them (chosen at random) are removed from the first
//! parent's routes and greedily reinserted at minimum penalized cost. With
//! identical parents there is nothing to destroy and the child is a copy.

use rand::Rng;

use crate::evaluation::PenaltyWeights;
use crate::models::{Individual, Instance};
use crate::search::SearchRoute;

use super::{greedy_insert, shuffle};

/// Combines two parents by re-routing the clients they disagree on.
pub fn broken_pairs_exchange<R: Rng>(
    instance: &Instance,
    weights: PenaltyWeights,
    parents: (&Individual, &Individual),
    rng: &mut R,
) -> Individual {
    let (parent_a, parent_b) = parents;

    let mut broken: Vec<usize> = (1..instance.num_locations())
        .filter(|&c| parent_a.successor(c) != parent_b.successor(c))
        .collect();
    if broken.is_empty() {
        return parent_a.clone();
    }

    shuffle(&mut broken, rng);
    let destroyed = &broken[..broken.len().div_ceil(2)];

    let mut removed = vec![false; instance.num_locations()];
    for &client in destroyed {
        removed[client] = true;
    }

    let mut routes: Vec<SearchRoute> = parent_a
        .routes()
        .iter()
        .map(|route| {
            let kept: Vec<usize> = route.iter().copied().filter(|&c| !removed[c]).collect();
            SearchRoute::new(instance, kept)
        })
        .collect();

    greedy_insert(instance, weights, &mut routes, destroyed);
    Individual::new(
        instance,
        routes.into_iter().map(|r| r.clients().to_vec()).collect(),
    )
}
