//! Solution text format.
//!
//! One line per non-empty route, then the cost:
//!
//! ```text
//! Route #1: 1 3 2
//! Route #2: 4
//! Cost 123
//! ```

use std::fmt::Write as _;

use itertools::Itertools;

use crate::error::SolverError;
use crate::models::Individual;

/// Writes an individual's routes and cost in the solution format.
pub fn write_solution(individual: &Individual, cost: i64) -> String {
    let mut out = String::new();
    for (number, route) in individual.nonempty_routes().enumerate() {
        let _ = writeln!(out, "Route #{}: {}", number + 1, route.iter().join(" "));
    }
    let _ = writeln!(out, "Cost {cost}");
    out
}

/// Parses solution text back into routes and the reported cost.
pub fn parse_solution(text: &str) -> Result<(Vec<Vec<usize>>, i64), SolverError> {
    let mut routes = Vec::new();
    let mut cost = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Route #") {
            let (_, clients) = rest.split_once(':').ok_or_else(|| {
                SolverError::InvalidInstance(format!("malformed route line: {line:?}"))
            })?;
            let route: Result<Vec<usize>, _> = clients
                .split_whitespace()
                .map(|token| {
                    token.parse::<usize>().map_err(|_| {
                        SolverError::InvalidInstance(format!("bad client index: {token:?}"))
                    })
                })
                .collect();
            routes.push(route?);
        } else if let Some(value) = line.strip_prefix("Cost") {
            cost = Some(value.trim().parse::<i64>().map_err(|_| {
                SolverError::InvalidInstance(format!("bad cost value: {value:?}"))
            })?);
        } else {
            return Err(SolverError::InvalidInstance(format!(
                "unexpected solution line: {line:?}"
            )));
        }
    }

    let cost = cost.ok_or_else(|| SolverError::InvalidInstance("missing Cost line".into()))?;
    Ok((routes, cost))
}
