//! VRPLIB-style instance reading and writing.
//!
//! The supported dialect uses explicit full-matrix edge weights and
//! section-per-attribute layout: `EDGE_WEIGHT_SECTION`,
//! `NODE_COORD_SECTION`, `DEMAND_SECTION`, `DEPOT_SECTION` (terminated by
//! `-1`), `TIME_WINDOW_SECTION`, `SERVICE_TIME_SECTION` and an optional
//! `RELEASE_TIME_SECTION`. Indices are 1-based with the depot at index 1;
//! every numeric field is an integer.

use std::fmt::Write as _;
use std::path::Path;

use itertools::Itertools;

use crate::error::SolverError;
use crate::models::{Instance, Matrix};

fn invalid(message: impl Into<String>) -> SolverError {
    SolverError::InvalidInstance(message.into())
}

fn parse_int(token: &str) -> Result<i64, SolverError> {
    token
        .parse()
        .map_err(|_| invalid(format!("not an integer: {token:?}")))
}

/// Parses an instance from VRPLIB text.
pub fn parse_instance(text: &str) -> Result<Instance, SolverError> {
    let mut dimension: Option<usize> = None;
    let mut capacity: Option<i64> = None;
    let mut edge_weight_type: Option<String> = None;
    let mut edge_weight_format: Option<String> = None;

    let mut weights: Vec<i64> = Vec::new();
    let mut coords: Vec<(i64, i64)> = Vec::new();
    let mut demands: Vec<i64> = Vec::new();
    let mut time_windows: Vec<(i64, i64)> = Vec::new();
    let mut service_times: Vec<i64> = Vec::new();
    let mut release_times: Vec<i64> = Vec::new();
    let mut depots: Vec<i64> = Vec::new();

    #[derive(PartialEq, Clone, Copy)]
    enum Section {
        None,
        EdgeWeights,
        Coords,
        Demands,
        Depot,
        TimeWindows,
        ServiceTimes,
        ReleaseTimes,
    }
    let mut section = Section::None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "EOF" {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            match key {
                "DIMENSION" => dimension = Some(parse_int(value)? as usize),
                "CAPACITY" => capacity = Some(parse_int(value)?),
                "EDGE_WEIGHT_TYPE" => edge_weight_type = Some(value.to_string()),
                "EDGE_WEIGHT_FORMAT" => edge_weight_format = Some(value.to_string()),
                // NAME, TYPE, COMMENT and the like are ignored.
                _ => {}
            }
            continue;
        }

        section = match line {
            "EDGE_WEIGHT_SECTION" => Section::EdgeWeights,
            "NODE_COORD_SECTION" => Section::Coords,
            "DEMAND_SECTION" => Section::Demands,
            "DEPOT_SECTION" => Section::Depot,
            "TIME_WINDOW_SECTION" => Section::TimeWindows,
            "SERVICE_TIME_SECTION" => Section::ServiceTimes,
            "RELEASE_TIME_SECTION" => Section::ReleaseTimes,
            _ => {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                match section {
                    Section::EdgeWeights => {
                        for token in tokens {
                            weights.push(parse_int(token)?);
                        }
                    }
                    Section::Coords => {
                        if tokens.len() != 3 {
                            return Err(invalid(format!("malformed coordinate line: {line:?}")));
                        }
                        coords.push((parse_int(tokens[1])?, parse_int(tokens[2])?));
                    }
                    Section::Demands => {
                        if tokens.len() != 2 {
                            return Err(invalid(format!("malformed demand line: {line:?}")));
                        }
                        demands.push(parse_int(tokens[1])?);
                    }
                    Section::Depot => {
                        for token in tokens {
                            depots.push(parse_int(token)?);
                        }
                    }
                    Section::TimeWindows => {
                        if tokens.len() != 3 {
                            return Err(invalid(format!("malformed time window line: {line:?}")));
                        }
                        time_windows.push((parse_int(tokens[1])?, parse_int(tokens[2])?));
                    }
                    Section::ServiceTimes => {
                        if tokens.len() != 2 {
                            return Err(invalid(format!("malformed service line: {line:?}")));
                        }
                        service_times.push(parse_int(tokens[1])?);
                    }
                    Section::ReleaseTimes => {
                        if tokens.len() != 2 {
                            return Err(invalid(format!("malformed release line: {line:?}")));
                        }
                        release_times.push(parse_int(tokens[1])?);
                    }
                    Section::None => {
                        return Err(invalid(format!("unexpected line outside sections: {line:?}")));
                    }
                }
                section
            }
        };
    }

    let n = dimension.ok_or_else(|| invalid("missing DIMENSION"))?;
    let capacity = capacity.ok_or_else(|| invalid("missing CAPACITY"))?;
    match edge_weight_type.as_deref() {
        Some("EXPLICIT") => {}
        other => return Err(invalid(format!("unsupported EDGE_WEIGHT_TYPE {other:?}"))),
    }
    match edge_weight_format.as_deref() {
        Some("FULL_MATRIX") => {}
        other => return Err(invalid(format!("unsupported EDGE_WEIGHT_FORMAT {other:?}"))),
    }
    if depots.first() != Some(&1) || depots.get(1) != Some(&-1) {
        return Err(invalid("DEPOT_SECTION must contain depot 1 terminated by -1"));
    }
    let durations = Matrix::from_data(n, weights)
        .ok_or_else(|| invalid("EDGE_WEIGHT_SECTION does not match DIMENSION"))?;
    if release_times.is_empty() {
        release_times = vec![0; n];
    }

    Instance::new(
        coords,
        demands,
        time_windows,
        service_times,
        release_times,
        capacity,
        durations,
    )
}

/// Reads and parses an instance file.
pub fn read_instance(path: impl AsRef<Path>) -> Result<Instance, SolverError> {
    let text = std::fs::read_to_string(path)?;
    parse_instance(&text)
}

/// Writes an instance in the canonical form `parse_instance` accepts.
///
/// Writing, parsing and re-writing yields byte-identical text.
pub fn write_instance(instance: &Instance) -> String {
    let n = instance.num_locations();
    let mut out = String::new();

    let _ = writeln!(out, "DIMENSION : {n}");
    let _ = writeln!(out, "CAPACITY : {}", instance.capacity());
    let _ = writeln!(out, "EDGE_WEIGHT_TYPE : EXPLICIT");
    let _ = writeln!(out, "EDGE_WEIGHT_FORMAT : FULL_MATRIX");

    let _ = writeln!(out, "EDGE_WEIGHT_SECTION");
    for i in 0..n {
        let row = (0..n).map(|j| instance.duration(i, j)).join(" ");
        let _ = writeln!(out, "{row}");
    }

    let _ = writeln!(out, "NODE_COORD_SECTION");
    for i in 0..n {
        let (x, y) = instance.coords(i);
        let _ = writeln!(out, "{} {x} {y}", i + 1);
    }

    let _ = writeln!(out, "DEMAND_SECTION");
    for i in 0..n {
        let _ = writeln!(out, "{} {}", i + 1, instance.demand(i));
    }

    let _ = writeln!(out, "DEPOT_SECTION");
    let _ = writeln!(out, "1");
    let _ = writeln!(out, "-1");

    let _ = writeln!(out, "TIME_WINDOW_SECTION");
    for i in 0..n {
        let _ = writeln!(out, "{} {} {}", i + 1, instance.early(i), instance.late(i));
    }

    let _ = writeln!(out, "SERVICE_TIME_SECTION");
    for i in 0..n {
        let _ = writeln!(out, "{} {}", i + 1, instance.service(i));
    }

    if (0..n).any(|i| instance.release(i) != 0) {
        let _ = writeln!(out, "RELEASE_TIME_SECTION");
        for i in 0..n {
            let _ = writeln!(out, "{} {}", i + 1, instance.release(i));
        }
    }

    let _ = writeln!(out, "EOF");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
DIMENSION : 3
CAPACITY : 30
EDGE_WEIGHT_TYPE : EXPLICIT
EDGE_WEIGHT_FORMAT : FULL_MATRIX
EDGE_WEIGHT_SECTION
0 4 6
4 0 5
6 5 0
NODE_COORD_SECTION
1 0 0
2 4 0
3 0 6
DEMAND_SECTION
1 0
2 10
3 20
DEPOT_SECTION
1
-1
TIME_WINDOW_SECTION
1 0 1000
2 0 500
3 10 500
SERVICE_TIME_SECTION
1 0
2 10
3 10
EOF
";

    #[test]
    fn test_parse_small() {
        let instance = parse_instance(SMALL).expect("valid");
        assert_eq!(instance.num_locations(), 3);
        assert_eq!(instance.capacity(), 30);
        assert_eq!(instance.duration(0, 2), 6);
        assert_eq!(instance.demand(2), 20);
        assert_eq!(instance.early(2), 10);
        assert_eq!(instance.service(1), 10);
        assert_eq!(instance.release(1), 0);
    }

    #[test]
    fn test_round_trip_is_identical() {
        let instance = parse_instance(SMALL).expect("valid");
        let written = write_instance(&instance);
        let reparsed = parse_instance(&written).expect("valid");
        assert_eq!(write_instance(&reparsed), written);
    }

    #[test]
    fn test_release_times_round_trip() {
        let with_releases = SMALL.replace(
            "EOF",
            "RELEASE_TIME_SECTION\n1 0\n2 3600\n3 0\nEOF",
        );
        let instance = parse_instance(&with_releases).expect("valid");
        assert_eq!(instance.release(1), 3600);
        let written = write_instance(&instance);
        assert!(written.contains("RELEASE_TIME_SECTION"));
        let reparsed = parse_instance(&written).expect("valid");
        assert_eq!(write_instance(&reparsed), written);
    }

    #[test]
    fn test_rejects_missing_dimension() {
        let broken = SMALL.replace("DIMENSION : 3\n", "");
        assert!(matches!(
            parse_instance(&broken),
            Err(SolverError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_matrix_size() {
        let broken = SMALL.replace("0 4 6\n", "");
        assert!(matches!(
            parse_instance(&broken),
            Err(SolverError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_rejects_unsupported_weight_type() {
        let broken = SMALL.replace("EXPLICIT", "EUC_2D");
        assert!(matches!(
            parse_instance(&broken),
            Err(SolverError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_rejects_negative_duration() {
        let broken = SMALL.replace("0 4 6", "0 -4 6");
        assert!(matches!(
            parse_instance(&broken),
            Err(SolverError::InvalidInstance(_))
        ));
    }

    mod properties {
        use super::*;
        use crate::models::Instance;
        use proptest::prelude::*;

        fn arbitrary_instance() -> impl Strategy<Value = Instance> {
            (1usize..=5).prop_flat_map(|n| {
                let locations = n + 1;
                (
                    proptest::collection::vec(0i64..500, locations * locations),
                    proptest::collection::vec((-50i64..50, -50i64..50), locations),
                    proptest::collection::vec((0i64..300, 0i64..300), locations),
                    proptest::collection::vec(0i64..30, locations),
                    proptest::collection::vec(0i64..2, locations),
                    Just(n),
                )
                    .prop_map(|(mut durations, coords, windows, services, releases, n)| {
                        let locations = n + 1;
                        for i in 0..locations {
                            durations[i * locations + i] = 0;
                        }
                        let time_windows: Vec<(i64, i64)> = windows
                            .into_iter()
                            .map(|(a, b)| (a.min(b), a.max(b)))
                            .collect();
                        let mut services = services;
                        services[0] = 0;
                        let mut releases: Vec<i64> =
                            releases.into_iter().map(|r| r * 3600).collect();
                        releases[0] = 0;
                        Instance::new(
                            coords,
                            std::iter::once(0)
                                .chain(std::iter::repeat(7).take(n))
                                .collect(),
                            time_windows,
                            services,
                            releases,
                            50,
                            Matrix::from_data(locations, durations).expect("sized"),
                        )
                        .expect("valid instance")
                    })
            })
        }

        proptest! {
            #[test]
            fn write_parse_write_is_identity(instance in arbitrary_instance()) {
                let written = write_instance(&instance);
                let reparsed = parse_instance(&written).expect("parses");
                prop_assert_eq!(write_instance(&reparsed), written);
            }
        }
    }

    #[test]
    fn test_depot_section_must_terminate() {
        let broken = SMALL.replace("DEPOT_SECTION\n1\n-1\n", "DEPOT_SECTION\n1\n");
        assert!(matches!(
            parse_instance(&broken),
            Err(SolverError::InvalidInstance(_))
        ));
    }
}
