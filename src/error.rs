//! Error types.

use thiserror::Error;

/// Errors produced by the solver, the dynamic dispatcher, and the I/O layer.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A configuration value is unknown, out of range, or conflicting.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An instance is malformed or internally inconsistent.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// No feasible solution was found within the stopping criterion.
    #[error("no feasible solution found")]
    Infeasible,

    /// The dynamic environment reported a protocol violation.
    #[error("environment error: {0}")]
    EnvironmentError(String),

    /// A cached cost diverged from its recomputation, indicating an
    /// incremental-update bug.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// An I/O failure while reading or writing instance files.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SolverError::InvalidConfig("targetFeasible out of range".into());
        assert!(err.to_string().contains("targetFeasible"));
        assert_eq!(SolverError::Infeasible.to_string(), "no feasible solution found");
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SolverError = io.into();
        assert!(matches!(err, SolverError::Io(_)));
    }
}
