// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::core::VertexId;

/// Broad classes of solver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: mesh, targets, cost function or solver parameters.
    Configuration,
    /// An invariant of the propagation was violated during a march.
    Internal,
    /// Reading or writing a cached potential field failed.
    Io,
}

/// Errors that can occur during solver setup, marching, or persistence.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The target shape set is empty.
    #[error("target shape set is empty")]
    EmptyTargetSet,
    /// No mesh vertex lies inside any target shape.
    #[error("no mesh vertex lies inside the target shapes")]
    NoInitialVertices,
    /// The time cost is not positive and finite at a vertex.
    #[error("invalid time cost at vertex {vertex}: {value} (must be positive and finite)")]
    InvalidCost {
        /// The vertex where the cost was evaluated.
        vertex: VertexId,
        /// The invalid value.
        value: f64,
    },
    /// Convergence tolerance is negative or not finite.
    #[error("invalid tolerance: {0} (must be non-negative and finite)")]
    InvalidTolerance(f64),
    /// The mesh topology or geometry is malformed.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// A relaxation produced a NaN or negative potential.
    #[error("numeric instability at vertex {vertex}: potential {value}")]
    NumericInstability {
        /// The vertex being relaxed.
        vertex: VertexId,
        /// The offending value.
        value: f64,
    },
    /// Maximum relaxation count exceeded (likely indicates non-convergence).
    #[error("max relaxations exceeded: limit was {limit}")]
    IterationLimitExceeded {
        /// The limit that was set.
        limit: u64,
    },
    /// The worker thread pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    /// Stored field length does not match the mesh.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Unsupported file format (unrecognized extension).
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    /// Encoding or decoding a .npy file failed.
    #[error("npy error: {0}")]
    Npy(String),
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SolverError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::EmptyTargetSet
            | SolverError::NoInitialVertices
            | SolverError::InvalidCost { .. }
            | SolverError::InvalidTolerance(_)
            | SolverError::InvalidMesh(_)
            | SolverError::ThreadPool(_) => ErrorKind::Configuration,
            SolverError::NumericInstability { .. } | SolverError::IterationLimitExceeded { .. } => {
                ErrorKind::Internal
            }
            SolverError::ShapeMismatch { .. }
            | SolverError::UnsupportedFileFormat(_)
            | SolverError::Npy(_)
            | SolverError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Convenience type alias for Results with SolverError.
pub type Result<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_cost() {
        let e = SolverError::InvalidCost {
            vertex: 5,
            value: -0.5,
        };
        assert_eq!(
            e.to_string(),
            "invalid time cost at vertex 5: -0.5 (must be positive and finite)"
        );
    }

    #[test]
    fn display_invalid_tolerance() {
        let e = SolverError::InvalidTolerance(-1.0);
        assert_eq!(
            e.to_string(),
            "invalid tolerance: -1 (must be non-negative and finite)"
        );
    }

    #[test]
    fn display_iteration_limit() {
        let e = SolverError::IterationLimitExceeded { limit: 1000 };
        assert_eq!(e.to_string(), "max relaxations exceeded: limit was 1000");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = SolverError::Io(io_err);
        assert!(e.to_string().contains("file not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e: SolverError = io_err.into();
        assert!(matches!(e, SolverError::Io(_)));
        assert_eq!(e.kind(), ErrorKind::Io);
    }

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(SolverError::EmptyTargetSet.kind(), ErrorKind::Configuration);
        assert_eq!(
            SolverError::NumericInstability {
                vertex: 0,
                value: f64::NAN
            }
            .kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            SolverError::IterationLimitExceeded { limit: 1 }.kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            SolverError::UnsupportedFileFormat("csv".into()).kind(),
            ErrorKind::Io
        );
    }
}
