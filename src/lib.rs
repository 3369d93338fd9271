// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! An eikonal equation solver on triangle meshes using the Fast Iterative Method (FIM).
//!
//! This library computes travel-time (potential) fields over an unstructured
//! 2D triangulation by solving |∇T| = 1/F, where T is the travel time from a
//! set of target shapes and 1/F is the local time cost. Each vertex is updated
//! from its triangle fan with a causal planar-front update; an unordered
//! narrow band of active vertices is relaxed until it empties.

#![warn(missing_docs)]

/// Mesh traits and the reference half-edge triangulation.
pub mod core;
/// Time cost functions and target shapes.
pub mod cost;
/// Error types for the library.
pub mod error;
/// File I/O for caching potential fields.
pub mod io;
/// Narrow-band FIM propagation.
pub mod scheduler;
/// Solver façade: seeding, invalidation and point queries.
pub mod solver;
/// Per-vertex potential and tag storage.
pub mod state;
/// Local eikonal updates on triangle fans.
pub mod update_kernels;

pub use crate::core::{MeshData, Point, TriMesh, VertexId};
pub use crate::cost::{FnCost, Shape, TimeCost, UniformCost};
pub use crate::error::{ErrorKind, Result, SolverError};
pub use crate::scheduler::{MarchObserver, MarchStats, RoundInfo, SolverConfig};
pub use crate::solver::MeshEikonalSolver;
pub use crate::state::{Tag, VertexStore};
