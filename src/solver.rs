// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::core::{barycentric, MeshData, VertexId};
use crate::cost::{distance_to_targets, Shape, TimeCost};
use crate::error::{Result, SolverError};
use crate::io;
use crate::scheduler::{march, MarchObserver, MarchStats, SolverConfig};
use crate::state::{Tag, VertexStore};

/// Eikonal solver on a triangle mesh.
///
/// Owns the mesh, the target shapes, the time cost and the per-vertex state.
/// `solve()` is idempotent: it only recomputes when the targets or the time
/// cost changed since the last successful solve, or after `invalidate()`.
///
/// # Example
/// ```
/// use mesh_eikonal::{MeshEikonalSolver, Shape, TriMesh, UniformCost};
///
/// let mesh = TriMesh::regular_grid(11, 11, 0.1).unwrap();
/// let target = Shape::Circle { center: [0.0, 0.0], radius: 0.05 };
/// let mut solver = MeshEikonalSolver::new(mesh, vec![target], UniformCost(1.0));
/// solver.solve().unwrap();
/// assert!((solver.potential_at(1.0, 0.0) - 1.0).abs() < 0.1);
/// ```
pub struct MeshEikonalSolver<M: MeshData> {
    mesh: M,
    targets: Vec<Shape>,
    cost: Box<dyn TimeCost>,
    store: VertexStore,
    initial: Vec<VertexId>,
    config: SolverConfig,
    observer: Option<Box<dyn MarchObserver>>,
    solved: bool,
    targets_changed: bool,
    cost_changed: bool,
    solved_cost_version: u64,
    last_stats: MarchStats,
}

impl<M: MeshData + Sync> MeshEikonalSolver<M> {
    /// Create a solver for `mesh` that propagates from `targets` with time cost `cost`.
    pub fn new(mesh: M, targets: Vec<Shape>, cost: impl TimeCost + 'static) -> Self {
        let store = VertexStore::new(mesh.num_vertices());
        MeshEikonalSolver {
            mesh,
            targets,
            cost: Box::new(cost),
            store,
            initial: Vec::new(),
            config: SolverConfig::default(),
            observer: None,
            solved: false,
            targets_changed: true,
            cost_changed: true,
            solved_cost_version: 0,
            last_stats: MarchStats::default(),
        }
    }

    /// Set the convergence tolerance (builder method). Default is 0.
    ///
    /// # Errors
    /// Returns `InvalidTolerance` if `tolerance` is negative or not finite.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        self.config.tolerance = tolerance;
        self.config.validate()?;
        Ok(self)
    }

    /// Set the number of worker threads (builder method).
    /// Default is 1; more threads switch to double-buffered parallel rounds.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads.max(1);
        self
    }

    /// Set the maximum number of local updates per solve (builder method).
    /// Default is 100 times the number of vertices.
    pub fn with_max_relaxations(mut self, max_relaxations: u64) -> Self {
        self.config.max_relaxations = Some(max_relaxations);
        self
    }

    /// Replace the whole configuration (builder method).
    pub fn with_config(mut self, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Attach an observer that sees every relaxation and round (builder method).
    pub fn with_observer(mut self, observer: impl MarchObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Compute the potential field if inputs changed since the last solve.
    ///
    /// Returns the statistics of the march, or zeroed statistics when the
    /// current field was already up to date.
    ///
    /// # Errors
    /// Configuration errors (`EmptyTargetSet`, `InvalidCost`,
    /// `NoInitialVertices`, `InvalidTolerance`) are reported before any
    /// propagation. `IterationLimitExceeded` and `NumericInstability` abort
    /// the march, discard the partial field and leave the solver unsolved.
    pub fn solve(&mut self) -> Result<MarchStats> {
        if self.solved && !self.needs_update() {
            return Ok(MarchStats::default());
        }
        self.config.validate()?;

        let start = Instant::now();
        let costs = self.prepare()?;
        let marched = march(
            &self.mesh,
            &mut self.store,
            &costs,
            self.initial.clone(),
            &self.config,
            self.observer.as_deref(),
        );
        let stats = match marched {
            Ok(stats) => stats,
            Err(err) => {
                self.discard_field();
                return Err(err);
            }
        };
        self.mark_solved();
        self.last_stats = stats;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rounds = stats.rounds,
            relaxations = stats.relaxations,
            updates = stats.updates,
            max_band = stats.max_band,
            "solve finished"
        );
        Ok(stats)
    }

    /// Whether the targets or the time cost changed since the last solve.
    pub fn needs_update(&self) -> bool {
        self.targets_changed || self.cost_changed || self.cost.version() != self.solved_cost_version
    }

    /// Force the next `solve()` to recompute.
    pub fn invalidate(&mut self) {
        self.solved = false;
    }

    /// Replace the target shapes.
    pub fn set_targets(&mut self, targets: Vec<Shape>) {
        self.targets = targets;
        self.targets_changed = true;
    }

    /// Replace the time cost function.
    pub fn set_cost_function(&mut self, cost: impl TimeCost + 'static) {
        self.cost = Box::new(cost);
        self.cost_changed = true;
    }

    /// Interpolated potential at `(x, y)`.
    ///
    /// `+inf` when the point is off the mesh, before the first solve, or when
    /// a corner with positive barycentric weight has not been reached.
    pub fn potential_at(&self, x: f64, y: f64) -> f64 {
        let Some(corners) = self.mesh.locate(x, y) else {
            return f64::INFINITY;
        };
        let [a, b, c] = corners.map(|v| self.mesh.point(v));
        let Some(weights) = barycentric([x, y], a, b, c) else {
            return f64::INFINITY;
        };

        let mut value = 0.0;
        let mut total = 0.0;
        for (&v, &w) in corners.iter().zip(weights.iter()) {
            if w <= 0.0 {
                continue;
            }
            let t = self.store.potential(v);
            if t.is_infinite() {
                return f64::INFINITY;
            }
            value += w * t;
            total += w;
        }
        if total > 0.0 {
            value / total
        } else {
            f64::INFINITY
        }
    }

    /// Potential of a single vertex.
    pub fn vertex_potential(&self, v: VertexId) -> f64 {
        self.store.potential(v)
    }

    /// Tag of a single vertex.
    pub fn tag(&self, v: VertexId) -> Tag {
        self.store.tag(v)
    }

    /// All vertex potentials in vertex order.
    pub fn potentials(&self) -> &[f64] {
        self.store.potentials()
    }

    /// Seed vertices of the last solve.
    pub fn initial_vertices(&self) -> &[VertexId] {
        &self.initial
    }

    /// Whether the current field is up to date.
    pub fn is_solved(&self) -> bool {
        self.solved && !self.needs_update()
    }

    /// Statistics of the last march that actually ran.
    pub fn last_stats(&self) -> MarchStats {
        self.last_stats
    }

    /// The mesh.
    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    /// The target shapes.
    pub fn targets(&self) -> &[Shape] {
        &self.targets
    }

    /// The active configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Write the potential field to `path` (.npy).
    pub fn save_potentials(&self, path: &Path) -> Result<()> {
        io::save_potentials(path, self.store.potentials())
    }

    /// Restore a field written by `save_potentials` for the current inputs.
    ///
    /// Initial vertices are reseeded from the targets; every other vertex takes
    /// the stored value. The solver is considered solved afterwards. A NaN or
    /// negative stored value discards the field and fails with
    /// `NumericInstability`.
    pub fn load_potentials(&mut self, path: &Path) -> Result<()> {
        let values = io::load_potentials(path, self.mesh.num_vertices())?;
        self.prepare()?;

        for (v, &value) in values.iter().enumerate() {
            if self.store.is_initial(v) {
                continue;
            }
            if value.is_nan() || value < 0.0 {
                self.discard_field();
                return Err(SolverError::NumericInstability { vertex: v, value });
            }
            self.store.set_potential(v, value);
            let tag = if value.is_finite() { Tag::Burned } else { Tag::Undefined };
            self.store.set_tag(v, tag);
        }

        self.mark_solved();
        self.last_stats = MarchStats::default();
        debug!(path = %path.display(), "potential field loaded");
        Ok(())
    }

    /// Validate inputs, clear the field and reseed the initial vertices.
    /// Returns the time cost per vertex.
    fn prepare(&mut self) -> Result<Vec<f64>> {
        if self.targets.is_empty() {
            return Err(SolverError::EmptyTargetSet);
        }
        let costs = self.evaluate_costs()?;

        self.solved = false;
        if self.targets_changed || self.initial.is_empty() {
            self.store.reset();
            self.initial = self.find_initial_vertices();
        } else {
            self.store.unsolve();
        }
        if self.initial.is_empty() {
            return Err(SolverError::NoInitialVertices);
        }

        for &v in &self.initial {
            let d = distance_to_targets(&self.targets, self.mesh.point(v));
            self.store.set_initial(v, d.max(0.0) * costs[v]);
        }
        debug!(initial = self.initial.len(), "seeded initial vertices");
        Ok(costs)
    }

    fn evaluate_costs(&self) -> Result<Vec<f64>> {
        self.mesh
            .vertices()
            .map(|v| {
                let value = self.cost.cost_at(self.mesh.point(v));
                if value.is_finite() && value > 0.0 {
                    Ok(value)
                } else {
                    Err(SolverError::InvalidCost { vertex: v, value })
                }
            })
            .collect()
    }

    /// Vertices inside a target plus their ring neighbours, in vertex order.
    fn find_initial_vertices(&self) -> Vec<VertexId> {
        let mut inside = vec![false; self.mesh.num_vertices()];
        for shape in &self.targets {
            for v in self.mesh.vertices_in(shape) {
                inside[v] = true;
            }
        }

        let mut initial = inside.clone();
        for v in self.mesh.vertices().filter(|&v| inside[v]) {
            for n in self.mesh.adjacent_vertices(v) {
                initial[n] = true;
            }
        }
        self.mesh.vertices().filter(|&v| initial[v]).collect()
    }

    /// Drop a partial field so queries see an unsolved mesh.
    fn discard_field(&mut self) {
        self.store.reset();
        self.initial.clear();
    }

    fn mark_solved(&mut self) {
        self.solved = true;
        self.targets_changed = false;
        self.cost_changed = false;
        self.solved_cost_version = self.cost.version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TriMesh;
    use crate::cost::UniformCost;

    fn point_target(x: f64, y: f64) -> Shape {
        Shape::Circle {
            center: [x, y],
            radius: 1e-9,
        }
    }

    fn grid_solver(n: usize) -> MeshEikonalSolver<TriMesh> {
        let mesh = TriMesh::regular_grid(n, n, 1.0).unwrap();
        let c = (n / 2) as f64;
        MeshEikonalSolver::new(mesh, vec![point_target(c, c)], UniformCost(1.0))
    }

    #[test]
    fn seeds_contain_target_and_ring() {
        let mut solver = grid_solver(5);
        solver.solve().unwrap();
        // Centre 12 and its six ring neighbours.
        let mut expected: Vec<VertexId> = solver.mesh().adjacent_vertices(12).collect();
        expected.push(12);
        expected.sort_unstable();
        assert_eq!(solver.initial_vertices(), expected.as_slice());
        assert_eq!(solver.vertex_potential(12), 0.0);
        for &v in &expected {
            assert_eq!(solver.tag(v), Tag::Initial);
            if v != 12 {
                let p = solver.mesh().point(v);
                let d = ((p[0] - 2.0).powi(2) + (p[1] - 2.0).powi(2)).sqrt();
                assert!((solver.vertex_potential(v) - d).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn second_solve_is_a_no_op() {
        let mut solver = grid_solver(7);
        let first = solver.solve().unwrap();
        assert!(first.relaxations > 0);
        assert!(solver.is_solved());

        let before = solver.potentials().to_vec();
        let second = solver.solve().unwrap();
        assert_eq!(second, MarchStats::default());
        assert_eq!(solver.potentials(), before.as_slice());
        assert_eq!(solver.last_stats(), first);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let mut solver = grid_solver(7);
        solver.solve().unwrap();
        let before = solver.potentials().to_vec();

        solver.invalidate();
        assert!(!solver.is_solved());
        let stats = solver.solve().unwrap();
        assert!(stats.relaxations > 0);
        assert_eq!(solver.potentials(), before.as_slice());
    }

    #[test]
    fn replacing_inputs_needs_update() {
        let mut solver = grid_solver(5);
        solver.solve().unwrap();
        assert!(!solver.needs_update());

        solver.set_cost_function(UniformCost(2.0));
        assert!(solver.needs_update());
        solver.solve().unwrap();
        assert!((solver.vertex_potential(0) - 2.0 * solver_distance(0)).abs() < 1.0);

        solver.set_targets(vec![point_target(0.0, 0.0)]);
        assert!(solver.needs_update());
        solver.solve().unwrap();
        assert_eq!(solver.vertex_potential(0), 0.0);
        assert_eq!(solver.tag(12), Tag::Burned);
    }

    fn solver_distance(v: VertexId) -> f64 {
        let (i, j) = ((v % 5) as f64, (v / 5) as f64);
        ((i - 2.0).powi(2) + (j - 2.0).powi(2)).sqrt()
    }

    #[test]
    fn empty_targets_rejected() {
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        let mut solver = MeshEikonalSolver::new(mesh, vec![], UniformCost(1.0));
        assert!(matches!(solver.solve(), Err(SolverError::EmptyTargetSet)));
        assert!(!solver.is_solved());
    }

    #[test]
    fn target_off_mesh_rejected() {
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        let mut solver =
            MeshEikonalSolver::new(mesh, vec![point_target(10.0, 10.0)], UniformCost(1.0));
        assert!(matches!(solver.solve(), Err(SolverError::NoInitialVertices)));
    }

    #[test]
    fn non_positive_cost_rejected() {
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        let mut solver =
            MeshEikonalSolver::new(mesh, vec![point_target(1.0, 1.0)], UniformCost(0.0));
        assert!(matches!(
            solver.solve(),
            Err(SolverError::InvalidCost { vertex: 0, .. })
        ));
    }

    #[test]
    fn builder_rejects_bad_tolerance() {
        assert!(matches!(
            grid_solver(3).with_tolerance(-0.1),
            Err(SolverError::InvalidTolerance(_))
        ));
        assert!(grid_solver(3).with_tolerance(f64::NAN).is_err());
        let solver = grid_solver(3).with_tolerance(1e-6).unwrap().with_threads(0);
        assert_eq!(solver.config().tolerance, 1e-6);
        assert_eq!(solver.config().num_threads, 1);
    }

    #[test]
    fn potential_at_interpolates() {
        let mut solver = grid_solver(5);
        assert!(solver.potential_at(1.0, 1.0).is_infinite());
        solver.solve().unwrap();

        // At a vertex the interpolant equals the vertex value.
        assert!((solver.potential_at(4.0, 2.0) - solver.vertex_potential(14)).abs() < 1e-12);
        // Midway along an edge it is the average of its endpoints.
        let mid = solver.potential_at(3.5, 2.0);
        let avg = 0.5 * (solver.vertex_potential(13) + solver.vertex_potential(14));
        assert!((mid - avg).abs() < 1e-12);
        // Off the mesh.
        assert!(solver.potential_at(-1.0, 2.0).is_infinite());
    }

    #[test]
    fn aborted_solve_discards_partial_field() {
        let mut solver = grid_solver(30).with_max_relaxations(50);
        assert!(matches!(
            solver.solve(),
            Err(SolverError::IterationLimitExceeded { limit: 50 })
        ));
        assert!(!solver.is_solved());
        assert!(solver.potential_at(16.0, 15.0).is_infinite());
        assert!(solver.potential_at(15.0, 15.0).is_infinite());
        assert!(solver.potentials().iter().all(|t| t.is_infinite()));

        // A later solve with a sufficient limit starts from scratch.
        let mut solver = solver.with_max_relaxations(1_000_000);
        solver.solve().unwrap();
        assert!(solver.is_solved());
        assert!((solver.potential_at(16.0, 15.0) - 1.0).abs() < 1e-6);
    }
}
