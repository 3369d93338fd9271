// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{trace, warn};

use crate::core::{MeshData, VertexId};
use crate::error::{Result, SolverError};
use crate::state::{Tag, VertexStore};
use crate::update_kernels::update_vertex;

/// Tunables for a march.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// A vertex converges when one relaxation changes it by at most this much.
    pub tolerance: f64,
    /// Abort after this many local updates. Default is 100 times the number of vertices.
    pub max_relaxations: Option<u64>,
    /// Worker threads. 1 runs the sequential sweep; more run double-buffered rounds.
    pub num_threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: 0.0,
            max_relaxations: None,
            num_threads: 1,
        }
    }
}

impl SolverConfig {
    /// Check the parameters.
    ///
    /// # Errors
    /// Returns `InvalidTolerance` if the tolerance is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SolverError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// Counters collected during one march.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarchStats {
    /// Passes over the active list.
    pub rounds: u64,
    /// Local eikonal updates evaluated.
    pub relaxations: u64,
    /// Relaxations that lowered a potential.
    pub updates: u64,
    /// Vertices pushed into the active list (re-activations included).
    pub activations: u64,
    /// Largest active list seen.
    pub max_band: usize,
}

/// Progress information passed to the observer after every round.
#[derive(Debug, Clone, Copy)]
pub struct RoundInfo {
    /// Round index, starting at 1.
    pub round: u64,
    /// Active list size at the start of the next round.
    pub band_size: usize,
    /// Local updates evaluated so far.
    pub relaxations: u64,
    /// Elapsed time since the march started.
    pub elapsed: Duration,
}

/// Instrumentation hook for a march. All methods default to no-ops.
pub trait MarchObserver: Send + Sync {
    /// A potential was lowered from `old` to `new`.
    fn on_relax(&self, _vertex: VertexId, _old: f64, _new: f64) {}

    /// A round finished.
    fn on_round(&self, _info: &RoundInfo) {}
}

impl<T: MarchObserver + ?Sized> MarchObserver for Arc<T> {
    fn on_relax(&self, vertex: VertexId, old: f64, new: f64) {
        (**self).on_relax(vertex, old, new)
    }

    fn on_round(&self, info: &RoundInfo) {
        (**self).on_round(info)
    }
}

/// Run the Fast Iterative Method from `seeds` until the active list is empty.
///
/// `store` must already hold the seed potentials; `costs` holds the time cost
/// per vertex. Every active vertex is relaxed once per round; a vertex whose
/// potential moved by at most the tolerance is burned and relaxes its ring
/// neighbours, activating those it lowered.
///
/// # Errors
/// Returns `IterationLimitExceeded` when the relaxation budget runs out and
/// `NumericInstability` if an update produced a NaN or negative potential.
pub fn march<M: MeshData + Sync>(
    mesh: &M,
    store: &mut VertexStore,
    costs: &[f64],
    seeds: Vec<VertexId>,
    config: &SolverConfig,
    observer: Option<&dyn MarchObserver>,
) -> Result<MarchStats> {
    config.validate()?;
    let limit = config
        .max_relaxations
        .unwrap_or(100 * mesh.num_vertices().max(1) as u64);

    for &v in &seeds {
        if !store.is_initial(v) {
            store.set_tag(v, Tag::Burning);
        }
    }

    let mut marcher = Marcher {
        mesh,
        costs,
        tolerance: config.tolerance,
        limit,
        observer,
        stats: MarchStats::default(),
        start: Instant::now(),
    };

    if config.num_threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .map_err(|e| SolverError::ThreadPool(e.to_string()))?;
        pool.install(|| marcher.run_buffered(store, seeds))?;
    } else {
        marcher.run_sequential(store, seeds)?;
    }

    Ok(marcher.stats)
}

struct Marcher<'a, M> {
    mesh: &'a M,
    costs: &'a [f64],
    tolerance: f64,
    limit: u64,
    observer: Option<&'a dyn MarchObserver>,
    stats: MarchStats,
    start: Instant,
}

impl<M: MeshData + Sync> Marcher<'_, M> {
    fn converged(&self, p: f64, q: f64) -> bool {
        p == q || (p - q).abs() <= self.tolerance
    }

    /// Account for `count` local updates, failing once over budget.
    fn spend(&mut self, count: usize) -> Result<()> {
        self.stats.relaxations += count as u64;
        if self.stats.relaxations > self.limit {
            warn!(
                limit = self.limit,
                rounds = self.stats.rounds,
                "relaxation limit exceeded, aborting march"
            );
            return Err(SolverError::IterationLimitExceeded { limit: self.limit });
        }
        Ok(())
    }

    fn check(v: VertexId, q: f64) -> Result<f64> {
        debug_assert!(!q.is_nan(), "NaN potential at vertex {}", v);
        if q.is_nan() || q < 0.0 {
            return Err(SolverError::NumericInstability { vertex: v, value: q });
        }
        Ok(q)
    }

    fn relax(&mut self, store: &VertexStore, v: VertexId) -> Result<f64> {
        self.spend(1)?;
        Self::check(v, update_vertex(self.mesh, store, self.costs, v))
    }

    /// Lower `v` to `q` if smaller, notifying the observer.
    fn commit(&mut self, store: &mut VertexStore, v: VertexId, q: f64) -> bool {
        let old = store.potential(v);
        if store.lower_potential(v, q) {
            self.stats.updates += 1;
            if let Some(obs) = self.observer {
                obs.on_relax(v, old, q);
            }
            true
        } else {
            false
        }
    }

    /// Burn a converged vertex. Initial vertices keep their tag.
    fn burn(store: &mut VertexStore, v: VertexId) {
        if !store.is_initial(v) {
            store.set_tag(v, Tag::Burned);
        }
    }

    fn activate(&mut self, store: &mut VertexStore, v: VertexId, next: &mut Vec<VertexId>) {
        if !store.is_burning(v) {
            store.set_tag(v, Tag::Burning);
            next.push(v);
            self.stats.activations += 1;
        }
    }

    fn finish_round(&mut self, band_size: usize) {
        let info = RoundInfo {
            round: self.stats.rounds,
            band_size,
            relaxations: self.stats.relaxations,
            elapsed: self.start.elapsed(),
        };
        trace!(round = info.round, band = band_size, "round finished");
        if let Some(obs) = self.observer {
            obs.on_round(&info);
        }
    }

    /// Gauss-Seidel sweep: every update sees the latest committed values.
    fn run_sequential(&mut self, store: &mut VertexStore, mut active: Vec<VertexId>) -> Result<()> {
        let mesh = self.mesh;
        while !active.is_empty() {
            self.stats.rounds += 1;
            self.stats.max_band = self.stats.max_band.max(active.len());

            let mut retained = Vec::new();
            let mut activated = Vec::new();

            for &x in &active {
                let p = store.potential(x);
                let mut q = p;
                if !store.is_initial(x) {
                    q = p.min(self.relax(store, x)?);
                    self.commit(store, x, q);
                }

                if !self.converged(p, q) {
                    retained.push(x);
                    continue;
                }

                Self::burn(store, x);
                let tx = store.potential(x);
                for xn in mesh.adjacent_vertices(x) {
                    if store.is_initial(xn) || store.potential(xn) <= tx {
                        continue;
                    }
                    let candidate = self.relax(store, xn)?;
                    if self.commit(store, xn, candidate) {
                        self.activate(store, xn, &mut activated);
                    }
                }
            }

            retained.extend(activated);
            active = retained;
            self.finish_round(active.len());
        }
        Ok(())
    }

    /// Double-buffered rounds: each phase computes all updates in parallel
    /// against a frozen field, then commits them in list order.
    fn run_buffered(&mut self, store: &mut VertexStore, mut active: Vec<VertexId>) -> Result<()> {
        let mesh = self.mesh;
        let costs = self.costs;

        while !active.is_empty() {
            self.stats.rounds += 1;
            self.stats.max_band = self.stats.max_band.max(active.len());

            // Phase 1: relax the band.
            let pending = active.iter().filter(|&&x| !store.is_initial(x)).count();
            self.spend(pending)?;
            let frozen: &VertexStore = store;
            let candidates: Vec<Option<f64>> = active
                .par_iter()
                .map(|&x| {
                    if frozen.is_initial(x) {
                        None
                    } else {
                        Some(update_vertex(mesh, frozen, costs, x))
                    }
                })
                .collect();

            let mut retained = Vec::new();
            let mut converged = Vec::new();
            for (&x, candidate) in active.iter().zip(candidates) {
                let p = store.potential(x);
                let mut q = p;
                if let Some(c) = candidate {
                    q = p.min(Self::check(x, c)?);
                    self.commit(store, x, q);
                }
                if self.converged(p, q) {
                    Self::burn(store, x);
                    converged.push(x);
                } else {
                    retained.push(x);
                }
            }

            // Phase 2: relax the neighbours of burned vertices.
            let mut neighbours: Vec<VertexId> = Vec::new();
            for &x in &converged {
                let tx = store.potential(x);
                neighbours.extend(
                    mesh.adjacent_vertices(x)
                        .filter(|&xn| !store.is_initial(xn) && store.potential(xn) > tx),
                );
            }
            neighbours.sort_unstable();
            neighbours.dedup();

            self.spend(neighbours.len())?;
            let frozen: &VertexStore = store;
            let candidates: Vec<f64> = neighbours
                .par_iter()
                .map(|&xn| update_vertex(mesh, frozen, costs, xn))
                .collect();

            let mut activated = Vec::new();
            for (&xn, candidate) in neighbours.iter().zip(candidates) {
                let q = Self::check(xn, candidate)?;
                if self.commit(store, xn, q) {
                    self.activate(store, xn, &mut activated);
                }
            }

            retained.extend(activated);
            active = retained;
            self.finish_round(active.len());
        }
        Ok(())
    }
}
