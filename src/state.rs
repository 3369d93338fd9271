// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::VertexId;

/// Lifecycle marker of a vertex during a march.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tag {
    /// Never visited; potential is `+inf`.
    #[default]
    Undefined,
    /// In the active band.
    Burning,
    /// Locally converged.
    Burned,
    /// Frozen seed on or next to a target; never recomputed.
    Initial,
}

/// Dense per-vertex potential and tag arrays, indexed by vertex id.
#[derive(Debug, Clone)]
pub struct VertexStore {
    potentials: Box<[f64]>,
    tags: Box<[Tag]>,
}

impl VertexStore {
    /// Store for `num_vertices` vertices, all undefined.
    pub fn new(num_vertices: usize) -> Self {
        VertexStore {
            potentials: vec![f64::INFINITY; num_vertices].into_boxed_slice(),
            tags: vec![Tag::Undefined; num_vertices].into_boxed_slice(),
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.potentials.len()
    }

    /// True if the store holds no vertices.
    pub fn is_empty(&self) -> bool {
        self.potentials.is_empty()
    }

    /// Current potential of `v`.
    #[inline]
    pub fn potential(&self, v: VertexId) -> f64 {
        self.potentials[v]
    }

    /// Overwrite the potential of `v`.
    #[inline]
    pub fn set_potential(&mut self, v: VertexId, value: f64) {
        self.potentials[v] = value;
    }

    /// Set the potential if `value` is strictly smaller than the current one.
    /// Returns true if the update happened.
    #[inline]
    pub fn lower_potential(&mut self, v: VertexId, value: f64) -> bool {
        if value < self.potentials[v] {
            self.potentials[v] = value;
            true
        } else {
            false
        }
    }

    /// Tag of `v`.
    #[inline]
    pub fn tag(&self, v: VertexId) -> Tag {
        self.tags[v]
    }

    /// Overwrite the tag of `v`.
    #[inline]
    pub fn set_tag(&mut self, v: VertexId, tag: Tag) {
        self.tags[v] = tag;
    }

    /// Whether `v` belongs to the frozen seed set.
    #[inline]
    pub fn is_initial(&self, v: VertexId) -> bool {
        self.tags[v] == Tag::Initial
    }

    /// Whether `v` is in the active band.
    #[inline]
    pub fn is_burning(&self, v: VertexId) -> bool {
        self.tags[v] == Tag::Burning
    }

    /// Whether `v` has no finite potential yet.
    #[inline]
    pub fn is_undefined(&self, v: VertexId) -> bool {
        self.potentials[v] == f64::INFINITY
    }

    /// Mark `v` as a seed with the given potential.
    pub fn set_initial(&mut self, v: VertexId, value: f64) {
        self.potentials[v] = value;
        self.tags[v] = Tag::Initial;
    }

    /// Reset every non-initial vertex to `+inf` / `Undefined`.
    pub fn unsolve(&mut self) {
        for (p, t) in self.potentials.iter_mut().zip(self.tags.iter_mut()) {
            if *t != Tag::Initial {
                *p = f64::INFINITY;
                *t = Tag::Undefined;
            }
        }
    }

    /// Reset every vertex, seeds included, to `+inf` / `Undefined`.
    pub fn reset(&mut self) {
        self.potentials.fill(f64::INFINITY);
        self.tags.fill(Tag::Undefined);
    }

    /// All potentials in vertex order.
    pub fn potentials(&self) -> &[f64] {
        &self.potentials
    }

    /// Number of initial vertices.
    pub fn num_initial(&self) -> usize {
        self.tags.iter().filter(|&&t| t == Tag::Initial).count()
    }
}
