// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::{distance, MeshData, Point, VertexId};
use crate::state::VertexStore;

/// Triangles whose squared sine of the angle at `x` falls below this are
/// treated as degenerate.
const DEGENERATE_EPS: f64 = 1e-12;

/// Relative slack for the causality tests.
const CAUSALITY_EPS: f64 = 1e-12;

/// One-point update: arrival through a single neighbour at distance `edge_len`.
#[inline]
pub fn solve_one_point(t_n: f64, edge_len: f64, cost: f64) -> f64 {
    t_n + edge_len * cost
}

/// Solve the eikonal equation for vertex `x` of triangle `(x, a, b)`.
///
/// Given arrival times `ta`, `tb` at `a` and `b` and the time cost `cost`
/// (slowness) at `x`, assumes a planar front crossing edge `(a, b)`. With
/// `e_a = a - x`, `e_b = b - x`, Gram matrix `G` of the two edges and
/// `Q = G^-1`, the arrival time satisfies
/// `(1'Q1) T^2 - 2 (1'Qt) T + (t'Qt - cost^2) = 0`.
///
/// The larger root is accepted only if it is causal: `T >= max(ta, tb)` and
/// the characteristic `-grad T` lies in the cone spanned by `e_a` and `e_b`
/// (`Q (T 1 - t) >= 0`). Otherwise, and for negative discriminants or
/// degenerate triangles, falls back to the one-point update from the better
/// of `a` and `b`.
pub fn solve_triangle(x: Point, a: Point, b: Point, ta: f64, tb: f64, cost: f64) -> f64 {
    if ta.is_infinite() && tb.is_infinite() {
        return f64::INFINITY;
    }

    let ea = [a[0] - x[0], a[1] - x[1]];
    let eb = [b[0] - x[0], b[1] - x[1]];
    let gaa = ea[0] * ea[0] + ea[1] * ea[1];
    let gbb = eb[0] * eb[0] + eb[1] * eb[1];
    let gab = ea[0] * eb[0] + ea[1] * eb[1];

    let one_point = solve_one_point(ta, gaa.sqrt(), cost).min(solve_one_point(tb, gbb.sqrt(), cost));
    if ta.is_infinite() || tb.is_infinite() {
        return one_point;
    }

    let det = gaa * gbb - gab * gab;
    if !(det > DEGENERATE_EPS * gaa * gbb) {
        return one_point;
    }

    // Shift times so that ta = 0; avoids cancellation for large potentials.
    let u = tb - ta;
    let qa = (gbb - gab) / det;
    let qb = (gaa - gab) / det;
    let a_q = qa + qb;
    let b_q = -2.0 * qb * u;
    let c_q = gaa * u * u / det - cost * cost;

    let disc = b_q * b_q - 4.0 * a_q * c_q;
    if disc < 0.0 {
        return one_point;
    }
    let t_rel = (-b_q + disc.sqrt()) / (2.0 * a_q);
    if !t_rel.is_finite() || t_rel + CAUSALITY_EPS * t_rel.abs().max(1.0) < u.max(0.0) {
        return one_point;
    }

    let da = t_rel;
    let db = t_rel - u;
    let lambda_a = (gbb * da - gab * db) / det;
    let lambda_b = (gaa * db - gab * da) / det;
    let slack = CAUSALITY_EPS * (lambda_a.abs() + lambda_b.abs());
    if lambda_a < -slack || lambda_b < -slack {
        return one_point;
    }

    (ta + t_rel).min(one_point)
}

/// Compute the candidate potential of vertex `v` from its current neighbourhood.
///
/// Takes the minimum over the triangle update of every incident triangle and
/// the one-point update from every ring neighbour. `costs` holds the time
/// cost per vertex. Pure: reads the store, never writes it.
pub fn update_vertex<M: MeshData>(
    mesh: &M,
    store: &VertexStore,
    costs: &[f64],
    v: VertexId,
) -> f64 {
    let x = mesh.point(v);
    let cost = costs[v];

    let mut best = f64::INFINITY;
    for n in mesh.adjacent_vertices(v) {
        let tn = store.potential(n);
        if tn.is_finite() {
            best = best.min(solve_one_point(tn, distance(x, mesh.point(n)), cost));
        }
    }
    for [a, b] in mesh.incident_triangles(v) {
        let (ta, tb) = (store.potential(a), store.potential(b));
        if ta.is_finite() && tb.is_finite() {
            best = best.min(solve_triangle(x, mesh.point(a), mesh.point(b), ta, tb, cost));
        }
    }
    best
}
