// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::ops::Range;

use crate::cost::Shape;
use crate::error::{Result, SolverError};

/// Dense index of a mesh vertex, `0..num_vertices`.
pub type VertexId = usize;
/// Index into the half-edge array.
pub type HalfEdgeId = usize;
/// Index into the face array.
pub type FaceId = usize;
/// A point in the plane.
pub type Point = [f64; 2];

const INVALID: usize = usize::MAX;

/// Read-only view of a triangulated domain. Provides vertex enumeration,
/// ring adjacency, coordinates and point location.
pub trait MeshData {
    /// Number of vertices. Vertex ids are dense in `0..num_vertices()`.
    fn num_vertices(&self) -> usize;

    /// All vertex ids.
    fn vertices(&self) -> Range<VertexId> {
        0..self.num_vertices()
    }

    /// Coordinates of a vertex.
    fn point(&self, v: VertexId) -> Point;

    /// Vertices sharing an edge with `v`. Ring order is not guaranteed.
    fn adjacent_vertices(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_;

    /// For every triangle `(v, a, b)` touching `v`, the opposite edge `[a, b]`.
    fn incident_triangles(&self, v: VertexId) -> impl Iterator<Item = [VertexId; 2]> + '_;

    /// Corners of the triangle containing `(x, y)`, if any.
    fn locate(&self, x: f64, y: f64) -> Option<[VertexId; 3]>;

    /// Vertices whose coordinates lie inside `shape`.
    fn vertices_in<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = VertexId> + 'a {
        self.vertices().filter(move |&v| shape.contains(self.point(v)))
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Twice the signed area of triangle `(a, b, c)`; positive when counter-clockwise.
#[inline]
pub fn orient2d(a: Point, b: Point, c: Point) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Barycentric coordinates of `p` in triangle `(a, b, c)`.
/// Returns `None` for a degenerate triangle.
pub fn barycentric(p: Point, a: Point, b: Point, c: Point) -> Option<[f64; 3]> {
    let area = orient2d(a, b, c);
    let scale = distance(a, b).max(distance(b, c)).max(distance(c, a));
    if !area.is_finite() || area.abs() <= 1e-12 * scale * scale {
        return None;
    }
    let wa = orient2d(p, b, c) / area;
    let wb = orient2d(a, p, c) / area;
    Some([wa, wb, 1.0 - wa - wb])
}

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    /// Vertex this half-edge starts at.
    origin: VertexId,
    /// Opposite half-edge (always valid; boundary edges get a face-less twin).
    twin: HalfEdgeId,
    /// Next half-edge around the face, or along the boundary loop.
    next: HalfEdgeId,
    /// Face to the left, `None` for boundary half-edges.
    face: Option<FaceId>,
}

/// Index-based half-edge triangulation.
///
/// Every interior edge is a pair of twin half-edges; boundary edges get a
/// face-less twin linked into a boundary loop, so the ring of outgoing
/// half-edges around any manifold vertex is closed.
#[derive(Debug, Clone)]
pub struct TriMesh {
    points: Vec<Point>,
    half_edges: Vec<HalfEdge>,
    faces: Vec<HalfEdgeId>,
    outgoing: Vec<HalfEdgeId>,
}

impl TriMesh {
    /// Build a mesh from vertex coordinates and triangles.
    ///
    /// Triangles may be given in either orientation; clockwise ones are
    /// flipped. Zero-area triangles are kept as given.
    ///
    /// # Errors
    /// Returns `InvalidMesh` if a coordinate is not finite, an index is out
    /// of range, a triangle repeats a vertex, or the triangles do not form
    /// a manifold (a directed edge used twice, or two boundary loops
    /// touching at one vertex).
    pub fn new(points: Vec<Point>, triangles: &[[VertexId; 3]]) -> Result<Self> {
        let n = points.len();
        if let Some(v) = points
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(SolverError::InvalidMesh(format!(
                "vertex {} has non-finite coordinates {:?}",
                v, points[v]
            )));
        }

        let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(triangles.len() * 3 + n);
        let mut faces: Vec<HalfEdgeId> = Vec::with_capacity(triangles.len());
        let mut outgoing = vec![INVALID; n];
        let mut edge_map: HashMap<(VertexId, VertexId), HalfEdgeId> = HashMap::new();

        for (fi, tri) in triangles.iter().enumerate() {
            let mut tri = *tri;
            if let Some(&bad) = tri.iter().find(|&&v| v >= n) {
                return Err(SolverError::InvalidMesh(format!(
                    "triangle {} references vertex {} but the mesh has {} vertices",
                    fi, bad, n
                )));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(SolverError::InvalidMesh(format!(
                    "triangle {} repeats a vertex: {:?}",
                    fi, tri
                )));
            }
            if orient2d(points[tri[0]], points[tri[1]], points[tri[2]]) < 0.0 {
                tri.swap(1, 2);
            }

            let base = half_edges.len();
            for i in 0..3 {
                let from = tri[i];
                let to = tri[(i + 1) % 3];
                if edge_map.insert((from, to), base + i).is_some() {
                    return Err(SolverError::InvalidMesh(format!(
                        "directed edge ({}, {}) is used by more than one triangle",
                        from, to
                    )));
                }
                half_edges.push(HalfEdge {
                    origin: from,
                    twin: INVALID,
                    next: base + (i + 1) % 3,
                    face: Some(fi),
                });
                if outgoing[from] == INVALID {
                    outgoing[from] = base + i;
                }
            }
            faces.push(base);
        }

        // Link twins; unmatched edges get a boundary twin running the other way.
        let interior = half_edges.len();
        let mut boundary_from: HashMap<VertexId, HalfEdgeId> = HashMap::new();
        for he in 0..interior {
            if half_edges[he].twin != INVALID {
                continue;
            }
            let from = half_edges[he].origin;
            let to = half_edges[half_edges[he].next].origin;
            if let Some(&twin) = edge_map.get(&(to, from)) {
                half_edges[he].twin = twin;
                half_edges[twin].twin = he;
            } else {
                let boundary = half_edges.len();
                half_edges[he].twin = boundary;
                half_edges.push(HalfEdge {
                    origin: to,
                    twin: he,
                    next: INVALID,
                    face: None,
                });
                if boundary_from.insert(to, boundary).is_some() {
                    return Err(SolverError::InvalidMesh(format!(
                        "vertex {} is shared by two boundary loops",
                        to
                    )));
                }
            }
        }

        // Chain the boundary half-edges and make boundary vertices start
        // their ring on the boundary.
        for he in interior..half_edges.len() {
            let end = half_edges[half_edges[he].twin].origin;
            half_edges[he].next = boundary_from.get(&end).copied().unwrap_or(INVALID);
            outgoing[half_edges[he].origin] = he;
        }

        Ok(TriMesh {
            points,
            half_edges,
            faces,
            outgoing,
        })
    }

    /// Structured triangulation of the rectangle `[0, (nx-1)h] x [0, (ny-1)h]`.
    ///
    /// Vertex `(i, j)` has id `j * nx + i` and coordinates `(i h, j h)`. Each
    /// square cell is split along alternating diagonals.
    ///
    /// # Errors
    /// Returns `InvalidMesh` if `nx` or `ny` is below 2 or `spacing` is not
    /// positive and finite.
    pub fn regular_grid(nx: usize, ny: usize, spacing: f64) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(SolverError::InvalidMesh(format!(
                "grid needs at least 2x2 vertices, got {}x{}",
                nx, ny
            )));
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(SolverError::InvalidMesh(format!(
                "grid spacing {} must be positive and finite",
                spacing
            )));
        }

        let mut points = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                points.push([i as f64 * spacing, j as f64 * spacing]);
            }
        }

        let id = |i: usize, j: usize| j * nx + i;
        let mut triangles = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let (v00, v10, v01, v11) = (id(i, j), id(i + 1, j), id(i, j + 1), id(i + 1, j + 1));
                if (i + j) % 2 == 0 {
                    triangles.push([v00, v10, v11]);
                    triangles.push([v00, v11, v01]);
                } else {
                    triangles.push([v00, v10, v01]);
                    triangles.push([v10, v11, v01]);
                }
            }
        }

        TriMesh::new(points, &triangles)
    }

    /// Number of triangles.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// All vertex coordinates, indexed by vertex id.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Corners of a face in counter-clockwise order.
    pub fn face_vertices(&self, face: FaceId) -> [VertexId; 3] {
        let h0 = self.faces[face];
        let h1 = self.half_edges[h0].next;
        let h2 = self.half_edges[h1].next;
        [
            self.half_edges[h0].origin,
            self.half_edges[h1].origin,
            self.half_edges[h2].origin,
        ]
    }

    /// True if `v` lies on the mesh boundary.
    pub fn is_boundary(&self, v: VertexId) -> bool {
        let he = self.outgoing[v];
        he != INVALID && self.half_edges[he].face.is_none()
    }

    fn dest(&self, he: HalfEdgeId) -> VertexId {
        self.half_edges[self.half_edges[he].twin].origin
    }

    fn outgoing(&self, v: VertexId) -> Outgoing<'_> {
        let start = self.outgoing[v];
        Outgoing {
            mesh: self,
            start,
            current: start,
            remaining: self.half_edges.len(),
        }
    }
}

/// Rotation over the outgoing half-edges of a vertex.
struct Outgoing<'a> {
    mesh: &'a TriMesh,
    start: HalfEdgeId,
    current: HalfEdgeId,
    remaining: usize,
}

impl Iterator for Outgoing<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        if self.current == INVALID || self.remaining == 0 {
            return None;
        }
        let he = self.current;
        self.remaining -= 1;
        let twin = self.mesh.half_edges[he].twin;
        let next = self.mesh.half_edges[twin].next;
        self.current = if next == self.start { INVALID } else { next };
        Some(he)
    }
}

impl MeshData for TriMesh {
    fn num_vertices(&self) -> usize {
        self.points.len()
    }

    fn point(&self, v: VertexId) -> Point {
        self.points[v]
    }

    fn adjacent_vertices(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.outgoing(v).map(move |he| self.dest(he))
    }

    fn incident_triangles(&self, v: VertexId) -> impl Iterator<Item = [VertexId; 2]> + '_ {
        self.outgoing(v)
            .filter(move |&he| self.half_edges[he].face.is_some())
            .map(move |he| [self.dest(he), self.dest(self.half_edges[he].next)])
    }

    fn locate(&self, x: f64, y: f64) -> Option<[VertexId; 3]> {
        const EPS: f64 = 1e-12;
        (0..self.faces.len()).map(|f| self.face_vertices(f)).find(|&[a, b, c]| {
            barycentric([x, y], self.points[a], self.points[b], self.points[c])
                .is_some_and(|w| w.iter().all(|&wi| wi >= -EPS))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted<I: Iterator<Item = VertexId>>(it: I) -> Vec<VertexId> {
        let mut v: Vec<_> = it.collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn regular_grid_counts() {
        let mesh = TriMesh::regular_grid(4, 3, 0.5).unwrap();
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_faces(), 2 * 3 * 2);
        assert_eq!(mesh.point(5), [0.5, 0.5]);
    }

    #[test]
    fn interior_vertex_ring_is_closed() {
        // In a 3x3 grid the centre vertex (1,1) has id 4 and, with cell (0,0)
        // split along v00-v11, touches all eight surrounding vertices.
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        assert!(!mesh.is_boundary(4));
        assert_eq!(sorted(mesh.adjacent_vertices(4)), vec![0, 1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(mesh.incident_triangles(4).count(), 8);
    }

    #[test]
    fn boundary_vertex_ring() {
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        // Corner (0,0): cell (0,0) uses the v00-v11 diagonal.
        assert!(mesh.is_boundary(0));
        assert_eq!(sorted(mesh.adjacent_vertices(0)), vec![1, 3, 4]);
        assert_eq!(mesh.incident_triangles(0).count(), 2);

        // Corner (3,0) of a 4x4 grid is off the diagonal of cell (2,0).
        let mesh = TriMesh::regular_grid(4, 4, 1.0).unwrap();
        assert_eq!(sorted(mesh.adjacent_vertices(3)), vec![2, 7]);
        assert_eq!(mesh.incident_triangles(3).count(), 1);
    }

    #[test]
    fn incident_triangles_are_faces() {
        let mesh = TriMesh::regular_grid(4, 4, 1.0).unwrap();
        for v in mesh.vertices() {
            for [a, b] in mesh.incident_triangles(v) {
                let area = orient2d(mesh.point(v), mesh.point(a), mesh.point(b));
                assert!(area > 0.0, "triangle ({}, {}, {}) not ccw", v, a, b);
            }
        }
    }

    #[test]
    fn clockwise_input_is_flipped() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let mesh = TriMesh::new(points, &[[0, 2, 1]]).unwrap();
        let [a, b, c] = mesh.face_vertices(0);
        assert!(orient2d(mesh.point(a), mesh.point(b), mesh.point(c)) > 0.0);
        assert_eq!(sorted(mesh.adjacent_vertices(0)), vec![1, 2]);
    }

    #[test]
    fn locate_inside_and_outside() {
        let mesh = TriMesh::regular_grid(3, 3, 1.0).unwrap();
        let tri = mesh.locate(0.75, 0.25).unwrap();
        let w = barycentric(
            [0.75, 0.25],
            mesh.point(tri[0]),
            mesh.point(tri[1]),
            mesh.point(tri[2]),
        )
        .unwrap();
        assert!(w.iter().all(|&wi| wi >= 0.0));
        // Vertices and edges are located too.
        assert!(mesh.locate(1.0, 1.0).is_some());
        assert!(mesh.locate(2.0, 0.5).is_some());
        assert!(mesh.locate(2.5, 0.5).is_none());
        assert!(mesh.locate(-0.1, 1.0).is_none());
    }

    #[test]
    fn vertices_in_shape() {
        let mesh = TriMesh::regular_grid(5, 5, 1.0).unwrap();
        let shape = Shape::Rectangle {
            min: [0.5, 0.5],
            max: [2.5, 1.5],
        };
        assert_eq!(sorted(mesh.vertices_in(&shape)), vec![6, 7]);
    }

    #[test]
    fn invalid_index() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let result = TriMesh::new(points, &[[0, 1, 3]]);
        assert!(matches!(result, Err(SolverError::InvalidMesh(_))));
    }

    #[test]
    fn duplicate_directed_edge() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        // Both triangles contain the directed edge 0 -> 1 after orientation.
        let result = TriMesh::new(points, &[[0, 1, 2], [0, 1, 3]]);
        assert!(matches!(result, Err(SolverError::InvalidMesh(_))));
    }

    #[test]
    fn invalid_grid_shape() {
        assert!(matches!(
            TriMesh::regular_grid(1, 4, 1.0),
            Err(SolverError::InvalidMesh(_))
        ));
        assert!(matches!(
            TriMesh::regular_grid(4, 4, 0.0),
            Err(SolverError::InvalidMesh(_))
        ));
    }

    #[test]
    fn degenerate_triangle_has_no_barycentric() {
        assert!(barycentric([0.5, 0.0], [0.0, 0.0], [1.0, 0.0], [2.0, 0.0]).is_none());
    }
}
