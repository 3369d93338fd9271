// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;

use crate::core::{distance, Point};

/// Local time cost `t(x) = 1 / F(x)`, the reciprocal of the propagation speed.
///
/// Implementations must return a positive, finite value at every mesh vertex;
/// the solver checks this before each march.
pub trait TimeCost: Send + Sync {
    /// Time cost at a point.
    fn cost_at(&self, point: Point) -> f64;

    /// Revision of the underlying field. Implementations whose values change
    /// over time bump this so the solver knows its cached field is stale.
    fn version(&self) -> u64 {
        0
    }
}

impl<T: TimeCost + ?Sized> TimeCost for Arc<T> {
    fn cost_at(&self, point: Point) -> f64 {
        (**self).cost_at(point)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}

/// Constant time cost everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformCost(pub f64);

impl Default for UniformCost {
    fn default() -> Self {
        UniformCost(1.0)
    }
}

impl TimeCost for UniformCost {
    fn cost_at(&self, _point: Point) -> f64 {
        self.0
    }
}

/// Time cost given by a closure.
pub struct FnCost {
    f: Box<dyn Fn(Point) -> f64 + Send + Sync>,
    version: u64,
}

impl FnCost {
    /// Wrap a closure.
    pub fn new(f: impl Fn(Point) -> f64 + Send + Sync + 'static) -> Self {
        FnCost {
            f: Box::new(f),
            version: 0,
        }
    }

    /// Replace the closure and bump the version.
    pub fn replace(&mut self, f: impl Fn(Point) -> f64 + Send + Sync + 'static) {
        self.f = Box::new(f);
        self.version += 1;
    }
}

impl TimeCost for FnCost {
    fn cost_at(&self, point: Point) -> f64 {
        (self.f)(point)
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Target region geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Closed disc.
    Circle {
        /// Centre.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// Closed axis-aligned rectangle.
    Rectangle {
        /// Lower-left corner.
        min: Point,
        /// Upper-right corner.
        max: Point,
    },
    /// Simple polygon, vertices in either orientation, implicitly closed.
    Polygon(Vec<Point>),
}

impl Shape {
    /// Whether `p` lies inside or on the boundary of the shape.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Circle { center, radius } => distance(*center, p) <= *radius,
            Shape::Rectangle { min, max } => {
                p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1]
            }
            Shape::Polygon(points) => {
                polygon_contains(points, p) || boundary_distance(points, p) <= 1e-12
            }
        }
    }

    /// Signed Euclidean distance from `p` to the shape boundary, negative inside.
    pub fn signed_distance(&self, p: Point) -> f64 {
        match self {
            Shape::Circle { center, radius } => distance(*center, p) - radius,
            Shape::Rectangle { min, max } => {
                let dx = (min[0] - p[0]).max(p[0] - max[0]);
                let dy = (min[1] - p[1]).max(p[1] - max[1]);
                if dx <= 0.0 && dy <= 0.0 {
                    dx.max(dy)
                } else {
                    dx.max(0.0).hypot(dy.max(0.0))
                }
            }
            Shape::Polygon(points) => {
                let d = boundary_distance(points, p);
                if polygon_contains(points, p) {
                    -d
                } else {
                    d
                }
            }
        }
    }
}

/// Minimum signed distance from `p` to any target shape; `+inf` for no targets.
pub fn distance_to_targets(targets: &[Shape], p: Point) -> f64 {
    targets
        .iter()
        .map(|s| s.signed_distance(p))
        .fold(f64::INFINITY, f64::min)
}

fn polygon_contains(points: &[Point], p: Point) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = a[0] + (p[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn boundary_distance(points: &[Point], p: Point) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| segment_distance(points[i], points[(i + 1) % n], p))
        .fold(f64::INFINITY, f64::min)
}

fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    if len_sq == 0.0 {
        return distance(a, p);
    }
    let t = (((p[0] - a[0]) * ab[0] + (p[1] - a[1]) * ab[1]) / len_sq).clamp(0.0, 1.0);
    distance([a[0] + t * ab[0], a[1] + t * ab[1]], p)
}
