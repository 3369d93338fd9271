// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mesh_eikonal::core::TriMesh;
use mesh_eikonal::cost::{FnCost, Shape, UniformCost};
use mesh_eikonal::{MeshEikonalSolver, Point};

fn centre_target(n: usize) -> Vec<Shape> {
    let c = (n / 2) as f64;
    vec![Shape::Circle {
        center: [c, c],
        radius: 1.5,
    }]
}

fn make_solver(n: usize, threads: usize) -> MeshEikonalSolver<TriMesh> {
    let mesh = TriMesh::regular_grid(n, n, 1.0).unwrap();
    MeshEikonalSolver::new(mesh, centre_target(n), UniformCost(1.0)).with_threads(threads)
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Single-thread baseline: 256^2 homogeneous, 1 thread.
fn bench_single_thread(c: &mut Criterion) {
    c.bench_function("grid_256x256_1thread", |b| {
        b.iter_with_setup(
            || make_solver(256, 1),
            |mut solver| {
                solver.solve().unwrap();
                black_box(solver)
            },
        );
    });
}

/// Thread scaling: 512^2 homogeneous with varying thread counts.
fn bench_thread_scaling(c: &mut Criterion) {
    let cpus = num_cpus();
    let mut group = c.benchmark_group("thread_scaling_512x512");
    for &threads in &[1, 2, 4, 8] {
        if threads <= cpus {
            group.bench_function(format!("{}threads", threads), |b| {
                b.iter_with_setup(
                    || make_solver(512, threads),
                    |mut solver| {
                        solver.solve().unwrap();
                        black_box(solver)
                    },
                );
            });
        }
    }
    group.finish();
}

/// Grid size scaling: varying grids, single thread.
fn bench_grid_size_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_size_scaling");
    for &n in &[64, 128, 256] {
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter_with_setup(
                || make_solver(n, 1),
                |mut solver| {
                    solver.solve().unwrap();
                    black_box(solver)
                },
            );
        });
    }
    group.finish();
}

/// Heterogeneous cost: band structure forces re-activations.
fn bench_heterogeneous_cost(c: &mut Criterion) {
    let n = 256;
    c.bench_function("grid_256x256_banded_cost", |b| {
        b.iter_with_setup(
            || {
                let mesh = TriMesh::regular_grid(n, n, 1.0).unwrap();
                let cost = FnCost::new(|p: Point| {
                    if (p[1] / 16.0) as i64 % 2 == 0 {
                        1.0
                    } else {
                        4.0
                    }
                });
                MeshEikonalSolver::new(mesh, centre_target(n), cost)
            },
            |mut solver| {
                solver.solve().unwrap();
                black_box(solver)
            },
        );
    });
}

/// Point queries on a solved field.
fn bench_potential_at(c: &mut Criterion) {
    let mut solver = make_solver(64, 1);
    solver.solve().unwrap();
    c.bench_function("potential_at_64x64", |b| {
        b.iter(|| black_box(solver.potential_at(black_box(40.3), black_box(17.8))));
    });
}

criterion_group!(
    benches,
    bench_single_thread,
    bench_thread_scaling,
    bench_grid_size_scaling,
    bench_heterogeneous_cost,
    bench_potential_at,
);
criterion_main!(benches);
