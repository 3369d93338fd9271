// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mesh_eikonal::cost::{FnCost, Shape, TimeCost, UniformCost};
use mesh_eikonal::scheduler::{MarchObserver, RoundInfo};
use mesh_eikonal::{MeshEikonalSolver, Point, TriMesh};

#[derive(Parser)]
#[command(
    name = "mesh-eikonal",
    about = "Fast Iterative Method eikonal solver on triangle meshes"
)]
struct Cli {
    /// Grid vertex counts, comma-separated (e.g., 101,101)
    #[arg(short = 's', long)]
    size: String,

    /// Grid spacing
    #[arg(long, default_value = "1.0")]
    spacing: f64,

    /// Target shape: "circle:<x>,<y>,<r>" or "rect:<x0>,<y0>,<x1>,<y1>" (repeatable)
    #[arg(long, num_args = 1)]
    target: Vec<String>,

    /// Time cost: "uniform:<c>" or "gradient:<c0>,<g>" (cost grows along y)
    #[arg(long, default_value = "uniform:1.0")]
    cost: String,

    /// Convergence tolerance
    #[arg(short = 't', long, default_value = "0.0")]
    tolerance: f64,

    /// Number of Rayon worker threads
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Safety limit on total local updates before aborting
    #[arg(long)]
    max_relaxations: Option<u64>,

    /// Print convergence progress to stderr (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in milliseconds (used with --progress)
    #[arg(long, default_value = "500")]
    progress_interval: u64,

    /// Output file path (.npy)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the interpolated potential at "<x>,<y>" (repeatable)
    #[arg(long, num_args = 1)]
    query: Vec<String>,
}

fn parse_floats(s: &str, what: &str, expected: usize) -> Result<Vec<f64>> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated floats", what))?;
    if parts.len() != expected {
        bail!("{} has {} components, expected {}", what, parts.len(), expected);
    }
    Ok(parts)
}

fn parse_size(s: &str) -> Result<(usize, usize)> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("invalid --size: expected comma-separated integers")?;
    if parts.len() != 2 {
        bail!("--size has {} components, expected 2", parts.len());
    }
    Ok((parts[0], parts[1]))
}

fn parse_target(s: &str) -> Result<Shape> {
    if let Some(params) = s.strip_prefix("circle:") {
        let p = parse_floats(params, "circle target", 3)?;
        if p[2].is_nan() || p[2] < 0.0 {
            bail!("circle radius must be non-negative, got {}", p[2]);
        }
        return Ok(Shape::Circle {
            center: [p[0], p[1]],
            radius: p[2],
        });
    }

    if let Some(params) = s.strip_prefix("rect:") {
        let p = parse_floats(params, "rect target", 4)?;
        return Ok(Shape::Rectangle {
            min: [p[0].min(p[2]), p[1].min(p[3])],
            max: [p[0].max(p[2]), p[1].max(p[3])],
        });
    }

    bail!(
        "unknown --target: '{}'. Expected 'circle:<x>,<y>,<r>' or 'rect:<x0>,<y0>,<x1>,<y1>'",
        s
    );
}

fn run<C: TimeCost + 'static>(
    cli: &Cli,
    mesh: TriMesh,
    targets: Vec<Shape>,
    cost: C,
) -> Result<()> {
    let mut solver = MeshEikonalSolver::new(mesh, targets, cost)
        .with_tolerance(cli.tolerance)?
        .with_threads(cli.threads);
    if let Some(max) = cli.max_relaxations {
        solver = solver.with_max_relaxations(max);
    }
    if cli.progress {
        solver = solver.with_observer(ProgressPrinter::new(cli.progress_interval));
    }

    let stats = solver.solve().context("solve failed")?;
    info!(
        rounds = stats.rounds,
        relaxations = stats.relaxations,
        activations = stats.activations,
        max_band = stats.max_band,
        "solved"
    );

    for q in &cli.query {
        let p = parse_floats(q, "--query", 2)?;
        println!("T({}, {}) = {}", p[0], p[1], solver.potential_at(p[0], p[1]));
    }

    if let Some(path) = &cli.output {
        solver
            .save_potentials(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "potential field written");
    }
    Ok(())
}

/// Prints round progress to stderr, at most once per interval.
struct ProgressPrinter {
    interval_ms: u64,
    last_print: AtomicU64,
}

impl ProgressPrinter {
    fn new(interval_ms: u64) -> Self {
        ProgressPrinter {
            interval_ms,
            last_print: AtomicU64::new(0),
        }
    }
}

impl MarchObserver for ProgressPrinter {
    fn on_round(&self, info: &RoundInfo) {
        let now_ms = info.elapsed.as_millis() as u64;
        let prev = self.last_print.load(Ordering::Relaxed);
        if now_ms >= prev + self.interval_ms {
            self.last_print.store(now_ms, Ordering::Relaxed);
            eprintln!(
                "[{:.1}s] round={} band={} relaxations={}",
                info.elapsed.as_secs_f64(),
                info.round,
                info.band_size,
                info.relaxations,
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.target.is_empty() {
        bail!("at least one --target must be specified");
    }
    let targets = cli
        .target
        .iter()
        .map(String::as_str)
        .map(parse_target)
        .collect::<Result<Vec<_>>>()?;

    let (nx, ny) = parse_size(&cli.size)?;
    let mesh = TriMesh::regular_grid(nx, ny, cli.spacing)?;
    info!(vertices = nx * ny, targets = targets.len(), "mesh built");

    if let Some(val_str) = cli.cost.strip_prefix("uniform:") {
        let c: f64 = val_str.parse().context("invalid uniform cost value")?;
        return run(&cli, mesh, targets, UniformCost(c));
    }

    if let Some(params) = cli.cost.strip_prefix("gradient:") {
        let p = parse_floats(params, "gradient cost", 2)?;
        let (c0, g) = (p[0], p[1]);
        let cost = FnCost::new(move |x: Point| c0 + g * x[1]);
        return run(&cli, mesh, targets, cost);
    }

    bail!(
        "unknown --cost mode: '{}'. Expected 'uniform:<c>' or 'gradient:<c0>,<g>'",
        cli.cost
    );
}
