//! Thin benchmark entry point (§2, §10): loads a mesh document (or falls
//! back to a small synthetic sphere mesh) and an optional `EngineConfig`
//! JSON file, builds the metric sampler `build_sampler` describes from that
//! config, and runs the mesh through a handful of `(smoother,
//! implementation)` configurations via [`BenchmarkRunner`], logging the
//! resulting plot. No plotting/rendering here — a `Reporter` collaborator is
//! expected to turn [`OptimizationPlot`] into a chart.
//!
//! Usage: `benchmark [mesh.json] [config.json]`.

use log::{info, LevelFilter};

use meshopt_engine::benchmark::{BenchmarkConfig, BenchmarkRunner};
use meshopt_engine::config::{mesh_bounds, EngineConfig};
use meshopt_engine::geometry::Vec3;
use meshopt_engine::io;
use meshopt_engine::mesh::{Element, Vertex, VOLUME_CONSTRAINT};
use meshopt_engine::scheduler::Scheduler;
use meshopt_engine::smoother::laplace::laplace_smoother;
use meshopt_engine::smoother::quality_laplace::quality_laplace_smoother;
use meshopt_engine::smoother::Implementation;
use meshopt_engine::topologist::Topologist;
use meshopt_engine::{Mesh, Schedule};

/// A small octahedron-of-tets mesh used when no mesh document is given on
/// the command line: one interior vertex surrounded by a ring of boundary
/// vertices, enough to exercise relocation without needing a file.
fn synthetic_mesh() -> Mesh {
    let mut mesh = Mesh::new();
    let ring = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];
    for p in ring {
        mesh.add_vertex(Vertex::fixed(p, VOLUME_CONSTRAINT));
    }
    let center = mesh.add_vertex(Vertex::interior(Vec3::new(0.1, 0.05, 0.05)));

    let faces: [[u32; 3]; 8] = [
        [0, 1, 4],
        [1, 2, 4],
        [2, 3, 4],
        [3, 0, 4],
        [1, 0, 5],
        [2, 1, 5],
        [3, 2, 5],
        [0, 3, 5],
    ];
    for f in faces {
        mesh.add_element(Element::Tet([f[0], f[1], f[2], center]));
    }
    mesh.compile_topology();
    mesh
}

fn load_mesh_from_arg(path: &str) -> meshopt_engine::Result<Mesh> {
    let bytes = std::fs::read(path)?;
    let doc = io::load_mesh_document(&bytes)?;
    doc.try_into()
}

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();

    let mesh = match std::env::args().nth(1) {
        Some(path) => match load_mesh_from_arg(&path) {
            Ok(m) => m,
            Err(e) => {
                log::error!("failed to load {path}: {e}, falling back to the synthetic mesh");
                synthetic_mesh()
            }
        },
        None => synthetic_mesh(),
    };

    let config = match std::env::args().nth(2) {
        Some(path) => io::load_config_file(std::path::Path::new(&path)).unwrap_or_else(|e| {
            log::error!("failed to load config {path}: {e}, falling back to EngineConfig::default()");
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    }
    .clamp_thread_counts();
    let (origin, extent) = mesh_bounds(&mesh, 1.0);
    let sampler = config.build_sampler(origin, extent);
    let laplace = laplace_smoother();
    let quality_laplace = quality_laplace_smoother();

    let schedule = Schedule { global_pass_count: 5, relocation_pass_count: 3, ..Schedule::default() };
    let runner = BenchmarkRunner::new(Scheduler::new(schedule, Topologist::default()));

    let configs = vec![
        BenchmarkConfig { label: "laplace-serial", sampler: &sampler, smoother: &laplace, implementation: Implementation::Serial },
        BenchmarkConfig { label: "laplace-thread", sampler: &sampler, smoother: &laplace, implementation: Implementation::Thread },
        BenchmarkConfig {
            label: "quality_laplace-serial",
            sampler: &sampler,
            smoother: &quality_laplace,
            implementation: Implementation::Serial,
        },
    ];

    let plot = runner.run(&mesh, &configs);
    for entry in plot.entries() {
        info!(
            "{:<24} pass={} min={:.4} mean={:.4} max={:.4} ({:.3}s)",
            entry.config_label,
            entry.pass_index,
            entry.histogram.min(),
            entry.histogram.mean(),
            entry.histogram.max(),
            entry.elapsed_secs
        );
    }
}
