//! Thin mesh document inspector: loads a mesh file and an optional
//! `EngineConfig` JSON file, evaluates quality against the metric that
//! config describes (identity by default), and prints a summary histogram.
//! Not a renderer — `meshopt_engine` never draws anything; a `Reporter`
//! collaborator (§6) is expected to consume richer output than this.
//!
//! Usage: `meshview <mesh.json> [config.json]`.

use std::path::Path;

use log::{error, info, LevelFilter};

use meshopt_engine::config::{mesh_bounds, EngineConfig};
use meshopt_engine::evaluator::QualityHistogram;
use meshopt_engine::io;
use meshopt_engine::scheduler::mesh_histogram;
use meshopt_engine::Mesh;

fn print_histogram(label: &str, histogram: &QualityHistogram) {
    info!(
        "{label}: count={} min={:.4} mean={:.4} max={:.4}",
        histogram.count(),
        histogram.min(),
        histogram.mean(),
        histogram.max()
    );
    for (i, &n) in histogram.buckets().iter().enumerate() {
        if n > 0 {
            info!("  bucket[{i:02}] {n}");
        }
    }
}

fn load(path: &Path) -> meshopt_engine::Result<Mesh> {
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

    let path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            error!("usage: meshview <mesh.json>");
            std::process::exit(2);
        }
    };

    let mesh = match load(Path::new(&path)) {
        Ok(m) => m,
        Err(e) => {
            error!("failed to load {path}: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "{path}: {} vertices, {} elements",
        mesh.alive_vertex_count(),
        mesh.alive_elements().count()
    );

    let config = match std::env::args().nth(2) {
        Some(config_path) => io::load_config_file(Path::new(&config_path)).unwrap_or_else(|e| {
            error!("failed to load config {config_path}: {e}, falling back to EngineConfig::default()");
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    }
    .clamp_thread_counts();

    let (origin, extent) = mesh_bounds(&mesh, 1.0);
    let sampler = config.build_sampler(origin, extent);
    let histogram = mesh_histogram(&mesh, &sampler);
    print_histogram("quality (configured metric field)", &histogram);
}
