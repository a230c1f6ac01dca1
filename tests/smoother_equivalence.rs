//! Invariant 7: for every vertex-wise smoother, Serial and Thread produce
//! the same min and harmonic-mean quality after one pass (within 1e-6),
//! since every candidate in `VertexWiseDriver::best_position` is scored
//! against the pre-pass snapshot regardless of which loop drives a group.
//! The last test below covers a hex with two body-diagonal interior
//! vertices, the shape a tet-only mesh can't exercise (see
//! `mesh::groups`).

use meshopt_engine::evaluator;
use meshopt_engine::geometry::{Mat3, Vec3};
use meshopt_engine::mesh::{Element, Vertex, VOLUME_CONSTRAINT};
use meshopt_engine::sampler::{AnalyticSampler, RefTetHint};
use meshopt_engine::smoother::laplace::laplace_smoother;
use meshopt_engine::smoother::nelder_mead::nelder_mead_smoother;
use meshopt_engine::smoother::quality_laplace::quality_laplace_smoother;
use meshopt_engine::smoother::spawn_search::spawn_search_smoother;
use meshopt_engine::smoother::{Implementation, MeshCrew, Smoother};
use meshopt_engine::Mesh;

fn euclid() -> AnalyticSampler<impl Fn(Vec3) -> Mat3 + Send + Sync> {
    AnalyticSampler::new(|_p| Mat3::identity())
}

/// A jittered unit hexahedron split into the same ring-of-tets shape used
/// elsewhere in the suite, but with two interior vertices so independent
/// groups are non-trivial.
fn twin_interior_mesh() -> Mesh {
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
    let north = mesh.add_vertex(Vertex::interior(Vec3::new(0.05, 0.1, 0.2)));
    let south = mesh.add_vertex(Vertex::interior(Vec3::new(-0.1, -0.05, -0.2)));

    for f in [[0u32, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]] {
        mesh.add_element(Element::Tet([f[0], f[1], f[2], north]));
    }
    for f in [[1u32, 0, 5], [2, 1, 5], [3, 2, 5], [0, 3, 5]] {
        mesh.add_element(Element::Tet([f[0], f[1], f[2], south]));
    }
    mesh.compile_topology();
    mesh
}

/// A single unit-cube hex where local corners 0 and 6 (a body diagonal, not
/// an edge) are both interior. With edge-adjacency-based grouping these two
/// would wrongly land in the same independent group, so Serial (which reads
/// 0's post-relocation position when scoring 6) and Thread (which scores
/// both against the pre-pass snapshot) would diverge.
fn hex_with_diagonal_interior_pair() -> Mesh {
    let mut mesh = Mesh::new();
    let cube = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ];
    for (i, p) in cube.iter().enumerate() {
        let jitter = if i == 0 { Vec3::new(0.1, 0.05, 0.08) } else if i == 6 { Vec3::new(-0.08, -0.05, -0.1) } else { Vec3::zeros() };
        let p = *p + jitter;
        if i == 0 || i == 6 {
            mesh.add_vertex(Vertex::interior(p));
        } else {
            mesh.add_vertex(Vertex::fixed(p, VOLUME_CONSTRAINT));
        }
    }
    mesh.add_element(Element::Hex([0, 1, 2, 3, 4, 5, 6, 7]));
    mesh.compile_topology();
    mesh
}

fn min_and_harmonic_mean(mesh: &Mesh) -> (f64, f64) {
    let sampler = euclid();
    let hint = RefTetHint::new();
    let positions: Vec<Vec3> = mesh.vertices.iter().map(|v| v.position).collect();
    let mut min_q = f64::INFINITY;
    let mut reciprocal_sum = 0.0;
    let mut n = 0usize;
    for (_, e) in mesh.alive_elements() {
        let q = evaluator::element_quality(&sampler, &hint, e, &positions).max(1e-9);
        min_q = min_q.min(q);
        reciprocal_sum += 1.0 / q;
        n += 1;
    }
    (min_q, n as f64 / reciprocal_sum)
}

fn assert_serial_and_thread_agree_on(mut mesh_serial: Mesh, smoother: &dyn Smoother, label: &str) {
    let mut mesh_thread = mesh_serial.clone();

    let sampler = euclid();
    let crew_serial = MeshCrew::new(&sampler, Implementation::Serial);
    let crew_thread = MeshCrew::new(&sampler, Implementation::Thread);

    smoother.smooth(&mut mesh_serial, &crew_serial).unwrap();
    smoother.smooth(&mut mesh_thread, &crew_thread).unwrap();

    let (min_s, mean_s) = min_and_harmonic_mean(&mesh_serial);
    let (min_t, mean_t) = min_and_harmonic_mean(&mesh_thread);

    assert!((min_s - min_t).abs() < 1e-6, "{label}: min quality serial={min_s} thread={min_t}");
    assert!((mean_s - mean_t).abs() < 1e-6, "{label}: harmonic mean serial={mean_s} thread={mean_t}");
}

fn assert_serial_and_thread_agree(smoother: &dyn Smoother, label: &str) {
    assert_serial_and_thread_agree_on(twin_interior_mesh(), smoother, label);
}

#[test]
fn invariant_7_laplace_serial_and_thread_agree() {
    assert_serial_and_thread_agree(&laplace_smoother(), "laplace");
}

#[test]
fn invariant_7_quality_laplace_serial_and_thread_agree() {
    assert_serial_and_thread_agree(&quality_laplace_smoother(), "quality_laplace");
}

#[test]
fn invariant_7_spawn_search_serial_and_thread_agree() {
    assert_serial_and_thread_agree(&spawn_search_smoother(), "spawn_search");
}

#[test]
fn invariant_7_nelder_mead_serial_and_thread_agree() {
    assert_serial_and_thread_agree(&nelder_mead_smoother(), "nelder_mead");
}

#[test]
fn invariant_7_hex_with_diagonal_interior_pair_serial_and_thread_agree() {
    assert_serial_and_thread_agree_on(hex_with_diagonal_interior_pair(), &laplace_smoother(), "hex_diagonal_pair");
}
