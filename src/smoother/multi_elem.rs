//! Multi-Elem NM/GD: instead of searching raw `x,y,z`, build a reduced
//! basis from the principal axes of `v`'s incident-element ring (the
//! directions its neighbors actually spread along) and do a coordinate
//! search along those, so the optimizer doesn't waste steps in a
//! direction the local patch can't move in anyway.

use crate::geometry::{Mat3, Vec3};
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{trial_patch_quality, CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

const STEP_FRACTIONS: [f64; 5] = [-1.0, -0.5, 0.5, 1.0, 1.5];

/// Mean neighbor distance (the search scale) and the ring's principal
/// axes, ranked by variance. `mean_dist` is `0.0` for an isolated vertex.
fn ring_basis(mesh: &Mesh, v: u32) -> (f64, [Vec3; 3]) {
    let p = mesh.vertices[v as usize].position;
    let neighbors = &mesh.topology.adjacent_vertices[v as usize];
    let offsets: Vec<Vec3> = neighbors.iter().map(|&n| mesh.vertices[n as usize].position - p).collect();
    if offsets.is_empty() {
        return (0.0, [Vec3::x(), Vec3::y(), Vec3::z()]);
    }

    let mut cov = Mat3::zeros();
    for o in &offsets {
        cov += o * o.transpose();
    }
    cov /= offsets.len() as f64;

    let mean_dist = offsets.iter().map(|o| o.norm()).sum::<f64>() / offsets.len() as f64;
    let eig = cov.symmetric_eigen();
    let axes = [
        eig.eigenvectors.column(0).into_owned(),
        eig.eigenvectors.column(1).into_owned(),
        eig.eigenvectors.column(2).into_owned(),
    ];
    (mean_dist, axes)
}

pub struct MultiElemGenerator;

impl CandidateGenerator for MultiElemGenerator {
    fn candidates(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let p = mesh.vertices[v as usize].position;
        let (mean_dist, axes) = ring_basis(mesh, v);
        if mean_dist <= 0.0 {
            return Vec::new();
        }
        let scale = mean_dist * crew.move_coeff.max(0.05);

        let mut current = p;
        for axis in axes {
            let mut best = current;
            let mut best_q = trial_patch_quality(mesh, crew, hint, v, current);
            for &frac in &STEP_FRACTIONS {
                let candidate = current + axis * (frac * scale);
                let q = trial_patch_quality(mesh, crew, hint, v, candidate);
                if q > best_q {
                    best_q = q;
                    best = candidate;
                }
            }
            current = best;
        }
        vec![current]
    }
}

pub type MultiElemSmoother = VertexWiseDriver<MultiElemGenerator>;

pub fn multi_elem_smoother() -> MultiElemSmoother {
    VertexWiseDriver::new("multi_elem", MultiElemGenerator)
}
