//! Quality Laplace: four proposals sampled along the line from `v` to its
//! equilibrium position, at parameters `-m, 0, 1, 1+m` where `m` is the
//! configured move coefficient. `t=1` is plain Laplace; the other three
//! let the driver's quality comparison discover over/undershoot is
//! better on a given ring.

use crate::geometry::Vec3;
use crate::measurer;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

pub struct QualityLaplaceGenerator;

impl CandidateGenerator for QualityLaplaceGenerator {
    fn candidates(&self, mesh: &Mesh, crew: &MeshCrew, _hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let p = mesh.vertices[v as usize].position;
        let equilibrium = match measurer::compute_vertex_equilibrium(mesh, v) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        let m = crew.move_coeff;
        let direction = equilibrium - p;
        [-m, 0.0, 1.0, 1.0 + m].iter().map(|&t| p + direction * t).collect()
    }
}

pub type QualityLaplaceSmoother = VertexWiseDriver<QualityLaplaceGenerator>;

pub fn quality_laplace_smoother() -> QualityLaplaceSmoother {
    VertexWiseDriver::new("quality_laplace", QualityLaplaceGenerator)
}
