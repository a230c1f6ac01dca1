//! Gradient Descent: a numerical gradient of patch quality by central
//! differences, stepped along with a simple backtracking line search.

use crate::geometry::Vec3;
use crate::measurer;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{trial_patch_quality, CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

const BACKTRACK_STEPS: u32 = 10;
const BACKTRACK_SHRINK: f64 = 0.5;

pub struct GradientDescentGenerator;

impl CandidateGenerator for GradientDescentGenerator {
    fn candidates(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let p = mesh.vertices[v as usize].position;
        let h = crew.gradient_step.max(1e-6);
        let f = |pt: Vec3| trial_patch_quality(mesh, crew, hint, v, pt);
        let f0 = f(p);

        let axis = |d: Vec3| (f(p + d * h) - f(p - d * h)) / (2.0 * h);
        let grad = Vec3::new(axis(Vec3::x()), axis(Vec3::y()), axis(Vec3::z()));
        if grad.norm() < 1e-12 {
            return Vec::new();
        }
        let dir = grad.normalize();

        let mut step = measurer::compute_local_element_size(mesh, v).max(1e-9);
        let mut out = Vec::with_capacity(BACKTRACK_STEPS as usize);
        for _ in 0..BACKTRACK_STEPS {
            let candidate = p + dir * step;
            let improved = f(candidate) > f0;
            out.push(candidate);
            if improved {
                break;
            }
            step *= BACKTRACK_SHRINK;
        }
        out
    }
}

pub type GradientDescentSmoother = VertexWiseDriver<GradientDescentGenerator>;

pub fn gradient_descent_smoother() -> GradientDescentSmoother {
    VertexWiseDriver::new("gradient_descent", GradientDescentGenerator)
}
