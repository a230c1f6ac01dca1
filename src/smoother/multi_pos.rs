//! Multi-Pos GD / Patch GD: multi-vertex block optimization. Rather than
//! relocating a vertex once and moving on, this smoother sweeps an entire
//! independent group several times, each member taking one gradient step
//! against the *current* (already-updated-this-pass) positions of its
//! groupmates — so the block settles jointly instead of each vertex
//! reacting only to the previous pass's positions.

use crate::error::Result;
use crate::geometry::Vec3;
use crate::measurer;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::trial_patch_quality;
use super::{Implementation, MeshCrew, Smoother};

const SWEEPS_PER_GROUP: u32 = 3;

fn gradient_step(mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec3 {
    let vertex = &mesh.vertices[v as usize];
    let p = vertex.position;
    if vertex.is_fixed || mesh.topology.adjacent_vertices[v as usize].is_empty() {
        return p;
    }
    let h = crew.gradient_step.max(1e-6);
    let f = |pt: Vec3| trial_patch_quality(mesh, crew, hint, v, pt);
    let f0 = f(p);
    let axis = |d: Vec3| (f(p + d * h) - f(p - d * h)) / (2.0 * h);
    let grad = Vec3::new(axis(Vec3::x()), axis(Vec3::y()), axis(Vec3::z()));
    if grad.norm() < 1e-12 {
        return p;
    }
    let dir = grad.normalize();
    let mut step = measurer::compute_local_element_size(mesh, v).max(1e-9);
    let mut candidate = p;
    for _ in 0..6 {
        candidate = p + dir * step;
        if f(candidate) > f0 {
            break;
        }
        step *= 0.5;
    }
    if vertex.is_boundary() {
        candidate = mesh.constraints.project(vertex.constraint, candidate);
    }
    candidate
}

pub struct MultiPosSmoother {
    pub sweeps: u32,
}

impl Default for MultiPosSmoother {
    fn default() -> Self {
        Self { sweeps: SWEEPS_PER_GROUP }
    }
}

impl Smoother for MultiPosSmoother {
    fn smooth(&self, mesh: &mut Mesh, crew: &MeshCrew) -> Result<()> {
        let groups = mesh.topology.independent_groups.clone();
        for group in &groups {
            for _ in 0..self.sweeps {
                match crew.implementation {
                    Implementation::Serial => {
                        let hint = RefTetHint::new();
                        for &v in group {
                            let p = gradient_step(mesh, crew, &hint, v);
                            mesh.vertices[v as usize].position = p;
                        }
                    }
                    Implementation::Thread => {
                        use rayon::prelude::*;
                        let updates: Vec<(u32, Vec3)> = group
                            .par_iter()
                            .map(|&v| {
                                let hint = RefTetHint::new();
                                (v, gradient_step(mesh, crew, &hint, v))
                            })
                            .collect();
                        for (v, p) in updates {
                            mesh.vertices[v as usize].position = p;
                        }
                    }
                    Implementation::Glsl => return Err(crate::error::Error::ImplementationMissing { name: "glsl" }),
                    Implementation::Cuda => return Err(crate::error::Error::ImplementationMissing { name: "cuda" }),
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "multi_pos"
    }
}
