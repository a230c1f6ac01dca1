//! The shared vertex-wise smoothing driver: skip fixed/isolated vertices,
//! ask a [`CandidateGenerator`] for proposals, keep whichever improves
//! patch quality the most, project onto the boundary constraint if any.
//! Every named vertex-wise algorithm (Laplace, Quality-Laplace, Spawn
//! Search, Nelder-Mead, Gradient Descent, and the multi-vertex/multi-
//! element variants) is this driver plus a different generator.

use crate::error::Result;
use crate::evaluator;
use crate::geometry::Vec3;
use crate::mesh::{ElementKind, Mesh};
use crate::sampler::RefTetHint;

use super::{Implementation, MeshCrew, Smoother};

/// Produces candidate relocations for vertex `v`. Implementations read
/// whatever of `mesh`/`crew` their algorithm needs; the driver handles
/// skip rules, quality comparison, and boundary projection uniformly.
pub trait CandidateGenerator: Sync {
    fn candidates(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec<Vec3>;
}

/// Patch quality of `v`'s incident elements as if `v` were at `trial`,
/// without mutating the mesh. Shared by every vertex-wise generator that
/// needs to score a candidate before committing to it.
pub(crate) fn trial_patch_quality(mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32, trial: Vec3) -> f64 {
    let incident = &mesh.topology.incident_elements[v as usize];
    if incident.is_empty() {
        return 1.0;
    }
    let mut reciprocal_sum = 0.0;
    for &eid in incident {
        let element = &mesh.elements[eid as usize];
        let local: Vec<Vec3> = element
            .vertices()
            .iter()
            .map(|&u| if u == v { trial } else { mesh.vertices[u as usize].position })
            .collect();
        let q = match element.kind() {
            ElementKind::Tet => evaluator::tet_quality(crew.sampler, hint, &[local[0], local[1], local[2], local[3]]),
            ElementKind::Pri => {
                evaluator::pri_quality(crew.sampler, hint, &[local[0], local[1], local[2], local[3], local[4], local[5]])
            }
            ElementKind::Hex => evaluator::hex_quality(
                crew.sampler,
                hint,
                &[local[0], local[1], local[2], local[3], local[4], local[5], local[6], local[7]],
            ),
        }
        .max(1e-9);
        reciprocal_sum += 1.0 / q;
    }
    incident.len() as f64 / reciprocal_sum
}

/// Wraps a [`CandidateGenerator`] into a full [`Smoother`].
pub struct VertexWiseDriver<G> {
    generator: G,
    name: &'static str,
}

impl<G: CandidateGenerator> VertexWiseDriver<G> {
    pub fn new(name: &'static str, generator: G) -> Self {
        Self { generator, name }
    }

    fn best_position(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec3 {
        let vertex = &mesh.vertices[v as usize];
        let current = vertex.position;
        if vertex.is_fixed || mesh.topology.adjacent_vertices[v as usize].is_empty() {
            return current;
        }

        let mut best = current;
        let mut best_q = trial_patch_quality(mesh, crew, hint, v, current);

        for mut candidate in self.generator.candidates(mesh, crew, hint, v) {
            if vertex.is_boundary() {
                candidate = mesh.constraints.project(vertex.constraint, candidate);
            }
            let q = trial_patch_quality(mesh, crew, hint, v, candidate);
            if q > best_q {
                best_q = q;
                best = candidate;
            }
        }
        best
    }
}

impl<G: CandidateGenerator + Sync> Smoother for VertexWiseDriver<G> {
    fn smooth(&self, mesh: &mut Mesh, crew: &MeshCrew) -> Result<()> {
        let hint = RefTetHint::new();
        let groups = mesh.topology.independent_groups.clone();

        for group in &groups {
            match crew.implementation {
                Implementation::Serial => {
                    for &v in group {
                        let p = self.best_position(mesh, crew, &hint, v);
                        mesh.vertices[v as usize].position = p;
                    }
                }
                Implementation::Thread => {
                    use rayon::prelude::*;
                    let updates: Vec<(u32, Vec3)> = group
                        .par_iter()
                        .map(|&v| {
                            let local_hint = RefTetHint::new();
                            (v, self.best_position(mesh, crew, &local_hint, v))
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
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
