//! Spawn Search: stochastic candidate generation in a ball around `v`
//! that shrinks each round, deterministic per vertex (seeded from the
//! vertex id) so repeated runs over the same mesh are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::Vec3;
use crate::measurer;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

pub struct SpawnSearchGenerator {
    pub samples_per_round: u32,
    pub rounds: u32,
    pub initial_radius_factor: f64,
    pub shrink_factor: f64,
}

impl Default for SpawnSearchGenerator {
    fn default() -> Self {
        Self { samples_per_round: 8, rounds: 4, initial_radius_factor: 0.5, shrink_factor: 0.5 }
    }
}

impl CandidateGenerator for SpawnSearchGenerator {
    fn candidates(&self, mesh: &Mesh, _crew: &MeshCrew, _hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let p = mesh.vertices[v as usize].position;
        let mut radius = measurer::compute_local_element_size(mesh, v).max(1e-9) * self.initial_radius_factor;
        let mut rng = ChaCha8Rng::seed_from_u64(0x9E37_79B9_7F4A_7C15 ^ (v as u64));

        let mut out = Vec::with_capacity((self.samples_per_round * self.rounds) as usize);
        for _ in 0..self.rounds {
            for _ in 0..self.samples_per_round {
                let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
                let dir = if dir.norm() > 1e-12 { dir.normalize() } else { Vec3::x() };
                let r = rng.gen_range(0.0..radius);
                out.push(p + dir * r);
            }
            radius *= self.shrink_factor;
        }
        out
    }
}

pub type SpawnSearchSmoother = VertexWiseDriver<SpawnSearchGenerator>;

pub fn spawn_search_smoother() -> SpawnSearchSmoother {
    VertexWiseDriver::new("spawn_search", SpawnSearchGenerator::default())
}
