//! BATR (Boundary-Aware Topological Restructuring): the topology-editing
//! half of the optimization loop, alongside the smoother family. Runs in
//! three phases — edge split/merge, face swap (2→3), edge swap — each
//! iterated over the whole mesh until it stops changing or a pass cap is
//! hit. `Mesh::compile_topology` restores every derived structure after
//! each phase (and, inside edge_ops, after every individual edit — later
//! vertices in the same scan need accurate adjacency).

pub mod edge_ops;
pub mod edge_swap;
pub mod face_swap;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::sampler::MetricSampler;

/// Cap on internal iterations within a single phase (§4.5).
pub const MAX_PASSES_PER_PHASE: u32 = 20;

/// Edge-length thresholds driving the split/merge phase.
#[derive(Clone, Copy, Debug)]
pub struct Topologist {
    pub min_edge_length: f64,
    pub max_edge_length: f64,
}

impl Default for Topologist {
    fn default() -> Self {
        Self { min_edge_length: 0.25, max_edge_length: 4.0 }
    }
}

/// How much work each BATR phase did in one [`Topologist::run`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatrReport {
    pub edge_ops_passes: u32,
    pub face_swaps: u32,
    pub edge_swaps: u32,
}

impl Topologist {
    pub fn run(&self, mesh: &mut Mesh, sampler: &dyn MetricSampler) -> Result<BatrReport> {
        let mut report = BatrReport::default();

        for _ in 0..MAX_PASSES_PER_PHASE {
            let changed = edge_ops::run_pass(mesh, sampler, self.min_edge_length, self.max_edge_length)?;
            mesh.compile_topology();
            if changed {
                report.edge_ops_passes += 1;
            } else {
                break;
            }
        }

        for _ in 0..MAX_PASSES_PER_PHASE {
            let swapped = face_swap::run_pass(mesh, sampler)?;
            mesh.compile_topology();
            report.face_swaps += swapped;
            if swapped == 0 {
                break;
            }
        }

        for _ in 0..MAX_PASSES_PER_PHASE {
            let swapped = edge_swap::run_pass(mesh, sampler)?;
            mesh.compile_topology();
            report.edge_swaps += swapped;
            if swapped == 0 {
                break;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mat3, Vec3};
    use crate::mesh::{Element, Vertex};
    use crate::sampler::AnalyticSampler;

    #[test]
    fn a_pass_over_an_already_good_mesh_reports_no_work() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.5, 3f64.sqrt() / 2.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.5, 3f64.sqrt() / 6.0, (2.0 / 3.0f64).sqrt())));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.compile_topology();

        let sampler = AnalyticSampler::new(|_p| Mat3::identity());
        let topologist = Topologist { min_edge_length: 0.01, max_edge_length: 100.0 };
        let report = topologist.run(&mut mesh, &sampler).unwrap();
        assert_eq!(report.edge_ops_passes, 0);
        assert_eq!(report.face_swaps, 0);
        assert_eq!(report.edge_swaps, 0);
        assert_eq!(mesh.alive_elements().count(), 1);
    }
}
