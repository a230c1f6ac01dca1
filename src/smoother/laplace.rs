//! Spring Laplace: the textbook single-proposal smoother. The one
//! candidate is the weighted centroid of `v`'s neighbors, weighted by
//! squared distance (farther neighbors pull harder, which is what keeps
//! this from degenerating into a plain unweighted average on irregular
//! rings).

use crate::geometry::Vec3;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

pub struct LaplaceGenerator;

impl CandidateGenerator for LaplaceGenerator {
    fn candidates(&self, mesh: &Mesh, _crew: &MeshCrew, _hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let neighbors = &mesh.topology.adjacent_vertices[v as usize];
        let p = mesh.vertices[v as usize].position;

        let mut weighted_sum = Vec3::zeros();
        let mut weight_total = 0.0;
        for &n in neighbors {
            let q = mesh.vertices[n as usize].position;
            let w = (q - p).norm_squared();
            weighted_sum += q * w;
            weight_total += w;
        }
        if weight_total <= 0.0 {
            return Vec::new();
        }
        vec![weighted_sum / weight_total]
    }
}

pub type LaplaceSmoother = VertexWiseDriver<LaplaceGenerator>;

pub fn laplace_smoother() -> LaplaceSmoother {
    VertexWiseDriver::new("laplace", LaplaceGenerator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Element, Vertex};
    use crate::sampler::AnalyticSampler;
    use crate::smoother::{Implementation, Smoother};

    #[test]
    fn pulls_an_offset_interior_vertex_toward_its_ring() {
        let mut mesh = Mesh::new();
        // A flat fan of 5 boundary-ish points around an off-center interior
        // vertex 0; ring vertices fixed so only vertex 0 moves.
        let ring = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
        ];
        mesh.add_vertex(Vertex::interior(Vec3::new(0.5, 0.5, 0.0)));
        for r in ring {
            mesh.add_vertex(Vertex::fixed(r, crate::mesh::VOLUME_CONSTRAINT));
        }
        mesh.add_vertex(Vertex::fixed(Vec3::new(0.0, 0.0, 1.0), crate::mesh::VOLUME_CONSTRAINT));
        mesh.add_element(Element::Tet([0, 1, 2, 5]));
        mesh.add_element(Element::Tet([0, 2, 3, 5]));
        mesh.add_element(Element::Tet([0, 3, 4, 5]));
        mesh.add_element(Element::Tet([0, 4, 1, 5]));
        mesh.compile_topology();

        let sampler = AnalyticSampler::new(|_p| crate::geometry::Mat3::identity());
        let crew = MeshCrew::new(&sampler, Implementation::Serial);
        let smoother = laplace_smoother();
        let before = (mesh.vertices[0].position - Vec3::zeros()).norm();
        smoother.smooth(&mut mesh, &crew).unwrap();
        let after = (mesh.vertices[0].position - Vec3::zeros()).norm();
        assert!(after < before);
    }
}
