//! Nelder-Mead: a 3-D downhill simplex maximizing patch quality, with the
//! classic `alpha=1, beta=0.5, gamma=2, delta=0.5` coefficients. Runs up
//! to `security_cycle_count` outer cycles per vertex, with the initial
//! simplex scaled by the vertex's local element size so the search radius
//! adapts to mesh density.

use crate::geometry::Vec3;
use crate::measurer;
use crate::mesh::Mesh;
use crate::sampler::RefTetHint;

use super::vertex_wise::{trial_patch_quality, CandidateGenerator, VertexWiseDriver};
use super::MeshCrew;

const ALPHA: f64 = 1.0;
const BETA: f64 = 0.5;
const GAMMA: f64 = 2.0;
const DELTA: f64 = 0.5;

pub struct NelderMeadGenerator;

impl CandidateGenerator for NelderMeadGenerator {
    fn candidates(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, v: u32) -> Vec<Vec3> {
        let p0 = mesh.vertices[v as usize].position;
        let scale = measurer::compute_local_element_size(mesh, v).max(1e-9) * 0.5;

        let mut simplex = [
            p0,
            p0 + Vec3::new(scale, 0.0, 0.0),
            p0 + Vec3::new(0.0, scale, 0.0),
            p0 + Vec3::new(0.0, 0.0, scale),
        ];
        let score = |pt: Vec3| trial_patch_quality(mesh, crew, hint, v, pt);
        let mut values = simplex.map(score);

        for _ in 0..crew.security_cycle_count {
            let mut order = [0usize, 1, 2, 3];
            order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap());
            simplex = order.map(|i| simplex[i]);
            values = order.map(|i| values[i]);

            let (best, second_worst, worst) = (values[0], values[2], values[3]);
            let centroid = (simplex[0] + simplex[1] + simplex[2]) / 3.0;

            let xr = centroid + (centroid - simplex[3]) * ALPHA;
            let fr = score(xr);

            if fr > best {
                let xe = centroid + (centroid - simplex[3]) * GAMMA;
                let fe = score(xe);
                if fe > fr {
                    simplex[3] = xe;
                    values[3] = fe;
                } else {
                    simplex[3] = xr;
                    values[3] = fr;
                }
            } else if fr > second_worst {
                simplex[3] = xr;
                values[3] = fr;
            } else {
                let xc = centroid + (simplex[3] - centroid) * BETA;
                let fc = score(xc);
                if fc > worst {
                    simplex[3] = xc;
                    values[3] = fc;
                } else {
                    for i in 1..4 {
                        simplex[i] = simplex[0] + (simplex[i] - simplex[0]) * DELTA;
                        values[i] = score(simplex[i]);
                    }
                }
            }
        }

        simplex.to_vec()
    }
}

pub type NelderMeadSmoother = VertexWiseDriver<NelderMeadGenerator>;

pub fn nelder_mead_smoother() -> NelderMeadSmoother {
    VertexWiseDriver::new("nelder_mead", NelderMeadGenerator)
}
