//! Local metric sampler: stores the source mesh's tets with a per-tet
//! metric and resolves `metric_at` by walking from the hint cell across
//! face neighbors toward the query point, in the tradition of a mesh
//! point-location walk.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::geometry::{Mat3, Vec3};
use crate::sampler::{MetricSampler, RefTetHint};

const MAX_WALK_STEPS: u32 = 64;
const BARY_EPS: f64 = 1e-9;

struct SourceTet {
    verts: [Vec3; 4],
    metric: Mat3,
    /// Neighbor across each of the 4 faces (face `i` is opposite vertex
    /// `i`), `None` at the mesh boundary.
    neighbors: [Option<u32>; 4],
}

/// Samples the metric recorded on a background tet mesh, accelerated by a
/// walk from the caller's [`RefTetHint`].
pub struct LocalSampler {
    tets: Vec<SourceTet>,
}

impl LocalSampler {
    /// Build from a flat list of tets (4 positions + 1 metric each). Face
    /// adjacency is derived by matching shared vertex triples.
    pub fn new(tets: Vec<([Vec3; 4], Mat3)>) -> Self {
        let mut face_owner: HashMap<[u64; 3], (u32, u8)> = HashMap::new();
        let mut neighbors = vec![[None; 4]; tets.len()];

        let quantize = |v: &Vec3| -> [i64; 3] {
            [
                (v.x * 1e9).round() as i64,
                (v.y * 1e9).round() as i64,
                (v.z * 1e9).round() as i64,
            ]
        };
        let face_key = |tet: &[Vec3; 4], opposite: usize| -> [u64; 3] {
            let mut idx: Vec<usize> = (0..4).filter(|&i| i != opposite).collect();
            let mut pts: Vec<[i64; 3]> = idx.drain(..).map(|i| quantize(&tet[i])).collect();
            pts.sort();
            [
                pts[0][0] as u64 ^ (pts[0][1] as u64).rotate_left(21) ^ (pts[0][2] as u64).rotate_left(42),
                pts[1][0] as u64 ^ (pts[1][1] as u64).rotate_left(21) ^ (pts[1][2] as u64).rotate_left(42),
                pts[2][0] as u64 ^ (pts[2][1] as u64).rotate_left(21) ^ (pts[2][2] as u64).rotate_left(42),
            ]
        };

        for (ti, (verts, _)) in tets.iter().enumerate() {
            for face in 0..4u8 {
                let key = face_key(verts, face as usize);
                match face_owner.remove(&key) {
                    Some((other_ti, other_face)) => {
                        neighbors[ti][face as usize] = Some(other_ti);
                        neighbors[other_ti as usize][other_face as usize] = Some(ti as u32);
                    }
                    None => {
                        face_owner.insert(key, (ti as u32, face));
                    }
                }
            }
        }

        let tets = tets
            .into_iter()
            .zip(neighbors)
            .map(|((verts, metric), neighbors)| SourceTet { verts, metric, neighbors })
            .collect();

        Self { tets }
    }

    /// Barycentric coordinates of `p` in tet `ti`.
    fn barycentric(&self, ti: u32, p: Vec3) -> [f64; 4] {
        let t = &self.tets[ti as usize];
        let mat = Mat3::from_columns(&[t.verts[1] - t.verts[0], t.verts[2] - t.verts[0], t.verts[3] - t.verts[0]]);
        let rhs = p - t.verts[0];
        let sol = mat.lu().solve(&rhs).unwrap_or(Vec3::zeros());
        let (l1, l2, l3) = (sol.x, sol.y, sol.z);
        [1.0 - l1 - l2 - l3, l1, l2, l3]
    }
}

impl MetricSampler for LocalSampler {
    fn metric_at(&self, p: Vec3, hint: &RefTetHint) -> Result<Mat3> {
        if self.tets.is_empty() {
            return Err(Error::OutOfDomain);
        }
        let mut current = hint.get().filter(|&i| (i as usize) < self.tets.len()).unwrap_or(0);

        for _ in 0..MAX_WALK_STEPS {
            let bary = self.barycentric(current, p);
            if let Some(worst) = (0..4).filter(|&i| bary[i] < -BARY_EPS).min_by(|&a, &b| bary[a].partial_cmp(&bary[b]).unwrap()) {
                match self.tets[current as usize].neighbors[worst] {
                    Some(next) => {
                        current = next;
                        continue;
                    }
                    None => return Err(Error::OutOfDomain),
                }
            }
            hint.set(Some(current));
            return Ok(self.tets[current as usize].metric);
        }
        Err(Error::OutOfDomain)
    }
}
