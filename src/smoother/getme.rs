//! GETMe (Geometric Element Transformation Method): an element-wise
//! smoother. Each element nudges every vertex `v_i` along the
//! area-weighted normal `n_i` of the faces *not* touching `v_i`, by
//! `λ · n_i / sqrt(‖n_i‖)`, then rescales the element uniformly about its
//! centroid to preserve volume. Every element contributes a weighted
//! proposal to a per-vertex accumulator (weight `q'/(1+q)`, pre/post
//! element quality); after the sweep each vertex moves to its
//! accumulator's weighted mean. No independent groups are needed —
//! accumulation is commutative, so the Thread backend just needs a lock
//! per vertex rather than a barrier per group.

use parking_lot::Mutex;

use crate::error::Result;
use crate::evaluator;
use crate::geometry::{signed_volume6, Vec3};
use crate::mesh::{Element, Mesh};
use crate::sampler::RefTetHint;

use super::{Implementation, MeshCrew, Smoother};

fn face_normal_area(tri: [Vec3; 3]) -> Vec3 {
    0.5 * (tri[1] - tri[0]).cross(&(tri[2] - tri[0]))
}

fn local_element_quality(crew: &MeshCrew, hint: &RefTetHint, element: &Element, local: &[Vec3]) -> f64 {
    use crate::mesh::ElementKind;
    match element.kind() {
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
}

fn local_volume(element: &Element, local: &[Vec3]) -> f64 {
    element
        .tet_decomposition()
        .iter()
        .map(|&[a, b, c, d]| {
            signed_volume6(&local[a as usize], &local[b as usize], &local[c as usize], &local[d as usize]) / 6.0
        })
        .sum()
}

/// One element's GETMe-transformed local vertex positions, volume-rescaled
/// about the element centroid.
fn getme_transform(element: &Element, local: &[Vec3], lambda: f64) -> Vec<Vec3> {
    let centroid: Vec3 = local.iter().sum::<Vec3>() / local.len() as f64;
    let tris = element.local_tris();

    let mut next: Vec<Vec3> = local.to_vec();
    for i in 0..local.len() {
        let mut n = Vec3::zeros();
        for tri in tris {
            if tri.contains(&(i as u8)) {
                continue;
            }
            let pts = [local[tri[0] as usize], local[tri[1] as usize], local[tri[2] as usize]];
            let mut face_normal = face_normal_area(pts);
            let face_centroid = (pts[0] + pts[1] + pts[2]) / 3.0;
            if face_normal.dot(&(face_centroid - centroid)) < 0.0 {
                face_normal = -face_normal;
            }
            n += face_normal;
        }
        let norm = n.norm();
        if norm > 1e-12 {
            next[i] = local[i] + n / norm.sqrt() * lambda;
        }
    }

    let original_volume = local_volume(element, local);
    let new_volume = local_volume(element, &next);
    if new_volume.abs() > 1e-15 {
        let scale = (original_volume / new_volume).abs().powf(1.0 / 3.0);
        for p in next.iter_mut() {
            *p = centroid + (*p - centroid) * scale;
        }
    }
    next
}

#[derive(Clone, Copy, Default)]
struct VertexAccum {
    weighted_sum: Vec3,
    weight_total: f64,
}

impl VertexAccum {
    fn new() -> Self {
        Self { weighted_sum: Vec3::zeros(), weight_total: 0.0 }
    }
}

pub struct GetmeSmoother {
    pub lambda: f64,
}

impl Default for GetmeSmoother {
    fn default() -> Self {
        Self { lambda: 0.1 }
    }
}

impl GetmeSmoother {
    fn accumulate_one(&self, mesh: &Mesh, crew: &MeshCrew, hint: &RefTetHint, eid: u32, accum: &Mutex<Vec<VertexAccum>>) {
        let element = &mesh.elements[eid as usize];
        let verts = element.vertices();
        let local: Vec<Vec3> = verts.iter().map(|&v| mesh.vertices[v as usize].position).collect();

        let q_before = local_element_quality(crew, hint, element, &local);
        let next_local = getme_transform(element, &local, self.lambda);
        let q_after = local_element_quality(crew, hint, element, &next_local);
        let weight = (q_after / (1.0 + q_before)).max(1e-9);

        let mut guard = accum.lock();
        for (i, &v) in verts.iter().enumerate() {
            let entry = &mut guard[v as usize];
            entry.weighted_sum += next_local[i] * weight;
            entry.weight_total += weight;
        }
    }
}

impl Smoother for GetmeSmoother {
    fn smooth(&self, mesh: &mut Mesh, crew: &MeshCrew) -> Result<()> {
        let accum = Mutex::new(vec![VertexAccum::new(); mesh.vertices.len()]);
        let elements: Vec<u32> = mesh.alive_elements().map(|(eid, _)| eid).collect();

        match crew.implementation {
            Implementation::Serial => {
                let hint = RefTetHint::new();
                for eid in elements {
                    self.accumulate_one(mesh, crew, &hint, eid, &accum);
                }
            }
            Implementation::Thread => {
                use rayon::prelude::*;
                elements.par_iter().for_each(|&eid| {
                    let hint = RefTetHint::new();
                    self.accumulate_one(mesh, crew, &hint, eid, &accum);
                });
            }
            Implementation::Glsl => return Err(crate::error::Error::ImplementationMissing { name: "glsl" }),
            Implementation::Cuda => return Err(crate::error::Error::ImplementationMissing { name: "cuda" }),
        }

        let accum = accum.into_inner();
        for (v, entry) in accum.into_iter().enumerate() {
            if entry.weight_total <= 0.0 {
                continue;
            }
            let vertex = &mut mesh.vertices[v];
            if vertex.is_fixed {
                continue;
            }
            let mut p = entry.weighted_sum / entry.weight_total;
            if vertex.is_boundary() {
                p = mesh.constraints.project(vertex.constraint, p);
            }
            vertex.position = p;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "getme"
    }
}
