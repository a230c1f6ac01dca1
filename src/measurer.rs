//! Geometric measurements taken under a [`MetricSampler`]'s metric field:
//! distance, element volume, local size, and the Laplacian-style vertex
//! equilibrium target the Laplace-family smoothers relax toward.

use crate::error::Result;
use crate::geometry::{metric_quadratic_form, signed_volume6, Mat3, Vec3};
use crate::mesh::{Element, ElementKind, Mesh};
use crate::sampler::{MetricSampler, RefTetHint};

/// Quadrature points used by [`riemannian_distance`]'s midpoint rule.
const DISTANCE_QUADRATURE_POINTS: u32 = 4;

/// `∫√(dxᵀ M(x) dx)` along the straight segment `a → b`, via a small
/// fixed composite midpoint rule. Falls back to Euclidean distance if the
/// sampler isn't metric-wise.
pub fn riemannian_distance(sampler: &dyn MetricSampler, a: Vec3, b: Vec3, hint: &RefTetHint) -> f64 {
    if !sampler.is_metric_wise() {
        return (b - a).norm();
    }
    let seg = b - a;
    let mut total = 0.0;
    for i in 0..DISTANCE_QUADRATURE_POINTS {
        let t0 = i as f64 / DISTANCE_QUADRATURE_POINTS as f64;
        let t1 = (i + 1) as f64 / DISTANCE_QUADRATURE_POINTS as f64;
        let tm = 0.5 * (t0 + t1);
        let pm = a + seg * tm;
        let m = sampler.metric_at(pm, hint).unwrap_or_else(|_| Mat3::identity());
        let dx = seg * (t1 - t0);
        total += metric_quadratic_form(&m, &dx).max(0.0).sqrt();
    }
    total
}

/// Signed volume of the tetrahedron `verts` under the metric sampled at
/// its centroid: `(Euclidean volume) * sqrt(det M)`.
pub fn tet_volume(sampler: &dyn MetricSampler, verts: &[Vec3; 4], hint: &RefTetHint) -> f64 {
    let vol6 = signed_volume6(&verts[0], &verts[1], &verts[2], &verts[3]);
    if !sampler.is_metric_wise() {
        return vol6 / 6.0;
    }
    let centroid = (verts[0] + verts[1] + verts[2] + verts[3]) / 4.0;
    let m = sampler.metric_at(centroid, hint).unwrap_or_else(|_| Mat3::identity());
    let scale = m.determinant().max(0.0).sqrt();
    vol6 / 6.0 * scale
}

fn decomposed_volume(
    sampler: &dyn MetricSampler,
    element: &Element,
    local_positions: &[Vec3],
    hint: &RefTetHint,
) -> f64 {
    element
        .tet_decomposition()
        .iter()
        .map(|&[a, b, c, d]| {
            let verts = [
                local_positions[a as usize],
                local_positions[b as usize],
                local_positions[c as usize],
                local_positions[d as usize],
            ];
            tet_volume(sampler, &verts, hint)
        })
        .sum()
}

pub fn pri_volume(sampler: &dyn MetricSampler, verts: &[Vec3; 6], hint: &RefTetHint) -> f64 {
    let placeholder = Element::Pri([0, 1, 2, 3, 4, 5]);
    decomposed_volume(sampler, &placeholder, verts, hint)
}

pub fn hex_volume(sampler: &dyn MetricSampler, verts: &[Vec3; 8], hint: &RefTetHint) -> f64 {
    let placeholder = Element::Hex([0, 1, 2, 3, 4, 5, 6, 7]);
    decomposed_volume(sampler, &placeholder, verts, hint)
}

/// Signed volume of any element, by kind, under the sampled metric.
pub fn element_volume(sampler: &dyn MetricSampler, element: &Element, positions: &[Vec3], hint: &RefTetHint) -> f64 {
    let local: Vec<Vec3> = element.vertices().iter().map(|&v| positions[v as usize]).collect();
    match element.kind() {
        ElementKind::Tet => tet_volume(sampler, &[local[0], local[1], local[2], local[3]], hint),
        ElementKind::Pri => pri_volume(sampler, &[local[0], local[1], local[2], local[3], local[4], local[5]], hint),
        ElementKind::Hex => hex_volume(
            sampler,
            &[local[0], local[1], local[2], local[3], local[4], local[5], local[6], local[7]],
            hint,
        ),
    }
}

/// Mean Euclidean edge length from `v` to its mesh neighbors.
pub fn compute_local_element_size(mesh: &Mesh, v: u32) -> f64 {
    let neighbors = &mesh.topology.adjacent_vertices[v as usize];
    if neighbors.is_empty() {
        return 0.0;
    }
    let p = mesh.vertices[v as usize].position;
    let total: f64 = neighbors.iter().map(|&n| (mesh.vertices[n as usize].position - p).norm()).sum();
    total / neighbors.len() as f64
}

/// Weighted centroid of the ring of incident elements' *other* vertices
/// (each incident element contributes its non-`v` vertices, weighted by
/// `element.vertex_count() - 1` so larger elements don't get
/// over-represented per-vertex). The Laplacian relaxation target.
pub fn compute_vertex_equilibrium(mesh: &Mesh, v: u32) -> Result<Vec3> {
    let mut sum = Vec3::zeros();
    let mut weight_total = 0.0;
    for &eid in &mesh.topology.incident_elements[v as usize] {
        let element = &mesh.elements[eid as usize];
        let weight = (element.kind().vertex_count() - 1) as f64;
        for &other in element.vertices() {
            if other != v {
                sum += mesh.vertices[other as usize].position * weight;
                weight_total += weight;
            }
        }
    }
    if weight_total == 0.0 {
        return Ok(mesh.vertices[v as usize].position);
    }
    Ok(sum / weight_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Vertex;
    use crate::sampler::AnalyticSampler;

    #[test]
    fn tet_volume_under_euclidean_metric_matches_geometry() {
        let sampler = AnalyticSampler::new(|_p| Mat3::identity());
        let hint = RefTetHint::new();
        let verts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let vol = tet_volume(&sampler, &verts, &hint);
        assert!((vol - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn scaled_metric_scales_volume_by_sqrt_det() {
        let sampler = AnalyticSampler::uniform(2.0); // M = 4 I, det = 64, sqrt = 8
        let hint = RefTetHint::new();
        let verts = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let vol = tet_volume(&sampler, &verts, &hint);
        assert!((vol - 8.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn vertex_equilibrium_of_a_single_tet_is_the_opposite_face_centroid() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(3.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 3.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 3.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.compile_topology();
        let eq = compute_vertex_equilibrium(&mesh, 0).unwrap();
        let expected = (Vec3::new(3.0, 0.0, 0.0) + Vec3::new(0.0, 3.0, 0.0) + Vec3::new(0.0, 0.0, 3.0)) / 3.0;
        assert!((eq - expected).norm() < 1e-12);
    }
}
