//! Face swap (2→3): every interior triangular face shared by exactly two
//! tetrahedra is a candidate for the classic bistellar flip — replace the
//! two tets with three, each joining one edge of the shared triangle to
//! the diagonal connecting the two tets' opposite vertices. Accepted only
//! if the swap strictly improves the worst of the two original qualities
//! and every new tet stays positive-volume.

use std::collections::HashMap;

use crate::error::Result;
use crate::evaluator;
use crate::geometry::{signed_volume6, Vec3};
use crate::mesh::{Element, ElementKind, Mesh};
use crate::sampler::{MetricSampler, RefTetHint};

fn face_key(mut v: [u32; 3]) -> [u32; 3] {
    v.sort_unstable();
    v
}

fn opposite_vertex(element: &Element, face: &[u32; 3]) -> Option<u32> {
    element.vertices().iter().copied().find(|v| !face.contains(v))
}

fn element_positive(element: &Element, positions: &[Vec3]) -> bool {
    element
        .global_tet_decomposition()
        .all(|tet| {
            let pts = tet.map(|i| positions[i as usize]);
            signed_volume6(&pts[0], &pts[1], &pts[2], &pts[3]) > 0.0
        })
}

/// Builds the tet on triangle edge `(x, y)` and diagonal `{a, b}`, trying
/// both orderings of the diagonal and keeping whichever comes out
/// positive-volume. `None` if neither does (degenerate quad).
fn oriented_tet(positions: &[Vec3], x: u32, y: u32, a: u32, b: u32) -> Option<Element> {
    let first = Element::Tet([x, y, a, b]);
    if element_positive(&first, positions) {
        return Some(first);
    }
    let second = Element::Tet([x, y, b, a]);
    if element_positive(&second, positions) {
        return Some(second);
    }
    None
}

/// One scan over all interior tet-tet faces. Returns the number of swaps
/// committed.
pub fn run_pass(mesh: &mut Mesh, sampler: &dyn MetricSampler) -> Result<u32> {
    let hint = RefTetHint::new();

    let mut face_owners: HashMap<[u32; 3], Vec<u32>> = HashMap::new();
    for (eid, element) in mesh.alive_elements() {
        if element.kind() != ElementKind::Tet {
            continue;
        }
        for tri in element.global_tris() {
            face_owners.entry(face_key(tri)).or_default().push(eid);
        }
    }

    let mut swaps = 0u32;
    for (face, owners) in face_owners {
        if owners.len() != 2 {
            continue;
        }
        let (e1, e2) = (owners[0], owners[1]);
        if !mesh.is_element_alive(e1) || !mesh.is_element_alive(e2) {
            continue;
        }
        let el1 = mesh.elements[e1 as usize].clone();
        let el2 = mesh.elements[e2 as usize].clone();
        let (Some(a), Some(b)) = (opposite_vertex(&el1, &face), opposite_vertex(&el2, &face)) else {
            continue;
        };

        let positions: Vec<Vec3> = mesh.vertices.iter().map(|v| v.position).collect();
        let old_min = evaluator::element_quality(sampler, &hint, &el1, &positions)
            .min(evaluator::element_quality(sampler, &hint, &el2, &positions));

        let [p, q, r] = face;
        let (Some(t0), Some(t1), Some(t2)) = (
            oriented_tet(&positions, p, q, a, b),
            oriented_tet(&positions, q, r, a, b),
            oriented_tet(&positions, r, p, a, b),
        ) else {
            continue;
        };
        let candidates = [t0, t1, t2];

        let new_min = candidates
            .iter()
            .map(|c| evaluator::element_quality(sampler, &hint, c, &positions))
            .fold(f64::INFINITY, f64::min);

        if new_min > old_min {
            mesh.kill_element(e1);
            mesh.kill_element(e2);
            for c in candidates {
                mesh.add_element(c);
            }
            swaps += 1;
        }
    }

    Ok(swaps)
}
