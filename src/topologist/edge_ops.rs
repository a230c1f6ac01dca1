//! Edge split/merge: the first BATR phase. Every alive vertex is scanned
//! for the single shortest incident edge under the minimum length and the
//! single longest over the maximum; whichever deviates more from its
//! threshold is acted on (merge for the short edge, split for the long
//! one), guarded by a dry-run positive-volume check.

use crate::error::Result;
use crate::geometry::{signed_volume6, Vec3};
use crate::measurer;
use crate::mesh::{ConstraintId, Element, Mesh, Vertex, VOLUME_CONSTRAINT};
use crate::sampler::{MetricSampler, RefTetHint};

fn replace_vertex_in_element(element: &mut Element, old: u32, new: u32) {
    let verts = match element {
        Element::Tet(v) => v.as_mut_slice(),
        Element::Pri(v) => v.as_mut_slice(),
        Element::Hex(v) => v.as_mut_slice(),
    };
    for x in verts.iter_mut() {
        if *x == old {
            *x = new;
        }
    }
}

fn shared_elements(mesh: &Mesh, v: u32, n: u32) -> Vec<u32> {
    mesh.topology.incident_elements[v as usize]
        .iter()
        .copied()
        .filter(|e| mesh.topology.incident_elements[n as usize].contains(e))
        .collect()
}

/// Position (and, for a merge, whether it is even legal) the collapsed
/// vertex `v` would take on if merged with `n`. `None` when both endpoints
/// are fixed — neither can move to satisfy the other, so the merge is
/// rejected outright.
fn merged_position(mesh: &Mesh, v: u32, n: u32) -> Option<Vec3> {
    let vv = &mesh.vertices[v as usize];
    let nn = &mesh.vertices[n as usize];
    if vv.is_fixed && nn.is_fixed {
        return None;
    }
    if vv.is_fixed {
        return Some(vv.position);
    }
    if nn.is_fixed {
        return Some(nn.position);
    }
    let midpoint = (vv.position + nn.position) * 0.5;
    if vv.is_boundary() || nn.is_boundary() {
        let c = mesh.constraints.meet(vv.constraint, nn.constraint);
        Some(mesh.constraints.project(c, midpoint))
    } else {
        Some(midpoint)
    }
}

/// Checks every element incident to `v` or `n` but *not* in `shared`
/// (which is about to be deleted) stays positive-volume if `v` and `n`
/// both moved to `new_pos`.
fn candidate_volumes_positive(mesh: &Mesh, v: u32, n: u32, new_pos: Vec3, shared: &[u32]) -> bool {
    let at = |idx: u32| -> Vec3 {
        if idx == v || idx == n {
            new_pos
        } else {
            mesh.vertices[idx as usize].position
        }
    };
    let candidate_elements = mesh.topology.incident_elements[v as usize]
        .iter()
        .chain(mesh.topology.incident_elements[n as usize].iter())
        .copied()
        .filter(|e| !shared.contains(e));
    for eid in candidate_elements {
        let element = &mesh.elements[eid as usize];
        for tet in element.global_tet_decomposition() {
            let pts = tet.map(at);
            if signed_volume6(&pts[0], &pts[1], &pts[2], &pts[3]) <= 0.0 {
                return false;
            }
        }
    }
    true
}

fn try_merge(mesh: &mut Mesh, v: u32, n: u32) -> bool {
    let Some(new_pos) = merged_position(mesh, v, n) else {
        return false;
    };
    let shared = shared_elements(mesh, v, n);
    if !candidate_volumes_positive(mesh, v, n, new_pos, &shared) {
        return false;
    }

    for &eid in &shared {
        mesh.kill_element(eid);
    }
    let exclusive_to_n: Vec<u32> = mesh.topology.incident_elements[n as usize]
        .iter()
        .copied()
        .filter(|e| !shared.contains(e))
        .collect();
    for eid in exclusive_to_n {
        replace_vertex_in_element(&mut mesh.elements[eid as usize], n, v);
    }

    let vv_fixed = mesh.vertices[v as usize].is_fixed;
    let nn_fixed = mesh.vertices[n as usize].is_fixed;
    let vv_boundary = mesh.vertices[v as usize].is_boundary();
    let nn_boundary = mesh.vertices[n as usize].is_boundary();
    let merged_constraint = if vv_boundary || nn_boundary {
        mesh.constraints.meet(mesh.vertices[v as usize].constraint, mesh.vertices[n as usize].constraint)
    } else {
        VOLUME_CONSTRAINT
    };

    let vertex = &mut mesh.vertices[v as usize];
    vertex.position = new_pos;
    vertex.constraint = merged_constraint;
    vertex.is_fixed = vv_fixed || nn_fixed;

    mesh.kill_vertex(n);
    true
}

fn try_split(mesh: &mut Mesh, v: u32, n: u32) -> bool {
    let shared = shared_elements(mesh, v, n);
    if shared.is_empty() {
        return false;
    }

    let vv = &mesh.vertices[v as usize];
    let nn = &mesh.vertices[n as usize];
    let midpoint = (vv.position + nn.position) * 0.5;
    let w_constraint: ConstraintId = if vv.is_boundary() && nn.is_boundary() {
        mesh.constraints.meet(vv.constraint, nn.constraint)
    } else {
        VOLUME_CONSTRAINT
    };
    let w_pos = if w_constraint == VOLUME_CONSTRAINT { midpoint } else { mesh.constraints.project(w_constraint, midpoint) };

    let mut new_elements = Vec::with_capacity(shared.len() * 2);
    let w = mesh.add_vertex(Vertex::constrained(w_pos, w_constraint));

    for &eid in &shared {
        let template = mesh.elements[eid as usize].clone();
        let mut half_v = template.clone();
        replace_vertex_in_element(&mut half_v, n, w);
        let mut half_n = template;
        replace_vertex_in_element(&mut half_n, v, w);
        new_elements.push(half_v);
        new_elements.push(half_n);
    }

    let positions: Vec<Vec3> = mesh.vertices.iter().map(|vx| vx.position).collect();
    for el in &new_elements {
        for tet in el.global_tet_decomposition() {
            let pts = tet.map(|i| positions[i as usize]);
            if signed_volume6(&pts[0], &pts[1], &pts[2], &pts[3]) <= 0.0 {
                mesh.kill_vertex(w);
                return false;
            }
        }
    }

    for &eid in &shared {
        mesh.kill_element(eid);
    }
    for el in new_elements {
        mesh.add_element(el);
    }
    true
}

/// One full scan over alive vertices: each is attempted at most once per
/// call (a `tried` guard), acting on its most-extreme violating edge, if
/// any. Topology is recompiled after every individual edit so the next
/// vertex in the scan sees accurate adjacency.
pub fn run_pass(mesh: &mut Mesh, sampler: &dyn MetricSampler, min_edge_length: f64, max_edge_length: f64) -> Result<bool> {
    let n = mesh.vertices.len();
    let mut tried = vec![false; n];
    let mut changed = false;
    let hint = RefTetHint::new();

    let mut v = 0usize;
    while v < n {
        if tried[v] || !mesh.vertices[v].is_alive() {
            v += 1;
            continue;
        }
        tried[v] = true;

        let neighbors = mesh.topology.adjacent_vertices[v].clone();
        let mut shortest: Option<(u32, f64)> = None;
        let mut longest: Option<(u32, f64)> = None;
        for &nb in &neighbors {
            let d = measurer::riemannian_distance(sampler, mesh.vertices[v].position, mesh.vertices[nb as usize].position, &hint);
            if d < min_edge_length && shortest.map_or(true, |(_, sd)| d < sd) {
                shortest = Some((nb, d));
            }
            if d > max_edge_length && longest.map_or(true, |(_, ld)| d > ld) {
                longest = Some((nb, d));
            }
        }

        let merge_score = shortest.map(|(_, d)| (min_edge_length - d) / min_edge_length.max(1e-12));
        let split_score = longest.map(|(_, d)| (d - max_edge_length) / max_edge_length.max(1e-12));

        let did_something = match (merge_score, split_score) {
            (Some(ms), Some(ss)) if ms >= ss => {
                let (nb, _) = shortest.unwrap();
                tried_guard(&mut tried, nb);
                try_merge(mesh, v as u32, nb)
            }
            (Some(_), Some(_)) => {
                let (nb, _) = longest.unwrap();
                try_split(mesh, v as u32, nb)
            }
            (Some(_), None) => {
                let (nb, _) = shortest.unwrap();
                tried_guard(&mut tried, nb);
                try_merge(mesh, v as u32, nb)
            }
            (None, Some(_)) => {
                let (nb, _) = longest.unwrap();
                try_split(mesh, v as u32, nb)
            }
            (None, None) => false,
        };

        if did_something {
            changed = true;
            mesh.compile_topology();
        }
        v += 1;
    }

    Ok(changed)
}

fn tried_guard(tried: &mut [bool], idx: u32) {
    if (idx as usize) < tried.len() {
        tried[idx as usize] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mat3;
    use crate::mesh::Element;
    use crate::sampler::AnalyticSampler;

    fn euclidean() -> AnalyticSampler<impl Fn(Vec3) -> Mat3> {
        AnalyticSampler::new(|_p| Mat3::identity())
    }

    #[test]
    fn long_shared_edge_splits_into_four_tets() {
        // Two tets sharing edge (0,1) of length 10.
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(10.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(5.0, 4.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(5.0, 1.0, 4.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(5.0, 1.0, -4.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.add_element(Element::Tet([1, 0, 2, 4]));
        mesh.compile_topology();

        let sampler = euclidean();
        let changed = run_pass(&mut mesh, &sampler, 0.1, 5.0).unwrap();
        assert!(changed);
        mesh.compile_topology();

        assert_eq!(mesh.alive_elements().count(), 4);
        assert_eq!(mesh.alive_vertex_count(), 6);
        assert!(mesh.check_positive_volumes().is_ok());
    }

    #[test]
    fn merging_an_edge_collapses_its_shared_elements_and_relabels_the_rest() {
        // A strip of three tets: T0=(0,1,2,3), T1=(1,2,3,4), T2=(2,3,5,4).
        // Collapsing edge (1,2) deletes T0 and T1 (shared by both
        // endpoints) and relabels T2's vertex 2 to vertex 1.
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 1.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 1.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(2.0, 2.0, 2.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(5.0, 1.0, 7.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.add_element(Element::Tet([1, 2, 3, 4]));
        mesh.add_element(Element::Tet([2, 3, 5, 4]));
        mesh.compile_topology();
        assert!(mesh.check_positive_volumes().is_ok());

        let merged = try_merge(&mut mesh, 1, 2);
        assert!(merged);
        mesh.compile_topology();

        assert_eq!(mesh.alive_elements().count(), 1);
        assert_eq!(mesh.alive_vertex_count(), 5);
        assert!(mesh.check_positive_volumes().is_ok());
        assert_eq!(mesh.vertices[1].position, Vec3::new(0.5, 0.5, 0.0));
    }
}
