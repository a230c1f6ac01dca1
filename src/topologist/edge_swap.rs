//! Edge swap: for an interior edge `(v, n)` shared by `k ∈ {3,4,5}` tets,
//! remove the edge and re-triangulate the resulting bipyramid without it.
//! The `k` tets around the edge form a ring of `k` "rim" vertices; a fan
//! triangulation of the rim from its first vertex gives `k-2` triangles,
//! each becoming two tets (one per apex `v`/`n`) — `2(k-2)` new tets
//! replacing the original `k`. For `k=3` this is exactly the inverse of
//! the 2→3 face swap (a 3→2 flip); `k=4` and `k=5` generalize it.

use crate::error::Result;
use crate::evaluator;
use crate::geometry::{signed_volume6, Vec3};
use crate::mesh::{Element, ElementKind, Mesh};
use crate::sampler::{MetricSampler, RefTetHint};

/// Walks the tets shared by `v` and `n`, chaining each one's "rim" pair
/// (its two vertices other than `v, n`) into a single cycle. Returns the
/// owning element ids and the rim vertices in cycle order, or `None` if
/// the ring isn't a simple loop (non-manifold / boundary edge) or isn't
/// size 3–5.
fn ring(mesh: &Mesh, v: u32, n: u32) -> Option<(Vec<u32>, Vec<u32>)> {
    let shared: Vec<u32> = mesh.topology.incident_elements[v as usize]
        .iter()
        .copied()
        .filter(|e| mesh.topology.incident_elements[n as usize].contains(e))
        .filter(|&e| mesh.elements[e as usize].kind() == ElementKind::Tet)
        .collect();
    let k = shared.len();
    if !(3..=5).contains(&k) {
        return None;
    }

    let mut rim_edges: Vec<[u32; 2]> = shared
        .iter()
        .map(|&e| {
            let verts = mesh.elements[e as usize].vertices();
            let rest: Vec<u32> = verts.iter().copied().filter(|&x| x != v && x != n).collect();
            [rest[0], rest[1]]
        })
        .collect();

    let [start, mut cur] = rim_edges.remove(0);
    let mut cycle = vec![start, cur];
    while !rim_edges.is_empty() {
        let pos = rim_edges.iter().position(|&[a, b]| a == cur || b == cur)?;
        let [a, b] = rim_edges.remove(pos);
        cur = if a == cur { b } else { a };
        if rim_edges.is_empty() {
            if cur != start {
                return None;
            }
        } else {
            cycle.push(cur);
        }
    }
    Some((shared, cycle))
}

fn fan_triangles(rim: &[u32]) -> Vec<[u32; 3]> {
    (1..rim.len() - 1).map(|i| [rim[0], rim[i], rim[i + 1]]).collect()
}

fn element_positive(element: &Element, positions: &[Vec3]) -> bool {
    element.global_tet_decomposition().all(|tet| {
        let pts = tet.map(|i| positions[i as usize]);
        signed_volume6(&pts[0], &pts[1], &pts[2], &pts[3]) > 0.0
    })
}

/// Builds the two apex tets for rim triangle `(a, b, c)`, reordering each
/// independently so it comes out positive-volume. `None` if either can't.
fn apex_tets(positions: &[Vec3], apex: u32, a: u32, b: u32, c: u32) -> Option<Element> {
    let first = Element::Tet([apex, a, b, c]);
    if element_positive(&first, positions) {
        return Some(first);
    }
    let second = Element::Tet([apex, a, c, b]);
    if element_positive(&second, positions) {
        return Some(second);
    }
    None
}

/// One scan over candidate interior edges. Returns the number of swaps
/// committed.
pub fn run_pass(mesh: &mut Mesh, sampler: &dyn MetricSampler) -> Result<u32> {
    let hint = RefTetHint::new();

    let mut candidate_edges = std::collections::HashSet::new();
    for (_, element) in mesh.alive_elements() {
        if element.kind() != ElementKind::Tet {
            continue;
        }
        for (a, b) in element.global_edges() {
            candidate_edges.insert((a, b));
        }
    }

    let mut swaps = 0u32;
    for (v, n) in candidate_edges {
        if !mesh.vertices[v as usize].is_alive() || !mesh.vertices[n as usize].is_alive() {
            continue;
        }
        let Some((shared, rim)) = ring(mesh, v, n) else {
            continue;
        };
        if shared.iter().any(|&e| !mesh.is_element_alive(e)) {
            continue;
        }

        let positions: Vec<Vec3> = mesh.vertices.iter().map(|vx| vx.position).collect();

        let old_min = shared
            .iter()
            .map(|&e| evaluator::element_quality(sampler, &hint, &mesh.elements[e as usize], &positions))
            .fold(f64::INFINITY, f64::min);

        let triangles = fan_triangles(&rim);
        let mut new_tets = Vec::with_capacity(triangles.len() * 2);
        let mut degenerate = false;
        for [a, b, c] in triangles {
            match (apex_tets(&positions, v, a, b, c), apex_tets(&positions, n, a, b, c)) {
                (Some(t1), Some(t2)) => {
                    new_tets.push(t1);
                    new_tets.push(t2);
                }
                _ => {
                    degenerate = true;
                    break;
                }
            }
        }
        if degenerate {
            continue;
        }

        let new_min = new_tets
            .iter()
            .map(|c| evaluator::element_quality(sampler, &hint, c, &positions))
            .fold(f64::INFINITY, f64::min);

        if new_min > old_min {
            for &e in &shared {
                mesh.kill_element(e);
            }
            for t in new_tets {
                mesh.add_element(t);
            }
            swaps += 1;
        }
    }

    Ok(swaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mat3;
    use crate::mesh::Vertex;
    use crate::sampler::AnalyticSampler;

    #[test]
    fn three_tet_ring_around_an_edge_is_recognized_as_a_simple_loop() {
        // Edge (0,1) shared by three tets fanning around it, rim (2,3,4).
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0))); // v
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 1.0))); // n
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.5)));
        mesh.add_vertex(Vertex::interior(Vec3::new(-0.5, 0.87, 0.5)));
        mesh.add_vertex(Vertex::interior(Vec3::new(-0.5, -0.87, 0.5)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.add_element(Element::Tet([0, 1, 3, 4]));
        mesh.add_element(Element::Tet([0, 1, 4, 2]));
        mesh.compile_topology();

        let found = ring(&mesh, 0, 1);
        assert!(found.is_some());
        let (shared, rim) = found.unwrap();
        assert_eq!(shared.len(), 3);
        assert_eq!(rim.len(), 3);
    }

    #[test]
    fn run_pass_on_a_well_formed_ring_leaves_the_mesh_valid() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 1.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.5)));
        mesh.add_vertex(Vertex::interior(Vec3::new(-0.5, 0.87, 0.5)));
        mesh.add_vertex(Vertex::interior(Vec3::new(-0.5, -0.87, 0.5)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.add_element(Element::Tet([0, 1, 3, 4]));
        mesh.add_element(Element::Tet([0, 1, 4, 2]));
        mesh.compile_topology();
        assert!(mesh.check_positive_volumes().is_ok());

        let sampler = AnalyticSampler::new(|_p| Mat3::identity());
        run_pass(&mut mesh, &sampler).unwrap();
        mesh.compile_topology();
        assert!(mesh.check_positive_volumes().is_ok());
    }
}
