//! The mesh data model: vertices, elements, the boundary constraint arena,
//! and the derived adjacency/independent-group structures a pass needs.
//!
//! Vertices and elements are tombstoned rather than removed on delete so
//! that indices stay stable across a pass; [`Mesh::compile_topology`]
//! rebuilds every derived structure from the currently-alive set and is the
//! one place that invariant restores after a batch of topology edits.

pub mod constraint;
pub mod element;
pub mod groups;

pub use constraint::{ConstraintArena, ConstraintGeometry, ConstraintId, VOLUME_CONSTRAINT};
pub use element::{Element, ElementKind, POLYHEDRON_KINDS};

use crate::error::{Error, Result};
use crate::geometry::Vec3;

/// A mesh vertex: its position, the boundary constraint it must stay on,
/// a `fixed` flag (never relocated by any smoother), and a liveness flag
/// for tombstoning.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub position: Vec3,
    pub constraint: ConstraintId,
    pub is_fixed: bool,
    alive: bool,
}

impl Vertex {
    pub fn interior(position: Vec3) -> Self {
        Self { position, constraint: VOLUME_CONSTRAINT, is_fixed: false, alive: true }
    }

    pub fn constrained(position: Vec3, constraint: ConstraintId) -> Self {
        Self { position, constraint, is_fixed: false, alive: true }
    }

    pub fn fixed(position: Vec3, constraint: ConstraintId) -> Self {
        Self { position, constraint, is_fixed: true, alive: true }
    }

    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.constraint != VOLUME_CONSTRAINT
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Derived, rebuildable per-vertex topology: everything a smoother or a
/// topology edit needs to know about a vertex's neighborhood without
/// walking the element list itself.
#[derive(Default, Clone, Debug)]
pub struct VertexTopology {
    /// Indices (into `Mesh::elements`) of the elements touching each
    /// vertex.
    pub incident_elements: Vec<Vec<u32>>,
    /// Vertices sharing an edge with each vertex.
    pub adjacent_vertices: Vec<Vec<u32>>,
    /// Independent groups (§5); disjoint, covering every alive
    /// interior-or-boundary vertex exactly once, computed from element
    /// co-incidence (every vertex pair sharing an element, not just edges —
    /// see [`crate::mesh::groups`]) so no two same-group vertices ever share
    /// an incident element, including across a hex/prism's face or body
    /// diagonals.
    pub independent_groups: Vec<Vec<u32>>,
}

/// The mesh: vertex/element storage plus the constraint arena and derived
/// topology. Owns everything a [`crate::scheduler::Scheduler`] pass reads
/// or mutates.
#[derive(Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub elements: Vec<Element>,
    element_alive: Vec<bool>,
    pub constraints: ConstraintArena,
    pub topology: VertexTopology,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            elements: Vec::new(),
            element_alive: Vec::new(),
            constraints: ConstraintArena::new(),
            topology: VertexTopology::default(),
        }
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let id = self.vertices.len() as u32;
        self.vertices.push(vertex);
        id
    }

    pub fn add_element(&mut self, element: Element) -> u32 {
        for &v in element.vertices() {
            assert!((v as usize) < self.vertices.len(), "element references unknown vertex {v}");
        }
        let id = self.elements.len() as u32;
        self.elements.push(element);
        self.element_alive.push(true);
        id
    }

    #[inline]
    pub fn is_element_alive(&self, id: u32) -> bool {
        self.element_alive[id as usize]
    }

    /// Tombstone an element. Does not touch vertex liveness or rebuild
    /// topology — callers batch edits and call [`Mesh::compile_topology`]
    /// once per pass.
    pub fn kill_element(&mut self, id: u32) {
        self.element_alive[id as usize] = false;
    }

    /// Tombstone a vertex. The caller is responsible for having removed it
    /// from every element first (see [`crate::topologist`]).
    pub fn kill_vertex(&mut self, id: u32) {
        self.vertices[id as usize].alive = false;
    }

    pub fn alive_elements(&self) -> impl Iterator<Item = (u32, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .filter(move |&(i, _)| self.element_alive[i])
            .map(|(i, e)| (i as u32, e))
    }

    pub fn alive_vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.alive).count()
    }

    /// Rebuild `incident_elements`, `adjacent_vertices`, and
    /// `independent_groups` from the currently-alive elements. Call after
    /// every batch of topology edits and once before the first smoothing
    /// pass.
    pub fn compile_topology(&mut self) {
        let n = self.vertices.len();
        let mut incident_elements: Vec<Vec<u32>> = vec![Vec::new(); n];
        let mut adjacent_sets: Vec<std::collections::BTreeSet<u32>> = vec![Default::default(); n];
        let mut coincident_sets: Vec<std::collections::BTreeSet<u32>> = vec![Default::default(); n];

        for (eid, element) in self.alive_elements() {
            for &v in element.vertices() {
                incident_elements[v as usize].push(eid);
            }
            for (a, b) in element.global_edges() {
                adjacent_sets[a as usize].insert(b);
                adjacent_sets[b as usize].insert(a);
            }
            // Every pair sharing this element must land in different
            // independent groups, not just edge-adjacent pairs: a hex/prism
            // has face- and body-diagonal vertex pairs (e.g. hex-local 0 & 6)
            // that co-occur in the element but share no edge.
            let verts = element.vertices();
            for (i, &a) in verts.iter().enumerate() {
                for &b in &verts[i + 1..] {
                    coincident_sets[a as usize].insert(b);
                    coincident_sets[b as usize].insert(a);
                }
            }
        }

        let adjacent_vertices: Vec<Vec<u32>> = adjacent_sets
            .into_iter()
            .enumerate()
            .map(|(v, set)| if self.vertices[v].alive { set.into_iter().collect() } else { Vec::new() })
            .collect();

        let coincident_vertices: Vec<Vec<u32>> = coincident_sets
            .into_iter()
            .enumerate()
            .map(|(v, set)| if self.vertices[v].alive { set.into_iter().collect() } else { Vec::new() })
            .collect();

        let independent_groups = groups::compile_independent_groups(&coincident_vertices);

        self.topology = VertexTopology { incident_elements, adjacent_vertices, independent_groups };
    }

    /// Verify every alive element has strictly positive volume under its
    /// canonical tet decomposition. Used by topology edits to reject a
    /// candidate mutation before it is committed.
    pub fn check_positive_volumes(&self) -> Result<()> {
        for (eid, element) in self.alive_elements() {
            for tet in element.global_tet_decomposition() {
                let [a, b, c, d] = tet.map(|v| self.vertices[v as usize].position);
                let vol6 = crate::geometry::signed_volume6(&a, &b, &c, &d);
                if vol6 <= 0.0 {
                    return Err(Error::NonConformal { reason: "non-positive element volume" }
                        .context(format!("element {eid}")));
                }
            }
        }
        Ok(())
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 1.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 1.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh
    }

    #[test]
    fn compile_topology_builds_full_adjacency() {
        let mut mesh = unit_tet_mesh();
        mesh.compile_topology();
        for v in 0..4 {
            assert_eq!(mesh.topology.adjacent_vertices[v].len(), 3);
            assert_eq!(mesh.topology.incident_elements[v], vec![0]);
        }
    }

    #[test]
    fn positive_volume_check_passes_for_well_formed_tet() {
        let mesh = unit_tet_mesh();
        assert!(mesh.check_positive_volumes().is_ok());
    }

    #[test]
    fn positive_volume_check_fails_for_inverted_tet() {
        let mut mesh = unit_tet_mesh();
        // Swap two vertices to invert orientation.
        mesh.vertices.swap(1, 2);
        assert!(mesh.check_positive_volumes().is_err());
    }

    #[test]
    fn killed_element_is_excluded_from_topology() {
        let mut mesh = unit_tet_mesh();
        mesh.kill_element(0);
        mesh.compile_topology();
        assert!(mesh.topology.adjacent_vertices.iter().all(|a| a.is_empty()));
    }
}
