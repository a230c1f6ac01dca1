//! Boundary constraint lattice, re-architected per the design note in §9:
//! instead of cyclic `Mesh ↔ VertexConstraint ↔ EdgeConstraint ↔
//! FaceConstraint` references, every constraint lives in a flat arena and
//! vertices hold a [`ConstraintId`] index into it.
//!
//! The lattice has `VolumeConstraint` (free interior, the arena's id 0) at
//! the top, `FaceConstraint`s and `EdgeConstraint`s in the middle, and
//! `VertexConstraint`s at the bottom. `meet` implements both of the spec's
//! named lattice operations — "split" (new vertex inserted on an edge takes
//! the meet of its endpoints' constraints) and "merge" (a collapsed vertex
//! takes the meet of the two endpoints' constraints) collapse to the same
//! pure function on this lattice.

use crate::geometry::Vec3;

/// Index into a [`ConstraintArena`]. Id `0` is always the free
/// [`ConstraintGeometry::Volume`] constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

/// The always-present identity constraint (interior, unconstrained).
pub const VOLUME_CONSTRAINT: ConstraintId = ConstraintId(0);

/// The projector geometry a constraint node carries.
#[derive(Clone, Debug)]
pub enum ConstraintGeometry {
    /// Free interior; `project` is the identity.
    Volume,
    /// A 2-D surface patch, approximated locally by its plane.
    Face { point: Vec3, normal: Vec3 },
    /// A 1-D curve, approximated locally by a line through `origin`.
    Edge { origin: Vec3, direction: Vec3 },
    /// A fixed 0-D point.
    Vertex { point: Vec3 },
    /// Opaque external constraint (e.g. a loaded mesh names a boundary id
    /// with no local geometry available). Projects as identity but is
    /// still boundary-flagged; finer than `Volume`, coarser than anything
    /// with real geometry in `meet`.
    External,
}

#[derive(Clone)]
struct ConstraintNode {
    geometry: ConstraintGeometry,
    /// Constraints one dimension finer that bound this one (a face's
    /// bounding edges, an edge's bounding vertices). Empty for `Vertex`.
    children: Vec<ConstraintId>,
}

/// Arena owning every constraint node referenced by a [`crate::mesh::Mesh`].
#[derive(Clone)]
pub struct ConstraintArena {
    nodes: Vec<ConstraintNode>,
}

impl Default for ConstraintArena {
    fn default() -> Self {
        Self {
            nodes: vec![ConstraintNode {
                geometry: ConstraintGeometry::Volume,
                children: Vec::new(),
            }],
        }
    }
}

impl ConstraintArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(&self, id: ConstraintId) -> &ConstraintGeometry {
        &self.nodes[id.0 as usize].geometry
    }

    pub fn add_face(&mut self, point: Vec3, normal: Vec3) -> ConstraintId {
        self.push(ConstraintGeometry::Face { point, normal: normal.normalize() }, Vec::new())
    }

    pub fn add_edge(&mut self, origin: Vec3, direction: Vec3, bounding_faces: &[ConstraintId]) -> ConstraintId {
        let id = self.push(
            ConstraintGeometry::Edge { origin, direction: direction.normalize() },
            Vec::new(),
        );
        for &f in bounding_faces {
            self.nodes[f.0 as usize].children.push(id);
        }
        id
    }

    pub fn add_vertex_constraint(&mut self, point: Vec3, bounding_edges: &[ConstraintId]) -> ConstraintId {
        let id = self.push(ConstraintGeometry::Vertex { point }, Vec::new());
        for &e in bounding_edges {
            self.nodes[e.0 as usize].children.push(id);
        }
        id
    }

    pub fn add_external(&mut self) -> ConstraintId {
        self.push(ConstraintGeometry::External, Vec::new())
    }

    fn push(&mut self, geometry: ConstraintGeometry, children: Vec<ConstraintId>) -> ConstraintId {
        let id = ConstraintId(self.nodes.len() as u32);
        self.nodes.push(ConstraintNode { geometry, children });
        id
    }

    #[inline]
    fn dimension(&self, id: ConstraintId) -> u8 {
        match self.geometry(id) {
            ConstraintGeometry::Volume => 3,
            ConstraintGeometry::External => 2,
            ConstraintGeometry::Face { .. } => 2,
            ConstraintGeometry::Edge { .. } => 1,
            ConstraintGeometry::Vertex { .. } => 0,
        }
    }

    /// Breadth-first reachability through `children`, used to test whether
    /// `descendant` bounds `ancestor` (directly or transitively).
    fn is_descendant(&self, ancestor: ConstraintId, descendant: ConstraintId) -> bool {
        if ancestor == descendant {
            return true;
        }
        let mut stack = vec![ancestor];
        let mut seen = std::collections::HashSet::new();
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            for &child in &self.nodes[cur.0 as usize].children {
                if child == descendant {
                    return true;
                }
                stack.push(child);
            }
        }
        false
    }

    /// Project a point through the constraint's geometry.
    pub fn project(&self, id: ConstraintId, p: Vec3) -> Vec3 {
        match self.geometry(id) {
            ConstraintGeometry::Volume | ConstraintGeometry::External => p,
            ConstraintGeometry::Vertex { point } => *point,
            ConstraintGeometry::Edge { origin, direction } => {
                origin + direction * (p - origin).dot(direction)
            }
            ConstraintGeometry::Face { point, normal } => p - normal * (p - point).dot(normal),
        }
    }

    /// The lattice meet of two constraints: the most-specific (smallest
    /// dimension) constraint consistent with both. Covers both the spec's
    /// "split" use (new vertex on an edge between `a`-constrained and
    /// `b`-constrained endpoints) and "merge" use (collapsed vertex takes
    /// the combination of the two endpoints it replaces).
    pub fn meet(&self, a: ConstraintId, b: ConstraintId) -> ConstraintId {
        if a == b {
            return a;
        }
        if a == VOLUME_CONSTRAINT {
            return b;
        }
        if b == VOLUME_CONSTRAINT {
            return a;
        }

        let (da, db) = (self.dimension(a), self.dimension(b));
        if da == db {
            // Same-dimension siblings: the intersection is their shared
            // child one dimension finer (e.g. two adjacent faces share an
            // edge; two edges meeting at a vertex share that vertex).
            let children_a: std::collections::HashSet<_> =
                self.nodes[a.0 as usize].children.iter().copied().collect();
            for &c in &self.nodes[b.0 as usize].children {
                if children_a.contains(&c) {
                    return c;
                }
            }
            // No shared refinement on record — fall back to the
            // lower-indexed of the two rather than losing the constraint
            // entirely (conservative: at least stays on *a* boundary).
            a.min(b)
        } else {
            let (finer, coarser) = if da < db { (a, b) } else { (b, a) };
            if self.is_descendant(coarser, finer) {
                finer
            } else {
                // Unrelated geometry at different dimensions: keep the
                // finer (more restrictive) one regardless.
                finer
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meet_of_volume_and_anything_is_the_other() {
        let mut arena = ConstraintArena::new();
        let face = arena.add_face(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(arena.meet(VOLUME_CONSTRAINT, face), face);
        assert_eq!(arena.meet(face, VOLUME_CONSTRAINT), face);
    }

    #[test]
    fn meet_of_two_adjacent_faces_is_their_shared_edge() {
        let mut arena = ConstraintArena::new();
        let face_a = arena.add_face(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let face_b = arena.add_face(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        let shared_edge = arena.add_edge(
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, 1.0),
            &[face_a, face_b],
        );
        assert_eq!(arena.meet(face_a, face_b), shared_edge);
    }

    #[test]
    fn meet_of_edge_and_vertex_on_it_is_the_vertex() {
        let mut arena = ConstraintArena::new();
        let edge = arena.add_edge(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), &[]);
        let vertex = arena.add_vertex_constraint(Vec3::new(0.0, 0.0, 1.0), &[edge]);
        assert_eq!(arena.meet(edge, vertex), vertex);
        assert_eq!(arena.meet(vertex, edge), vertex);
    }

    #[test]
    fn face_projection_drops_the_normal_component() {
        let mut arena = ConstraintArena::new();
        let face = arena.add_face(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0));
        let projected = arena.project(face, Vec3::new(1.0, 2.0, 5.0));
        assert!((projected - Vec3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
    }
}
