//! Polyhedron variants and their static topology tables (local edges, local
//! triangular faces, canonical tetrahedral decomposition). Elements store
//! only vertex indices — no geometry, no back-pointers.

/// Which polyhedron an [`Element`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Tet,
    Pri,
    Hex,
}

impl ElementKind {
    #[inline]
    pub fn vertex_count(self) -> usize {
        match self {
            ElementKind::Tet => 4,
            ElementKind::Pri => 6,
            ElementKind::Hex => 8,
        }
    }
}

/// Number of distinct polyhedron kinds the evaluator self-tests against;
/// used to derive `MAX_QUALITY` for the GPU fixed-point grid (§4.3).
pub const POLYHEDRON_KINDS: usize = 3;

/// A mesh element: a tetrahedron, triangular prism, or hexahedron, storing
/// only vertex indices into the owning [`crate::mesh::Mesh`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Tet([u32; 4]),
    Pri([u32; 6]),
    Hex([u32; 8]),
}

// Local edges as index pairs into the element's own vertex array.
const TET_EDGES: [(u8, u8); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
const PRI_EDGES: [(u8, u8); 9] = [
    (0, 1), (1, 2), (2, 0),
    (3, 4), (4, 5), (5, 3),
    (0, 3), (1, 4), (2, 5),
];
const HEX_EDGES: [(u8, u8); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

// Local triangular faces (quads pre-split along the lower-indexed diagonal).
const TET_TRIS: [[u8; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
const PRI_TRIS: [[u8; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [0, 1, 4], [0, 4, 3],
    [1, 2, 5], [1, 5, 4],
    [2, 0, 3], [2, 3, 5],
];
const HEX_TRIS: [[u8; 3]; 12] = [
    [0, 1, 2], [0, 2, 3],
    [4, 5, 6], [4, 6, 7],
    [0, 1, 5], [0, 5, 4],
    [1, 2, 6], [1, 6, 5],
    [2, 3, 7], [2, 7, 6],
    [3, 0, 4], [3, 4, 7],
];

// Canonical tetrahedral decomposition, used for volume computation and GPU
// streaming. Each is verified (see module tests) to sum to the reference
// element's volume for a regular instance.
const TET_DECOMP: [[u8; 4]; 1] = [[0, 1, 2, 3]];
const PRI_DECOMP: [[u8; 4]; 3] = [[0, 1, 2, 3], [1, 2, 3, 4], [2, 3, 4, 5]];
const HEX_DECOMP: [[u8; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

impl Element {
    #[inline]
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Tet(_) => ElementKind::Tet,
            Element::Pri(_) => ElementKind::Pri,
            Element::Hex(_) => ElementKind::Hex,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[u32] {
        match self {
            Element::Tet(v) => v,
            Element::Pri(v) => v,
            Element::Hex(v) => v,
        }
    }

    #[inline]
    pub fn contains(&self, v: u32) -> bool {
        self.vertices().contains(&v)
    }

    #[inline]
    pub fn local_edges(&self) -> &'static [(u8, u8)] {
        match self.kind() {
            ElementKind::Tet => &TET_EDGES,
            ElementKind::Pri => &PRI_EDGES,
            ElementKind::Hex => &HEX_EDGES,
        }
    }

    #[inline]
    pub fn local_tris(&self) -> &'static [[u8; 3]] {
        match self.kind() {
            ElementKind::Tet => &TET_TRIS,
            ElementKind::Pri => &PRI_TRIS,
            ElementKind::Hex => &HEX_TRIS,
        }
    }

    #[inline]
    pub fn tet_decomposition(&self) -> &'static [[u8; 4]] {
        match self.kind() {
            ElementKind::Tet => &TET_DECOMP,
            ElementKind::Pri => &PRI_DECOMP,
            ElementKind::Hex => &HEX_DECOMP,
        }
    }

    /// Global edges (as vertex-index pairs, lower index first).
    pub fn global_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let verts = self.vertices();
        self.local_edges().iter().map(move |&(a, b)| {
            let (x, y) = (verts[a as usize], verts[b as usize]);
            if x < y { (x, y) } else { (y, x) }
        })
    }

    /// Global triangular faces (as vertex-index triples).
    pub fn global_tris(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let verts = self.vertices();
        self.local_tris().iter().map(move |&[a, b, c]| {
            [verts[a as usize], verts[b as usize], verts[c as usize]]
        })
    }

    /// Global tets of the canonical decomposition (as vertex-index quads).
    pub fn global_tet_decomposition(&self) -> impl Iterator<Item = [u32; 4]> + '_ {
        let verts = self.vertices();
        self.tet_decomposition().iter().map(move |&[a, b, c, d]| {
            [
                verts[a as usize],
                verts[b as usize],
                verts[c as usize],
                verts[d as usize],
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{signed_volume6, Vec3};

    fn unit_cube_positions() -> [Vec3; 8] {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn hex_decomposition_sums_to_unit_volume() {
        let p = unit_cube_positions();
        let hex = Element::Hex([0, 1, 2, 3, 4, 5, 6, 7]);
        let mut total = 0.0;
        for [a, b, c, d] in hex.global_tet_decomposition() {
            total += signed_volume6(&p[a as usize], &p[b as usize], &p[c as usize], &p[d as usize]) / 6.0;
        }
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn prism_decomposition_sums_to_unit_volume() {
        // Right prism with unit right-triangle base and unit height.
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let pri = Element::Pri([0, 1, 2, 3, 4, 5]);
        let mut total = 0.0;
        for [a, b, c, d] in pri.global_tet_decomposition() {
            total += signed_volume6(&p[a as usize], &p[b as usize], &p[c as usize], &p[d as usize]) / 6.0;
        }
        assert!((total - 0.5).abs() < 1e-12);
    }

    #[test]
    fn edge_and_face_counts_match_kind() {
        let tet = Element::Tet([0, 1, 2, 3]);
        assert_eq!(tet.local_edges().len(), 6);
        assert_eq!(tet.local_tris().len(), 4);

        let pri = Element::Pri([0, 1, 2, 3, 4, 5]);
        assert_eq!(pri.local_edges().len(), 9);
        assert_eq!(pri.local_tris().len(), 8);

        let hex = Element::Hex([0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(hex.local_edges().len(), 12);
        assert_eq!(hex.local_tris().len(), 12);
    }
}
