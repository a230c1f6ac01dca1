//! Mesh document (de)serialization (§6) and config-file loading. The
//! persisted format is a flat JSON document, matching the teacher's
//! serde/serde_json pairing elsewhere in the stack.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Vec3;
use crate::mesh::{ConstraintId, Element, Mesh, Vertex, VOLUME_CONSTRAINT};

/// Per-vertex topology flags as persisted (`topos` array, §6). `boundary_id`
/// indexes into the document's `boundary` block's named constraints, if
/// present; `None` means volume-interior even if `is_boundary` is somehow
/// set (treated as a loader warning, not an error).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VertexTopo {
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub is_boundary: bool,
    #[serde(default)]
    pub boundary_id: Option<u32>,
}

/// A named constraint primitive a document's `boundary` block can describe.
/// Each names a closed-form projector; loaded constraints compose into the
/// arena via [`crate::mesh::ConstraintArena::add_face`] etc., using the
/// primitive's local tangent plane/line at the vertex it governs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BoundaryModel {
    /// Axis-aligned box; a vertex on a face snaps to that face's plane.
    Box { min: [f64; 3], max: [f64; 3] },
    /// A single bounding tetrahedron; vertices snap to the nearest face
    /// plane of the four.
    Tet { verts: [[f64; 3]; 4] },
    /// A sphere; vertices snap radially onto `radius` about `center`.
    Sphere { center: [f64; 3], radius: f64 },
    /// No local geometry available (e.g. provenance-only boundary ids from
    /// an external mesher) — boundary-flagged but projects as identity.
    External,
}

/// The structured mesh document persisted to / loaded from disk (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshDocument {
    pub verts: Vec<[f64; 3]>,
    #[serde(default)]
    pub tets: Vec<[u32; 4]>,
    #[serde(default)]
    pub pris: Vec<[u32; 6]>,
    #[serde(default)]
    pub hexs: Vec<[u32; 8]>,
    #[serde(default)]
    pub topos: Option<Vec<VertexTopo>>,
    #[serde(default)]
    pub boundary: Option<BoundaryModel>,
}

/// Magic bytes of the legacy mesher's binary carry-forward format
/// (`MSHB` + a provenance suffix). Recognized on load only so a clear
/// error can be raised — this port never parses the binary payload itself.
const LEGACY_BINARY_MAGIC: &[u8; 4] = b"MSHB";

/// Projects a boundary vertex's nearest-face constraint out of a box model.
fn box_face_constraint(min: [f64; 3], max: [f64; 3], p: Vec3, arena: &mut crate::mesh::ConstraintArena) -> ConstraintId {
    let faces: [(Vec3, Vec3); 6] = [
        (Vec3::new(min[0], 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        (Vec3::new(max[0], 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::new(0.0, min[1], 0.0), Vec3::new(0.0, -1.0, 0.0)),
        (Vec3::new(0.0, max[1], 0.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 0.0, min[2]), Vec3::new(0.0, 0.0, -1.0)),
        (Vec3::new(0.0, 0.0, max[2]), Vec3::new(0.0, 0.0, 1.0)),
    ];
    let (point, normal) = faces
        .iter()
        .min_by(|a, b| {
            let da = (p - a.0).dot(&a.1).abs();
            let db = (p - b.0).dot(&b.1).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
        .unwrap();
    arena.add_face(point, normal)
}

fn tet_face_constraint(verts: &[[f64; 3]; 4], p: Vec3, arena: &mut crate::mesh::ConstraintArena) -> ConstraintId {
    let v: Vec<Vec3> = verts.iter().map(|&c| Vec3::new(c[0], c[1], c[2])).collect();
    let faces: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    let (a, b, c) = *faces
        .iter()
        .min_by(|&&(a, b, c), &&(d, e, f)| {
            let n1 = (v[b] - v[a]).cross(&(v[c] - v[a])).normalize();
            let n2 = (v[e] - v[d]).cross(&(v[f] - v[d])).normalize();
            let d1 = (p - v[a]).dot(&n1).abs();
            let d2 = (p - v[d]).dot(&n2).abs();
            d1.partial_cmp(&d2).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap();
    let normal = (v[b] - v[a]).cross(&(v[c] - v[a])).normalize();
    arena.add_face(v[a], normal)
}

fn sphere_constraint(center: [f64; 3], radius: f64, p: Vec3, arena: &mut crate::mesh::ConstraintArena) -> ConstraintId {
    let c = Vec3::new(center[0], center[1], center[2]);
    let normal = (p - c).normalize();
    arena.add_face(c + normal * radius, normal)
}

impl TryFrom<MeshDocument> for Mesh {
    type Error = Error;

    fn try_from(doc: MeshDocument) -> Result<Mesh> {
        let mut mesh = Mesh::new();

        let topos = doc.topos.clone();
        for (i, v) in doc.verts.iter().enumerate() {
            let position = Vec3::new(v[0], v[1], v[2]);
            let topo = topos.as_ref().and_then(|t| t.get(i)).copied();
            let constraint = match (&topo, &doc.boundary) {
                (Some(t), Some(model)) if t.is_boundary => match model {
                    BoundaryModel::Box { min, max } => box_face_constraint(*min, *max, position, &mut mesh.constraints),
                    BoundaryModel::Tet { verts } => tet_face_constraint(verts, position, &mut mesh.constraints),
                    BoundaryModel::Sphere { center, radius } => sphere_constraint(*center, *radius, position, &mut mesh.constraints),
                    BoundaryModel::External => mesh.constraints.add_external(),
                },
                _ => VOLUME_CONSTRAINT,
            };
            let is_fixed = topo.map(|t| t.is_fixed).unwrap_or(false);
            let vertex = if is_fixed { Vertex::fixed(position, constraint) } else { Vertex::constrained(position, constraint) };
            mesh.add_vertex(vertex);
        }

        for t in &doc.tets {
            mesh.add_element(Element::Tet(*t));
        }
        for p in &doc.pris {
            mesh.add_element(Element::Pri(*p));
        }
        for h in &doc.hexs {
            mesh.add_element(Element::Hex(*h));
        }

        mesh.compile_topology();
        Ok(mesh)
    }
}

impl From<&Mesh> for MeshDocument {
    fn from(mesh: &Mesh) -> Self {
        let verts = mesh.vertices.iter().map(|v| [v.position.x, v.position.y, v.position.z]).collect();
        let topos = Some(
            mesh.vertices
                .iter()
                .map(|v| VertexTopo { is_fixed: v.is_fixed, is_boundary: v.is_boundary(), boundary_id: None })
                .collect(),
        );

        let mut tets = Vec::new();
        let mut pris = Vec::new();
        let mut hexs = Vec::new();
        for (_, element) in mesh.alive_elements() {
            match element {
                Element::Tet(v) => tets.push(*v),
                Element::Pri(v) => pris.push(*v),
                Element::Hex(v) => hexs.push(*v),
            }
        }

        MeshDocument { verts, tets, pris, hexs, topos, boundary: None }
    }
}

/// Loads a mesh document from a JSON byte buffer, rejecting the legacy
/// binary format with a clear message rather than attempting to parse it.
pub fn load_mesh_document(bytes: &[u8]) -> Result<MeshDocument> {
    if bytes.len() >= 4 && &bytes[0..4] == LEGACY_BINARY_MAGIC {
        return Err(Error::custom(
            "legacy binary mesh format (MSHB) is recognized but not supported by this loader; re-export as JSON",
        ));
    }
    let doc: MeshDocument = serde_json::from_slice(bytes)?;
    Ok(doc)
}

/// Loads and parses a JSON config file (engine + schedule settings).
pub fn load_config_file<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let value: T = serde_json::from_slice(&bytes)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_tet_mesh_through_the_document_format() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(1.0, 0.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 1.0, 0.0)));
        mesh.add_vertex(Vertex::interior(Vec3::new(0.0, 0.0, 1.0)));
        mesh.add_element(Element::Tet([0, 1, 2, 3]));
        mesh.compile_topology();

        let doc = MeshDocument::from(&mesh);
        let json = serde_json::to_vec(&doc).unwrap();
        let parsed = load_mesh_document(&json).unwrap();
        let rebuilt: Mesh = parsed.try_into().unwrap();

        assert_eq!(rebuilt.vertices.len(), 4);
        assert_eq!(rebuilt.alive_elements().count(), 1);
        assert_eq!(rebuilt.vertices[1].position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn legacy_binary_magic_is_rejected_with_a_clear_error() {
        let mut bytes = LEGACY_BINARY_MAGIC.to_vec();
        bytes.extend_from_slice(b"TGRID-9.1\x00\x00garbage");
        let err = load_mesh_document(&bytes).unwrap_err();
        assert!(matches!(err, Error::Custom(_)));
    }

    #[test]
    fn box_boundary_model_snaps_constraint_to_nearest_face() {
        let doc = MeshDocument {
            verts: vec![[0.0, 0.5, 0.5], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0]],
            tets: vec![[0, 1, 2, 3]],
            pris: vec![],
            hexs: vec![],
            topos: Some(vec![
                VertexTopo { is_fixed: false, is_boundary: true, boundary_id: Some(0) },
                VertexTopo { is_fixed: true, is_boundary: true, boundary_id: Some(0) },
                VertexTopo { is_fixed: true, is_boundary: true, boundary_id: Some(0) },
                VertexTopo { is_fixed: true, is_boundary: true, boundary_id: Some(0) },
            ]),
            boundary: Some(BoundaryModel::Box { min: [0.0, 0.0, 0.0], max: [1.0, 1.0, 1.0] }),
        };
        let mesh: Mesh = doc.try_into().unwrap();
        assert!(mesh.vertices[0].is_boundary());
        let projected = mesh.constraints.project(mesh.vertices[0].constraint, Vec3::new(5.0, 0.5, 0.5));
        assert!((projected.x - 0.0).abs() < 1e-9);
    }
}
