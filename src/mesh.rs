//! Geometry value types and their wire codec.
//!
//! Meshes leave the bridge as a JSON array of localized meshes: the mesh
//! body (parallel vertex/UV/normal/face lists) plus a world anchor
//! (latitude, longitude, heading in degrees, 0 = north / 45 = east).
//!
//! # Axis convention
//!
//! The modeling side is Y-up; viewer clients expect Z-up / Y-forward. The
//! encoder performs the remap explicitly: a model point `(x, y, z)` goes out
//! as `(X: x, Y: z, Z: y)`. Normals are remapped the same way. The decoder
//! does **not** undo the remap — decoding reproduces the wire-level value so
//! encode → decode → encode is byte-identical.
//!
//! # Wire Format
//!
//! ```json
//! [{"Latitude":47.2,"Longitude":8.5,"Heading":45.0,
//!   "Mesh":{"Vertices":[{"X":0.0,"Y":0.0,"Z":0.0}],
//!           "Uvs":[{"X":0.0,"Y":0.0}],
//!           "Normals":[{"X":0.0,"Y":1.0,"Z":0.0}],
//!           "Faces":[{"IsQuad":false,"A":0,"B":1,"C":2,"D":3}]}}]
//! ```
//!
//! Geometry positions travel on their own channel with lower-case field
//! names (`lat`/`lon`/`hdg`) — a separate legacy contract from the mesh one.

use serde::{Deserialize, Serialize};

/// One mesh face: a triangle or a quad.
///
/// Four indices are always recorded; `d` is unused when `is_quad` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshFace {
    /// True when the face uses all four indices.
    pub is_quad: bool,
    /// First vertex index.
    pub a: i32,
    /// Second vertex index.
    pub b: i32,
    /// Third vertex index.
    pub c: i32,
    /// Fourth vertex index (unused for triangles).
    pub d: i32,
}

impl MeshFace {
    /// A triangular face. The unused fourth index mirrors the third.
    #[must_use]
    pub fn triangle(a: i32, b: i32, c: i32) -> Self {
        Self { is_quad: false, a, b, c, d: c }
    }

    /// A quad face.
    #[must_use]
    pub fn quad(a: i32, b: i32, c: i32, d: i32) -> Self {
        Self { is_quad: true, a, b, c, d }
    }
}

/// A mesh in model space (Y-up), consumed as an opaque input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertex positions, model space.
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates, parallel to `vertices`.
    pub uvs: Vec<[f32; 2]>,
    /// Vertex normals, parallel to `vertices`.
    pub normals: Vec<[f32; 3]>,
    /// Faces indexing into `vertices`.
    pub faces: Vec<MeshFace>,
}

/// A mesh paired with a world anchor.
///
/// Produced fresh from upstream geometry each evaluation pass; never
/// mutated by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalisedMesh {
    /// The mesh body.
    pub mesh: Mesh,
    /// Anchor latitude (EPSG:4326).
    pub latitude: f32,
    /// Anchor longitude (EPSG:4326).
    pub longitude: f32,
    /// Heading in degrees; 0 = north, 45 = east.
    pub heading: f32,
}

impl LocalisedMesh {
    /// Pair a mesh with a world anchor.
    ///
    /// Returns `None` when any anchor component is non-finite, matching the
    /// upstream input validation: an unanchored mesh is not shareable.
    #[must_use]
    pub fn new(mesh: Mesh, latitude: f32, longitude: f32, heading: f32) -> Option<Self> {
        (latitude.is_finite() && longitude.is_finite() && heading.is_finite()).then(|| Self {
            mesh,
            latitude,
            longitude,
            heading,
        })
    }
}

/// A geometry position entry on the position channels.
///
/// Field names are lower-case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryPosition {
    /// Latitude (EPSG:4326).
    pub lat: f32,
    /// Longitude (EPSG:4326).
    pub lon: f32,
    /// Heading in degrees; 0 = north, 45 = east.
    pub hdg: f32,
}

// ─── Wire types ─────────────────────────────────────────────────────────────

/// A 3D point or vector on the wire (client space, Z-up / Y-forward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WirePoint {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

/// A texture coordinate on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireUv {
    /// U component.
    pub x: f32,
    /// V component.
    pub y: f32,
}

/// A face on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFace {
    /// True when all four indices are used.
    pub is_quad: bool,
    /// First vertex index.
    pub a: i32,
    /// Second vertex index.
    pub b: i32,
    /// Third vertex index.
    pub c: i32,
    /// Fourth vertex index (unused for triangles).
    pub d: i32,
}

/// A mesh body on the wire: flattened parallel lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireMesh {
    /// Vertex positions, client space.
    pub vertices: Vec<WirePoint>,
    /// Texture coordinates.
    pub uvs: Vec<WireUv>,
    /// Vertex normals, client space.
    pub normals: Vec<WirePoint>,
    /// Faces.
    pub faces: Vec<WireFace>,
}

impl WireMesh {
    /// Flatten a model-space mesh into wire form, remapping Y-up to Z-up.
    #[must_use]
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let vertices = mesh
            .vertices
            .iter()
            .map(|&[x, y, z]| WirePoint { x, y: z, z: y })
            .collect();
        let uvs = mesh.uvs.iter().map(|&[x, y]| WireUv { x, y }).collect();
        let normals = mesh
            .normals
            .iter()
            .map(|&[x, y, z]| WirePoint { x, y: z, z: y })
            .collect();
        let faces = mesh
            .faces
            .iter()
            .map(|face| WireFace {
                is_quad: face.is_quad,
                a: face.a,
                b: face.b,
                c: face.c,
                d: face.d,
            })
            .collect();
        Self { vertices, uvs, normals, faces }
    }
}

/// A localized mesh on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireLocalisedMesh {
    /// Anchor latitude.
    pub latitude: f32,
    /// Anchor longitude.
    pub longitude: f32,
    /// Anchor heading in degrees.
    pub heading: f32,
    /// The mesh body.
    pub mesh: WireMesh,
}

impl WireLocalisedMesh {
    /// Convert a localized mesh into wire form.
    #[must_use]
    pub fn from_localised(localised: &LocalisedMesh) -> Self {
        Self {
            latitude: localised.latitude,
            longitude: localised.longitude,
            heading: localised.heading,
            mesh: WireMesh::from_mesh(&localised.mesh),
        }
    }
}

// ─── Codec entry points ─────────────────────────────────────────────────────

/// Encode a batch of localized meshes to its wire form.
///
/// Deterministic: identical input always yields identical bytes.
///
/// # Errors
///
/// Fails only on non-finite floats, which [`LocalisedMesh::new`] rejects.
pub fn encode_meshes(meshes: &[LocalisedMesh]) -> Result<String, serde_json::Error> {
    let wire: Vec<WireLocalisedMesh> = meshes.iter().map(WireLocalisedMesh::from_localised).collect();
    serde_json::to_string(&wire)
}

/// Decode a mesh payload back to its wire-level value.
///
/// # Errors
///
/// Fails when the payload is not a valid mesh batch.
pub fn decode_meshes(payload: &str) -> Result<Vec<WireLocalisedMesh>, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Encode a batch of geometry positions.
///
/// # Errors
///
/// Fails only on non-finite floats.
pub fn encode_positions(positions: &[GeometryPosition]) -> Result<String, serde_json::Error> {
    serde_json::to_string(positions)
}

/// Decode a geometry position payload.
///
/// # Errors
///
/// Fails when the payload is not a valid position batch.
pub fn decode_positions(payload: &str) -> Result<Vec<GeometryPosition>, serde_json::Error> {
    serde_json::from_str(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> Mesh {
        Mesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            uvs: vec![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            faces: vec![MeshFace::triangle(0, 1, 2)],
        }
    }

    #[test]
    fn test_vertex_axis_remap() {
        let wire = WireMesh::from_mesh(&sample_mesh());
        // Model (1, 2, 3) becomes client (X=1, Y=3, Z=2).
        assert_eq!(wire.vertices[1], WirePoint { x: 1.0, y: 3.0, z: 2.0 });
    }

    #[test]
    fn test_normal_axis_remap_matches_vertices() {
        let wire = WireMesh::from_mesh(&sample_mesh());
        // Model up (0, 1, 0) becomes client up (0, 0, 1).
        assert_eq!(wire.normals[0], WirePoint { x: 0.0, y: 0.0, z: 1.0 });
    }

    #[test]
    fn test_triangle_records_four_indices() {
        let face = MeshFace::triangle(0, 1, 2);
        assert!(!face.is_quad);
        assert_eq!(face.d, 2);
    }

    #[test]
    fn test_mesh_wire_shape() {
        let localised =
            LocalisedMesh::new(sample_mesh(), 47.2, 8.5, 45.0).expect("finite anchor");
        let json = encode_meshes(&[localised]).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value[0]["Latitude"], 47.2);
        assert_eq!(value[0]["Heading"], 45.0);
        assert_eq!(value[0]["Mesh"]["Faces"][0]["IsQuad"], false);
        assert_eq!(value[0]["Mesh"]["Faces"][0]["A"], 0);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let localised =
            LocalisedMesh::new(sample_mesh(), 47.2, 8.5, 45.0).expect("finite anchor");
        let encoded = encode_meshes(&[localised]).expect("encodes");
        let decoded = decode_meshes(&encoded).expect("decodes");
        let re_encoded = serde_json::to_string(&decoded).expect("re-encodes");
        assert_eq!(encoded, re_encoded);
    }

    #[test]
    fn test_non_finite_anchor_rejected() {
        assert!(LocalisedMesh::new(sample_mesh(), f32::NAN, 8.5, 0.0).is_none());
        assert!(LocalisedMesh::new(sample_mesh(), 47.2, f32::INFINITY, 0.0).is_none());
    }

    #[test]
    fn test_position_wire_fields_are_lower_case() {
        let json =
            encode_positions(&[GeometryPosition { lat: 1.0, lon: 2.0, hdg: 3.0 }]).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value[0]["lat"], 1.0);
        assert_eq!(value[0]["hdg"], 3.0);
        assert!(value[0].get("Lat").is_none());
    }
}
