//! Indexed triangle mesh.
//!
//! The mesh is a shared vertex array plus one `[v0, v1, v2]` index triple per
//! face. Face order and vertex positions are kept exactly as loaded: selection
//! only ever labels faces, it never changes the geometry.

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, VertexId};

/// An immutable triangle mesh.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub(crate) vertices: Vec<Point3<f64>>,
    pub(crate) faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Check whether `f` is a face of this mesh.
    #[inline]
    pub fn contains_face(&self, f: FaceId) -> bool {
        f.index() < self.faces.len()
    }

    /// All vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// All faces as vertex index triples.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertices[v.index()]
    }

    /// Iterate over all face ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Vertex ids of a face, in winding order.
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        let [a, b, c] = self.faces[f.index()];
        [VertexId::new(a), VertexId::new(b), VertexId::new(c)]
    }

    /// Get the positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[f.index()];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Unnormalized face normal (cross product of the two edges leaving `v0`).
    ///
    /// Its length is twice the face area.
    pub fn face_cross(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        0.5 * self.face_cross(f).norm()
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Enclosed volume, from the divergence theorem.
    ///
    /// Only meaningful for closed, consistently oriented meshes. The absolute
    /// value is returned so inward-facing windings still report a positive
    /// volume.
    pub fn volume(&self) -> f64 {
        let signed: f64 = self
            .face_ids()
            .map(|f| {
                let [p0, p1, p2] = self.face_positions(f);
                p0.coords.dot(&p1.coords.cross(&p2.coords))
            })
            .sum();
        (signed / 6.0).abs()
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;

        let mut min = *first;
        let mut max = *first;

        for p in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }
}
