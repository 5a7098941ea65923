//! Mesh construction utilities.
//!
//! This module builds [`TriangleMesh`] values from face-vertex lists and from
//! triangle soups as they come out of STL files.

use nalgebra::Point3;

use super::triangle::TriangleMesh;
use crate::error::{CarveError, Result};

/// Build a mesh from vertices and triangle faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// Faces with repeated or zero-area corners are accepted here; they are
/// flagged later when normals are computed.
///
/// # Example
/// ```
/// use stlcarve::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<TriangleMesh> {
    if faces.is_empty() {
        return Err(CarveError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(CarveError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
    }

    Ok(TriangleMesh {
        vertices: vertices.to_vec(),
        faces: faces.to_vec(),
    })
}

/// Build a mesh from a triangle soup, one vertex per corner.
///
/// No vertices are shared; adjacency is recovered later by welding
/// coincident positions.
pub fn build_from_soup(triangles: &[[Point3<f64>; 3]]) -> Result<TriangleMesh> {
    if triangles.is_empty() {
        return Err(CarveError::EmptyMesh);
    }

    let vertices: Vec<Point3<f64>> = triangles.iter().flat_map(|t| t.iter().copied()).collect();
    let faces: Vec<[usize; 3]> = (0..triangles.len())
        .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
        .collect();

    Ok(TriangleMesh { vertices, faces })
}

/// Convert a mesh back to a triangle soup, one entry per face.
pub fn to_soup(mesh: &TriangleMesh) -> Vec<[Point3<f64>; 3]> {
    mesh.face_ids().map(|f| mesh.face_positions(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        // Two triangles sharing an edge
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_soup_roundtrip() {
        let (vertices, faces) = two_triangles();
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        let soup = to_soup(&mesh);
        let rebuilt = build_from_soup(&soup).unwrap();

        assert_eq!(rebuilt.num_faces(), 2);
        assert_eq!(rebuilt.num_vertices(), 6);
        assert_eq!(to_soup(&rebuilt), soup);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let faces = vec![[0, 1, 2]]; // Indices 1 and 2 are invalid

        let result = build_from_triangles(&vertices, &faces);
        assert!(matches!(
            result,
            Err(CarveError::InvalidVertexIndex { face: 0, vertex: 1 })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(build_from_triangles(&[], &[]), Err(CarveError::EmptyMesh)));
        assert!(matches!(build_from_soup(&[]), Err(CarveError::EmptyMesh)));
    }
}
