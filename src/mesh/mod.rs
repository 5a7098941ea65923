//! Core mesh data structures.
//!
//! The primary type is [`TriangleMesh`], an indexed triangle mesh that stays
//! immutable for the whole selection session. Faces are identified by a dense
//! [`FaceId`] in `0..num_faces()`, and that index space never changes.
//!
//! # Construction
//!
//! Meshes are typically constructed from file I/O or from face-vertex lists:
//!
//! ```
//! use stlcarve::mesh::build_from_triangles;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert!((mesh.surface_area() - 0.5).abs() < 1e-12);
//! ```

mod builder;
mod index;
mod triangle;

pub use builder::{build_from_soup, build_from_triangles, to_soup};
pub use index::{FaceId, GroupId, VertexId};
pub use triangle::TriangleMesh;
