//! # stlcarve
//!
//! Partition the faces of an STL mesh into named groups and export each group
//! as its own STL solid.
//!
//! Faces are picked one at a time or collected by region growing: a
//! breadth-first flood fill over edge-sharing faces that keeps every face whose
//! normal stays within an angle of the seed face's normal. Groups never share
//! faces, and the mesh itself is never modified; export writes the original
//! vertex data back out, one solid per group.
//!
//! ## Features
//!
//! - **Welded adjacency**: edge-sharing neighbours of a triangle soup, with
//!   coincident vertices merged through a hash grid
//! - **Region growing**: seed-relative normal-cone flood fill
//! - **Group store**: forward and inverse membership indices kept in step
//! - **Session controller**: navigate / select / region-grow modes with a
//!   recolor callback for a viewer
//! - **STL export**: ASCII multi-solid files or per-solid binary files
//!
//! ## Quick Start
//!
//! ```no_run
//! use stlcarve::prelude::*;
//! use stlcarve::io::{self, ExportOptions};
//!
//! let mesh = io::load("part.stl").unwrap();
//! let adjacency = AdjacencyIndex::build(&mesh);
//!
//! let mut session = SelectionController::new(&adjacency).with_tolerance(20.0);
//! session.set_mode(Mode::RegionGrow);
//! session.handle_pick(FaceId::new(0)).unwrap();
//! session.new_group();
//! session.handle_pick(FaceId::new(42)).unwrap();
//!
//! let options = ExportOptions::new("patches.stl");
//! io::export(&mesh, session.store(), &options).unwrap();
//! ```
//!
//! ## Region Growing
//!
//! ```
//! use stlcarve::prelude::*;
//! use nalgebra::Point3;
//!
//! // Two triangles of a flat square and one folded up by 90 degrees
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 1.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3], [1, 4, 2]];
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! let adjacency = AdjacencyIndex::build(&mesh);
//!
//! let flat = grow(&adjacency, FaceId::new(0), 10.0).unwrap();
//! assert_eq!(flat.len(), 2);
//!
//! let all = grow(&adjacency, FaceId::new(0), 90.0).unwrap();
//! assert_eq!(all.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod error;
pub mod io;
pub mod mesh;
pub mod selection;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use stlcarve::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{grow, AdjacencyIndex, GrowOptions};
    pub use crate::error::{CarveError, Result};
    pub use crate::mesh::{build_from_soup, build_from_triangles, FaceId, GroupId, TriangleMesh, VertexId};
    pub use crate::selection::{Color, GroupStore, Mode, PickOutcome, SelectionController, Toggle};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
