//! Selection algorithms.
//!
//! - **Adjacency**: welded edge-sharing face adjacency and face normals
//! - **Region growing**: seed-relative normal-cone flood fill
//! - **Rule selection**: faces by normal direction or centroid bounding box

pub mod adjacency;
pub mod grow;
pub mod select;

pub use adjacency::{
    face_normal, weld_vertices, AdjacencyIndex, AdjacencyOptions, DEFAULT_WELD_TOLERANCE,
};
pub use grow::{grow, grow_with_options, GrowOptions};
pub use select::{select_by_bbox, select_by_normal, DEFAULT_NORMAL_TOLERANCE};
