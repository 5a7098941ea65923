//! Face groups and the interactive selection session.
//!
//! A session is a [`SelectionController`] driving a [`GroupStore`]:
//!
//! ```
//! use stlcarve::prelude::*;
//! use stlcarve::selection::{Mode, SelectionController};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//! let adjacency = AdjacencyIndex::build(&mesh);
//!
//! let mut session = SelectionController::new(&adjacency);
//! session.set_mode(Mode::RegionGrow);
//! session.handle_pick(FaceId::new(0)).unwrap();
//! assert_eq!(session.store().total_selected_count(), 2);
//! ```

mod color;
mod command;
mod controller;
mod store;

pub use color::{Color, DEFAULT_MESH_COLOR, DEFAULT_PALETTE};
pub use command::{parse_script, Command};
pub use controller::{
    CommandOutcome, Mode, PickOutcome, Recolor, RecolorHook, SelectionController,
    DEFAULT_ANGLE_TOLERANCE,
};
pub use store::{Group, GroupStore, Toggle};
