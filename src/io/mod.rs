//! STL file I/O.
//!
//! [`stl`] loads a triangle soup and writes single solids; [`export`] turns a
//! [`GroupStore`](crate::selection::GroupStore) into one STL solid per group.
//!
//! ```no_run
//! use stlcarve::io::{export, load, ExportOptions, StlFormat};
//! use stlcarve::selection::GroupStore;
//!
//! let mesh = load("model.stl").unwrap();
//! let store = GroupStore::new(mesh.num_faces());
//! let options = ExportOptions::new("parts.stl").with_format(StlFormat::Binary);
//! export(&mesh, &store, &options).unwrap();
//! ```

pub mod export;
pub mod stl;

pub use export::{
    build_solids, export, solid_path, write_manifest, ExportOptions, ExportReport, Solid,
    SolidSummary, StlFormat,
};
pub use stl::{load, save};
