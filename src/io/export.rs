//! Export of selection groups as STL solids.
//!
//! Each non-empty group becomes one solid named `<group_prefix>_<id>`
//! (`group_0`, `group_1`, ...). Unless only selected faces are requested, the
//! faces in no group follow as one more solid, `unassigned` by default, so
//! every input face lands in exactly one solid. Vertex data is written as
//! loaded; nothing is moved, merged, or re-triangulated.
//!
//! # Example
//!
//! ```no_run
//! use stlcarve::io::export::{export, ExportOptions};
//! use stlcarve::io::stl;
//! use stlcarve::selection::GroupStore;
//!
//! let mesh = stl::load("part.stl").unwrap();
//! let store = GroupStore::new(mesh.num_faces());
//! // ... select faces ...
//! let report = export(&mesh, &store, &ExportOptions::new("patches.stl")).unwrap();
//! println!("wrote {} solids", report.solids.len());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::stl::{write_ascii_solid, write_binary};
use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, GroupId, TriangleMesh};
use crate::selection::GroupStore;

/// STL flavour to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlFormat {
    /// Text STL; several solids fit in one file.
    #[default]
    Ascii,
    /// Binary STL; one solid per file.
    Binary,
}

impl FromStr for StlFormat {
    type Err = CarveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "text" => Ok(StlFormat::Ascii),
            "binary" | "bin" => Ok(StlFormat::Binary),
            _ => Err(CarveError::UnsupportedFormat {
                extension: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StlFormat::Ascii => write!(f, "ascii"),
            StlFormat::Binary => write!(f, "binary"),
        }
    }
}

/// Options for [`export`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Drop faces that belong to no group instead of emitting them as an
    /// extra solid.
    pub only_selected: bool,

    /// Output file. With per-solid files this names the stem they share.
    pub output_path: PathBuf,

    /// STL flavour.
    pub format: StlFormat,

    /// Write each solid to its own `<stem>_<solid>.stl` file.
    /// Binary output with more than one solid always does this.
    pub split_files: bool,

    /// Solid name prefix for groups.
    pub group_prefix: String,

    /// Solid name for faces in no group.
    pub unassigned_name: String,
}

impl ExportOptions {
    /// Create default options writing to `output_path`.
    pub fn new<P: Into<PathBuf>>(output_path: P) -> Self {
        Self {
            only_selected: false,
            output_path: output_path.into(),
            format: StlFormat::Ascii,
            split_files: false,
            group_prefix: "group".to_string(),
            unassigned_name: "unassigned".to_string(),
        }
    }

    /// Set whether unassigned faces are dropped.
    pub fn with_only_selected(mut self, only_selected: bool) -> Self {
        self.only_selected = only_selected;
        self
    }

    /// Set the STL flavour.
    pub fn with_format(mut self, format: StlFormat) -> Self {
        self.format = format;
        self
    }

    /// Set whether each solid goes to its own file.
    pub fn with_split_files(mut self, split: bool) -> Self {
        self.split_files = split;
        self
    }

    /// Set the group solid name prefix.
    pub fn with_group_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.group_prefix = prefix.into();
        self
    }

    /// Set the name of the unassigned-faces solid.
    pub fn with_unassigned_name(mut self, name: impl Into<String>) -> Self {
        self.unassigned_name = name.into();
        self
    }

    /// Check that the configured names make valid STL solid names.
    ///
    /// Solid names are single tokens, so whitespace is rejected. The group
    /// prefix may be empty; the unassigned name may not.
    pub fn validate(&self) -> Result<()> {
        if self.group_prefix.contains(char::is_whitespace) {
            return Err(CarveError::invalid_param(
                "group_prefix",
                &self.group_prefix,
                "STL solid names cannot contain whitespace",
            ));
        }
        if self.unassigned_name.is_empty() || self.unassigned_name.contains(char::is_whitespace) {
            return Err(CarveError::invalid_param(
                "unassigned_name",
                format!("{:?}", self.unassigned_name),
                "must be a non-empty name without whitespace",
            ));
        }
        Ok(())
    }

    /// Solid name for a group.
    pub fn group_name(&self, group: GroupId) -> String {
        if self.group_prefix.is_empty() {
            group.to_string()
        } else {
            format!("{}_{}", self.group_prefix, group)
        }
    }
}

/// One output solid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solid {
    /// Solid name as written to the file.
    pub name: String,
    /// Source group; `None` for the unassigned solid.
    pub group: Option<GroupId>,
    /// Member faces in ascending order.
    pub faces: Vec<FaceId>,
}

/// Summary of one written solid.
#[derive(Debug, Clone, Serialize)]
pub struct SolidSummary {
    /// Solid name.
    pub name: String,
    /// Number of faces in the solid.
    pub faces: usize,
    /// File the solid was written to.
    pub file: PathBuf,
}

/// What [`export`] wrote.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Written solids in output order.
    pub solids: Vec<SolidSummary>,
}

impl ExportReport {
    /// Distinct files written, in output order.
    pub fn files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::new();
        for s in &self.solids {
            if !files.contains(&s.file.as_path()) {
                files.push(&s.file);
            }
        }
        files
    }

    /// Total number of faces written.
    pub fn face_count(&self) -> usize {
        self.solids.iter().map(|s| s.faces).sum()
    }

    /// Solid name to file name, as a JSON object.
    pub fn to_manifest(&self) -> serde_json::Value {
        let map: BTreeMap<&str, String> = self
            .solids
            .iter()
            .map(|s| (s.name.as_str(), s.file.display().to_string()))
            .collect();
        serde_json::json!(map)
    }

    /// Label to file name, as a JSON object.
    ///
    /// Each label is paired with the name of the solid it was exported as.
    /// Labels whose solid was not written (an empty patch) map to `null`.
    pub fn to_labeled_manifest(&self, labels: &[(String, String)]) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (label, solid) in labels {
            let file = self
                .solids
                .iter()
                .find(|s| &s.name == solid)
                .map(|s| serde_json::Value::String(s.file.display().to_string()))
                .unwrap_or(serde_json::Value::Null);
            map.insert(label.clone(), file);
        }
        serde_json::Value::Object(map)
    }
}

/// Split the mesh faces into solids.
///
/// # Errors
///
/// - [`CarveError::InvalidParameter`] if the store was made for a different
///   mesh, a name is not a valid solid name, or two solids share a name
/// - [`CarveError::EmptyExport`] if no solid would be produced
pub fn build_solids(mesh: &TriangleMesh, store: &GroupStore, options: &ExportOptions) -> Result<Vec<Solid>> {
    options.validate()?;
    if store.face_count() != mesh.num_faces() {
        return Err(CarveError::invalid_param(
            "store",
            store.face_count(),
            "face count does not match the mesh",
        ));
    }

    let mut solids: Vec<Solid> = store
        .groups()
        .iter()
        .filter(|g| !g.is_empty())
        .map(|g| Solid {
            name: options.group_name(g.id()),
            group: Some(g.id()),
            faces: g.faces().iter().copied().collect(),
        })
        .collect();

    if options.only_selected {
        if solids.is_empty() {
            return Err(CarveError::EmptyExport);
        }
    } else {
        let unassigned = store.unassigned_faces();
        if !unassigned.is_empty() {
            solids.push(Solid {
                name: options.unassigned_name.clone(),
                group: None,
                faces: unassigned,
            });
        }
    }

    if solids.is_empty() {
        return Err(CarveError::EmptyExport);
    }

    // Names double as file name suffixes, so a clash would overwrite a file
    let mut names = BTreeSet::new();
    if let Some(clash) = solids.iter().find(|s| !names.insert(s.name.as_str())) {
        return Err(CarveError::invalid_param(
            "unassigned_name",
            &clash.name,
            "collides with a group solid name",
        ));
    }
    Ok(solids)
}

/// File a solid goes to when each solid gets its own file.
pub fn solid_path(output: &Path, solid: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stl".to_string());
    output.with_file_name(format!("{}_{}.{}", stem, solid, extension))
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let save_error = |e: std::io::Error| CarveError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut writer = BufWriter::new(File::create(path).map_err(save_error)?);
    write(&mut writer).map_err(save_error)?;
    writer.flush().map_err(save_error)
}

/// Write the groups of `store` as STL solids.
///
/// Nothing is written when [`build_solids`] fails.
pub fn export(mesh: &TriangleMesh, store: &GroupStore, options: &ExportOptions) -> Result<ExportReport> {
    let solids = build_solids(mesh, store, options)?;
    let split = options.split_files || (options.format == StlFormat::Binary && solids.len() > 1);

    let mut report = ExportReport::default();
    let summary = |solid: &Solid, file: &Path| SolidSummary {
        name: solid.name.clone(),
        faces: solid.faces.len(),
        file: file.to_path_buf(),
    };

    if split {
        for solid in &solids {
            let path = solid_path(&options.output_path, &solid.name);
            write_file(&path, |w| match options.format {
                StlFormat::Ascii => write_ascii_solid(w, &solid.name, mesh, &solid.faces),
                StlFormat::Binary => write_binary(w, mesh, &solid.faces),
            })?;
            report.solids.push(summary(solid, &path));
        }
    } else {
        let path = options.output_path.as_path();
        write_file(path, |w| {
            for solid in &solids {
                match options.format {
                    StlFormat::Ascii => write_ascii_solid(w, &solid.name, mesh, &solid.faces)?,
                    StlFormat::Binary => write_binary(w, mesh, &solid.faces)?,
                }
            }
            Ok(())
        })?;
        report.solids.extend(solids.iter().map(|s| summary(s, path)));
    }

    info!(
        solids = report.solids.len(),
        faces = report.face_count(),
        files = report.files().len(),
        only_selected = options.only_selected,
        "export finished"
    );
    Ok(report)
}

/// Write a manifest, such as [`ExportReport::to_manifest`], as pretty JSON.
pub fn write_manifest<P: AsRef<Path>>(manifest: &serde_json::Value, path: P) -> Result<()> {
    let path = path.as_ref();
    write_file(path, |w| {
        serde_json::to_writer_pretty(&mut *w, manifest)?;
        writeln!(w)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::stl;
    use crate::mesh::build_from_triangles;
    use nalgebra::Point3;

    fn f(i: usize) -> FaceId {
        FaceId::new(i)
    }

    /// A 2x2 quad grid: 8 faces.
    fn grid() -> TriangleMesh {
        let mut vertices = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                vertices.push(Point3::new(i as f64 * 0.5, j as f64 * 0.25, 0.0));
            }
        }
        let mut faces = Vec::new();
        for j in 0..2 {
            for i in 0..2 {
                let v00 = j * 3 + i;
                faces.push([v00, v00 + 1, v00 + 4]);
                faces.push([v00, v00 + 4, v00 + 3]);
            }
        }
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn count_facets(text: &str) -> Vec<(String, usize)> {
        let mut solids = Vec::new();
        for line in text.lines().map(str::trim) {
            if let Some(name) = line.strip_prefix("solid ") {
                solids.push((name.to_string(), 0));
            } else if line.starts_with("facet normal") {
                if let Some(last) = solids.last_mut() {
                    last.1 += 1;
                }
            }
        }
        solids
    }

    #[test]
    fn test_build_solids_partition() {
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.add_faces(GroupId::new(0), &[f(1), f(0)]).unwrap();
        store.create_group(); // group 1 stays empty
        let g2 = store.create_group();
        store.toggle_face(g2, f(6)).unwrap();

        let options = ExportOptions::new("out.stl");
        let solids = build_solids(&mesh, &store, &options).unwrap();

        let names: Vec<&str> = solids.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["group_0", "group_2", "unassigned"]);
        assert_eq!(solids[0].faces, vec![f(0), f(1)]);
        assert_eq!(solids[2].faces, vec![f(2), f(3), f(4), f(5), f(7)]);

        let total: usize = solids.iter().map(|s| s.faces.len()).sum();
        assert_eq!(total, mesh.num_faces());

        let selected = build_solids(&mesh, &store, &options.clone().with_only_selected(true)).unwrap();
        let total: usize = selected.iter().map(|s| s.faces.len()).sum();
        assert_eq!(total, store.total_selected_count());
    }

    #[test]
    fn test_empty_export_is_reported_and_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.stl");
        let mesh = grid();
        let store = GroupStore::new(mesh.num_faces());

        let options = ExportOptions::new(&path).with_only_selected(true);
        let err = export(&mesh, &store, &options).unwrap_err();
        assert!(matches!(err, CarveError::EmptyExport));
        assert!(!path.exists());

        // Without the filter the whole mesh is one unassigned solid
        let report = export(&mesh, &store, &options.with_only_selected(false)).unwrap();
        assert_eq!(report.solids.len(), 1);
        assert_eq!(report.solids[0].name, "unassigned");
        assert_eq!(report.face_count(), 8);
    }

    #[test]
    fn test_ascii_export_roundtrip_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patches.stl");
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.add_faces(GroupId::new(0), &[f(2), f(3)]).unwrap();
        let g1 = store.create_group();
        store.add_faces(g1, &[f(7)]).unwrap();

        let report = export(&mesh, &store, &ExportOptions::new(&path)).unwrap();
        assert_eq!(report.files(), vec![path.as_path()]);

        let text = std::fs::read_to_string(&path).unwrap();
        let counts = count_facets(&text);
        assert_eq!(
            counts,
            vec![
                ("group_0".to_string(), 2),
                ("group_1".to_string(), 1),
                ("unassigned".to_string(), 5),
            ]
        );
        assert_eq!(counts.iter().map(|c| c.1).sum::<usize>(), mesh.num_faces());
        assert_eq!(stl::load(&path).unwrap().num_faces(), mesh.num_faces());

        let selected = export(&mesh, &store, &ExportOptions::new(&path).with_only_selected(true)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let total: usize = count_facets(&text).iter().map(|c| c.1).sum();
        assert_eq!(total, store.total_selected_count());
        assert_eq!(selected.face_count(), 3);
    }

    #[test]
    fn test_ascii_export_keeps_vertex_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.stl");
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.toggle_face(GroupId::new(0), f(5)).unwrap();

        export(&mesh, &store, &ExportOptions::new(&path).with_only_selected(true)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let written: Vec<Point3<f64>> = text
            .lines()
            .filter_map(|l| l.trim().strip_prefix("vertex "))
            .map(|rest| {
                let c: Vec<f64> = rest.split_whitespace().map(|v| v.parse().unwrap()).collect();
                Point3::new(c[0], c[1], c[2])
            })
            .collect();
        assert_eq!(written, mesh.face_positions(f(5)).to_vec());
    }

    #[test]
    fn test_binary_export_splits_per_solid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.stl");
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.add_faces(GroupId::new(0), &[f(0), f(1), f(2)]).unwrap();

        let options = ExportOptions::new(&path).with_format(StlFormat::Binary);
        let report = export(&mesh, &store, &options).unwrap();

        assert_eq!(report.files().len(), 2);
        assert_eq!(report.solids[0].file, dir.path().join("part_group_0.stl"));
        assert_eq!(report.solids[1].file, dir.path().join("part_unassigned.stl"));

        let reloaded: usize = report
            .files()
            .iter()
            .map(|p| stl::load(p).unwrap().num_faces())
            .sum();
        assert_eq!(reloaded, mesh.num_faces());
    }

    #[test]
    fn test_mismatched_store_is_rejected() {
        let mesh = grid();
        let store = GroupStore::new(3);
        let result = build_solids(&mesh, &store, &ExportOptions::new("x.stl"));
        assert!(matches!(result, Err(CarveError::InvalidParameter { name: "store", .. })));
    }

    #[test]
    fn test_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.toggle_face(GroupId::new(0), f(4)).unwrap();

        let options = ExportOptions::new(dir.path().join("p.stl")).with_split_files(true);
        let report = export(&mesh, &store, &options).unwrap();
        let manifest_path = dir.path().join("patches.json");
        write_manifest(&report.to_manifest(), &manifest_path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object["group_0"].as_str().unwrap().ends_with("p_group_0.stl"));
        assert!(object["unassigned"].as_str().unwrap().ends_with("p_unassigned.stl"));
    }

    #[test]
    fn test_labeled_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.add_faces(GroupId::new(0), &[f(0), f(1)]).unwrap();
        store.create_group(); // matched nothing

        let options = ExportOptions::new(dir.path().join("patch.stl"))
            .with_group_prefix("")
            .with_only_selected(true)
            .with_split_files(true);
        let report = export(&mesh, &store, &options).unwrap();

        let labels = vec![
            ("normal_(0, 0, 1)".to_string(), "0".to_string()),
            ("grow_5".to_string(), "1".to_string()),
        ];
        let manifest = report.to_labeled_manifest(&labels);
        let object = manifest.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object["normal_(0, 0, 1)"].as_str().unwrap().ends_with("patch_0.stl"));
        assert!(object["grow_5"].is_null());

        let manifest_path = dir.path().join("patches.json");
        write_manifest(&manifest, &manifest_path).unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_clashing_solid_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.stl");
        let mesh = grid();
        let mut store = GroupStore::new(mesh.num_faces());
        store.add_faces(GroupId::new(0), &[f(0)]).unwrap();

        let options = ExportOptions::new(&path)
            .with_group_prefix("")
            .with_unassigned_name("0")
            .with_split_files(true);
        let err = export(&mesh, &store, &options).unwrap_err();
        assert!(matches!(err, CarveError::InvalidParameter { name: "unassigned_name", .. }));
        assert!(!dir.path().join("patch_0.stl").exists());

        // Dropping the unassigned solid removes the clash
        let report = export(&mesh, &store, &options.with_only_selected(true)).unwrap();
        assert_eq!(report.face_count(), 1);
    }

    #[test]
    fn test_whitespace_names_are_rejected() {
        let mesh = grid();
        let store = GroupStore::new(mesh.num_faces());

        let options = ExportOptions::new("x.stl").with_group_prefix("my group");
        assert!(matches!(
            build_solids(&mesh, &store, &options),
            Err(CarveError::InvalidParameter { name: "group_prefix", .. })
        ));

        let options = ExportOptions::new("x.stl").with_unassigned_name("");
        assert!(options.validate().is_err());
        assert!(ExportOptions::new("x.stl").with_group_prefix("").validate().is_ok());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("BINARY".parse::<StlFormat>().unwrap(), StlFormat::Binary);
        assert_eq!("ascii".parse::<StlFormat>().unwrap(), StlFormat::Ascii);
        assert!(matches!("obj".parse::<StlFormat>(), Err(CarveError::UnsupportedFormat { .. })));
        assert_eq!(StlFormat::Binary.to_string(), "binary");
    }

    #[test]
    fn test_solid_path() {
        assert_eq!(solid_path(Path::new("/tmp/a.stl"), "group_1"), PathBuf::from("/tmp/a_group_1.stl"));
        assert_eq!(solid_path(Path::new("out"), "x"), PathBuf::from("out_x.stl"));
    }
}
