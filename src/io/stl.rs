//! STL (stereolithography) format support.
//!
//! Loading goes through `stl_io`, which handles both binary and ASCII files.
//! ASCII files holding several solids are read block by block and the faces
//! concatenated in file order.
//! Writing supports binary (one solid per file) and ASCII, where several
//! named solids can follow each other in one file.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::algo::adjacency::face_normal;
use crate::error::{CarveError, Result};
use crate::mesh::{build_from_triangles, FaceId, TriangleMesh};

/// Load a mesh from an STL file.
///
/// Automatically detects binary vs ASCII format. Face order is preserved
/// exactly, degenerate triangles included, so face indices match what a
/// viewer loading the same file reports.
///
/// # Example
///
/// ```no_run
/// use stlcarve::io::stl;
///
/// let mesh = stl::load("model.stl").unwrap();
/// println!("{} faces", mesh.num_faces());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let has_stl_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("stl"));
    if !has_stl_extension {
        warn!(path = %path.display(), "file does not have an .stl extension, reading anyway");
    }

    let bytes = std::fs::read(path)?;
    let load_error = |message: String| CarveError::LoadError {
        path: path.to_path_buf(),
        message,
    };

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let chunks = ascii_solids(&bytes);
    if chunks.len() > 1 {
        debug!(path = %path.display(), solids = chunks.len(), "reading multi-solid ASCII STL");
    }
    for chunk in chunks {
        let stl = stl_io::read_stl(&mut Cursor::new(chunk)).map_err(|e| load_error(e.to_string()))?;
        let offset = vertices.len();
        vertices.extend(
            stl.vertices
                .iter()
                .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)),
        );
        faces.extend(stl.faces.iter().map(|t| t.vertices.map(|v| v + offset)));
    }

    if faces.is_empty() {
        return Err(load_error("STL file contains no triangles".to_string()));
    }

    debug!(path = %path.display(), faces = faces.len(), vertices = vertices.len(), "loaded STL");
    build_from_triangles(&vertices, &faces)
}

/// Split an ASCII STL file into its `solid ... endsolid` blocks.
///
/// Anything that is not ASCII text with at least one `solid` line, such as a
/// binary file, comes back as a single chunk for `stl_io` to detect.
fn ascii_solids(bytes: &[u8]) -> Vec<&[u8]> {
    let is_solid_line = |line: &[u8]| {
        let skip = line.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let line = &line[skip..];
        line.starts_with(b"solid") && line.get(5).map_or(true, |b| b.is_ascii_whitespace())
    };
    if !bytes.is_ascii() || !is_solid_line(bytes) {
        return vec![bytes];
    }

    let mut starts = Vec::new();
    let mut pos = 0;
    for line in bytes.split_inclusive(|&b| b == b'\n') {
        if is_solid_line(line) {
            starts.push(pos);
        }
        pos += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| &bytes[start..starts.get(i + 1).copied().unwrap_or(bytes.len())])
        .collect()
}

/// Facet normal written to the file; zero for degenerate faces.
fn facet_normal(mesh: &TriangleMesh, f: FaceId) -> Vector3<f64> {
    face_normal(mesh, f).unwrap_or_else(|_| Vector3::zeros())
}

fn to_stl_triangle(mesh: &TriangleMesh, f: FaceId) -> stl_io::Triangle {
    let n = facet_normal(mesh, f);
    let [p0, p1, p2] = mesh.face_positions(f);
    stl_io::Triangle {
        normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
        vertices: [
            stl_io::Vertex::new([p0.x as f32, p0.y as f32, p0.z as f32]),
            stl_io::Vertex::new([p1.x as f32, p1.y as f32, p1.z as f32]),
            stl_io::Vertex::new([p2.x as f32, p2.y as f32, p2.z as f32]),
        ],
    }
}

/// Write `faces` of `mesh` as one binary STL solid.
pub fn write_binary<W: Write>(writer: &mut W, mesh: &TriangleMesh, faces: &[FaceId]) -> std::io::Result<()> {
    let triangles: Vec<stl_io::Triangle> = faces.iter().map(|&f| to_stl_triangle(mesh, f)).collect();
    stl_io::write_stl(writer, triangles.iter())
}

/// Write `faces` of `mesh` as one ASCII STL solid called `name`.
///
/// Coordinates are written with shortest round-trip precision, so the
/// vertex data is reproduced exactly.
pub fn write_ascii_solid<W: Write>(
    writer: &mut W,
    name: &str,
    mesh: &TriangleMesh,
    faces: &[FaceId],
) -> std::io::Result<()> {
    writeln!(writer, "solid {}", name)?;
    for &f in faces {
        let n = facet_normal(mesh, f);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for p in mesh.face_positions(f) {
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)
}

/// Save a whole mesh to a binary STL file.
pub fn save<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = std::io::BufWriter::new(File::create(path)?);
    let faces: Vec<FaceId> = mesh.face_ids().collect();

    write_binary(&mut writer, mesh, &faces).map_err(|e| CarveError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}
