//! Face adjacency and face normals.
//!
//! Two faces are adjacent when they share an edge. STL files store every
//! triangle with its own copy of each corner, so vertices are first welded:
//! positions closer than a tolerance collapse onto one vertex id, and edges
//! are keyed by the unordered pair of welded ids.
//!
//! Edges with more than two incident faces (non-manifold) make every one of
//! those faces adjacent to every other, so adjacency stays symmetric on any
//! input.

use std::collections::{BTreeSet, HashMap, VecDeque};

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, TriangleMesh};

/// Faces whose edge cross product is shorter than this have no usable normal.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Default distance under which two vertex positions are considered the same.
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-6;

/// Options for building an [`AdjacencyIndex`].
#[derive(Debug, Clone)]
pub struct AdjacencyOptions {
    /// Vertex positions closer than this are welded into one vertex.
    /// Zero welds only exactly coincident positions.
    pub weld_tolerance: f64,

    /// Whether to use parallel execution for normal computation (default: true).
    pub parallel: bool,
}

impl Default for AdjacencyOptions {
    fn default() -> Self {
        Self {
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
            parallel: true,
        }
    }
}

impl AdjacencyOptions {
    /// Set the vertex weld tolerance. Negative values are treated as zero.
    pub fn with_weld_tolerance(mut self, tolerance: f64) -> Self {
        self.weld_tolerance = if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 };
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Compute the unit normal of a face.
///
/// The normal is the normalized cross product `(p1 - p0) x (p2 - p0)`, so it
/// follows the face winding.
///
/// # Errors
///
/// Returns [`CarveError::DegenerateFace`] for zero-area faces and
/// [`CarveError::InvalidFace`] for faces outside the mesh.
pub fn face_normal(mesh: &TriangleMesh, f: FaceId) -> Result<Vector3<f64>> {
    if !mesh.contains_face(f) {
        return Err(CarveError::InvalidFace {
            face: f.index(),
            face_count: mesh.num_faces(),
        });
    }
    let cross = mesh.face_cross(f);
    let norm = cross.norm();
    if !norm.is_finite() || norm < DEGENERATE_EPSILON {
        return Err(CarveError::DegenerateFace { face: f });
    }
    Ok(cross / norm)
}

/// Weld coincident vertex positions.
///
/// Returns the welded id of every input point and the number of distinct
/// welded vertices. Welded ids are assigned in order of first appearance.
///
/// Points are bucketed into a uniform grid with cell size `tolerance`; a
/// point is matched against representatives in its own and the 26
/// surrounding cells, so the expected cost is linear in the point count.
/// Points whose cell index does not fit the grid (non-finite coordinates,
/// or a tolerance tiny relative to the coordinates) are welded exactly.
pub fn weld_vertices(points: &[Point3<f64>], tolerance: f64) -> (Vec<usize>, usize) {
    let mut ids = Vec::with_capacity(points.len());
    let mut exact: HashMap<[u64; 3], usize> = HashMap::new();
    let mut count = 0;

    if tolerance.is_nan() || tolerance <= 0.0 {
        for p in points {
            ids.push(*exact.entry(exact_key(p)).or_insert_with(|| {
                count += 1;
                count - 1
            }));
        }
        return (ids, count);
    }

    // Representative (welded id, position) pairs per grid cell
    let mut grid: HashMap<[i64; 3], Vec<(usize, Point3<f64>)>> = HashMap::new();

    for p in points {
        let Some(cell) = grid_cell(p, tolerance) else {
            ids.push(*exact.entry(exact_key(p)).or_insert_with(|| {
                count += 1;
                count - 1
            }));
            continue;
        };
        let mut found = None;

        'probe: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    if let Some(reps) = grid.get(&key) {
                        if let Some(&(id, _)) = reps.iter().find(|(_, q)| (p - q).norm() <= tolerance) {
                            found = Some(id);
                            break 'probe;
                        }
                    }
                }
            }
        }

        let id = match found {
            Some(id) => id,
            None => {
                let id = count;
                count += 1;
                grid.entry(cell).or_default().push((id, *p));
                id
            }
        };
        ids.push(id);
    }

    (ids, count)
}

/// Largest cell index magnitude; keeps `cell ± 1` exact and inside `i64`.
const MAX_CELL: f64 = 9_007_199_254_740_992.0; // 2^53

fn grid_cell(p: &Point3<f64>, tolerance: f64) -> Option<[i64; 3]> {
    let mut cell = [0i64; 3];
    for (slot, c) in cell.iter_mut().zip([p.x, p.y, p.z]) {
        let scaled = (c / tolerance).floor();
        if !scaled.is_finite() || scaled.abs() >= MAX_CELL {
            return None;
        }
        *slot = scaled as i64;
    }
    Some(cell)
}

fn exact_key(p: &Point3<f64>) -> [u64; 3] {
    // -0.0 and 0.0 are the same position
    [p.x, p.y, p.z].map(|c| if c == 0.0 { 0u64 } else { c.to_bits() })
}

/// Face-to-face adjacency and per-face normals for one mesh.
///
/// Built once per loaded mesh and never mutated afterwards, so it can be
/// shared freely with a rendering thread.
#[derive(Debug, Clone)]
pub struct AdjacencyIndex {
    /// For each face, the sorted list of edge-sharing faces.
    neighbors: Vec<Vec<FaceId>>,
    /// Unit normal per face; `None` for degenerate faces.
    normals: Vec<Option<Vector3<f64>>>,
    /// Faces that were flagged during the build.
    degenerate: Vec<FaceId>,
    /// Number of distinct vertices after welding.
    welded_vertices: usize,
    /// Number of edges with more than two incident faces.
    non_manifold_edges: usize,
}

impl AdjacencyIndex {
    /// Build the adjacency index with default options.
    ///
    /// # Example
    ///
    /// ```
    /// use stlcarve::algo::AdjacencyIndex;
    /// use stlcarve::mesh::{build_from_triangles, FaceId};
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.5, 1.0, 0.0),
    ///     Point3::new(1.5, 1.0, 0.0),
    /// ];
    /// let faces = vec![[0, 1, 2], [1, 3, 2]];
    /// let mesh = build_from_triangles(&vertices, &faces).unwrap();
    ///
    /// let adjacency = AdjacencyIndex::build(&mesh);
    /// assert_eq!(adjacency.neighbors(FaceId::new(0)), &[FaceId::new(1)]);
    /// ```
    pub fn build(mesh: &TriangleMesh) -> Self {
        Self::build_with_options(mesh, &AdjacencyOptions::default())
    }

    /// Build the adjacency index.
    ///
    /// Degenerate faces never abort the build: they get no normal and no
    /// neighbours, and are reported by [`degenerate_faces`](Self::degenerate_faces).
    pub fn build_with_options(mesh: &TriangleMesh, options: &AdjacencyOptions) -> Self {
        let num_faces = mesh.num_faces();

        let (welded, welded_vertices) = weld_vertices(mesh.vertices(), options.weld_tolerance);

        let compute = |i: usize| face_normal(mesh, FaceId::new(i)).ok();
        let mut normals: Vec<Option<Vector3<f64>>> = if options.parallel {
            (0..num_faces).into_par_iter().map(compute).collect()
        } else {
            (0..num_faces).map(compute).collect()
        };

        // Map each undirected welded edge to the faces that contain it
        let mut edge_to_faces: HashMap<(usize, usize), Vec<FaceId>> =
            HashMap::with_capacity(num_faces * 3 / 2);
        let mut degenerate = Vec::new();

        for (fi, face) in mesh.faces().iter().enumerate() {
            let f = FaceId::new(fi);
            let w = (*face).map(|v| welded[v]);

            // Welding can collapse a sliver onto a segment even if its area is nonzero
            if normals[fi].is_none() || w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
                normals[fi] = None;
                degenerate.push(f);
                continue;
            }

            for i in 0..3 {
                let a = w[i];
                let b = w[(i + 1) % 3];
                let edge = if a < b { (a, b) } else { (b, a) };
                edge_to_faces.entry(edge).or_default().push(f);
            }
        }

        let mut neighbors: Vec<Vec<FaceId>> = vec![Vec::new(); num_faces];
        let mut non_manifold_edges = 0;

        for faces in edge_to_faces.values() {
            if faces.len() > 2 {
                non_manifold_edges += 1;
            }
            for (i, &a) in faces.iter().enumerate() {
                for &b in &faces[i + 1..] {
                    if a != b {
                        neighbors[a.index()].push(b);
                        neighbors[b.index()].push(a);
                    }
                }
            }
        }

        // Two faces can share more than one edge on folded input
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        if !degenerate.is_empty() {
            warn!(count = degenerate.len(), "skipping degenerate faces");
        }
        if non_manifold_edges > 0 {
            debug!(non_manifold_edges, "mesh has non-manifold edges");
        }
        info!(
            faces = num_faces,
            vertices = mesh.num_vertices(),
            welded_vertices,
            edges = edge_to_faces.len(),
            "built face adjacency"
        );

        Self {
            neighbors,
            normals,
            degenerate,
            welded_vertices,
            non_manifold_edges,
        }
    }

    /// Number of faces covered by the index.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Return an error unless `f` is a face of the indexed mesh.
    pub fn check_face(&self, f: FaceId) -> Result<()> {
        if f.index() < self.neighbors.len() {
            Ok(())
        } else {
            Err(CarveError::InvalidFace {
                face: f.index(),
                face_count: self.neighbors.len(),
            })
        }
    }

    /// Faces sharing an edge with `f`, in ascending order.
    ///
    /// Returns an empty slice if the face index is out of bounds.
    pub fn neighbors(&self, f: FaceId) -> &[FaceId] {
        self.neighbors.get(f.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unit normal of `f`, or `None` for degenerate or out-of-range faces.
    pub fn normal(&self, f: FaceId) -> Option<Vector3<f64>> {
        self.normals.get(f.index()).copied().flatten()
    }

    /// Check if two faces share an edge.
    pub fn are_adjacent(&self, a: FaceId, b: FaceId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Faces flagged as degenerate during the build, in ascending order.
    pub fn degenerate_faces(&self) -> &[FaceId] {
        &self.degenerate
    }

    /// Number of distinct vertices after welding.
    pub fn welded_vertex_count(&self) -> usize {
        self.welded_vertices
    }

    /// Number of edges shared by more than two faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.non_manifold_edges
    }

    /// Verify that `b ∈ neighbors(a)` exactly when `a ∈ neighbors(b)`.
    pub fn is_symmetric(&self) -> bool {
        self.neighbors.iter().enumerate().all(|(a, list)| {
            let a = FaceId::new(a);
            list.iter().all(|&b| self.are_adjacent(b, a))
        })
    }

    /// All faces reachable from `start` through shared edges, ignoring normals.
    pub fn connected_component(&self, start: FaceId) -> Result<BTreeSet<FaceId>> {
        self.check_face(start)?;

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(face) = queue.pop_front() {
            for &n in self.neighbors(face) {
                if visited.insert(n) {
                    queue.push_back(n);
                }
            }
        }

        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_soup, build_from_triangles};

    fn two_triangles() -> TriangleMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(1.5, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [1, 3, 2]]).unwrap()
    }

    fn f(i: usize) -> FaceId {
        FaceId::new(i)
    }

    #[test]
    fn test_adjacency_basic() {
        let adj = AdjacencyIndex::build(&two_triangles());

        assert_eq!(adj.face_count(), 2);
        assert_eq!(adj.neighbors(f(0)), &[f(1)]);
        assert_eq!(adj.neighbors(f(1)), &[f(0)]);
        assert!(adj.neighbors(f(100)).is_empty());
        assert!(adj.is_symmetric());
        assert!(adj.degenerate_faces().is_empty());
    }

    #[test]
    fn test_face_normal_follows_winding() {
        let mesh = two_triangles();
        let n = face_normal(&mesh, f(0)).unwrap();
        assert!((n - Vector3::z()).norm() < 1e-12);

        assert!(matches!(
            face_normal(&mesh, f(2)),
            Err(CarveError::InvalidFace { face: 2, face_count: 2 })
        ));
    }

    #[test]
    fn test_soup_is_welded() {
        // Same two triangles, but every corner duplicated and slightly jittered
        let soup = vec![
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
            ],
            [
                Point3::new(1.0 + 1e-9, 0.0, 0.0),
                Point3::new(1.5, 1.0, 0.0),
                Point3::new(0.5, 1.0 - 1e-9, 0.0),
            ],
        ];
        let mesh = build_from_soup(&soup).unwrap();
        let adj = AdjacencyIndex::build(&mesh);

        assert_eq!(adj.welded_vertex_count(), 4);
        assert!(adj.are_adjacent(f(0), f(1)));

        // Exact welding keeps the jittered corners apart
        let exact = AdjacencyIndex::build_with_options(
            &mesh,
            &AdjacencyOptions::default().with_weld_tolerance(0.0),
        );
        assert_eq!(exact.welded_vertex_count(), 6);
        assert!(exact.neighbors(f(0)).is_empty());
    }

    #[test]
    fn test_weld_across_cell_boundary() {
        // The two points straddle a grid cell boundary at x = 1e-3
        let points = vec![Point3::new(0.999_9e-3, 0.0, 0.0), Point3::new(1.000_1e-3, 0.0, 0.0)];
        let (ids, count) = weld_vertices(&points, 1e-3);
        assert_eq!(count, 1);
        assert_eq!(ids, vec![0, 0]);
    }

    #[test]
    fn test_tiny_weld_tolerance_falls_back_to_exact() {
        let mesh = two_triangles();
        let adj = AdjacencyIndex::build_with_options(
            &mesh,
            &AdjacencyOptions::default().with_weld_tolerance(1e-300),
        );
        assert_eq!(adj.welded_vertex_count(), 4);
        assert!(adj.are_adjacent(f(0), f(1)));
    }

    #[test]
    fn test_non_finite_coordinates_do_not_panic() {
        let points = vec![
            Point3::new(f64::INFINITY, 0.0, 0.0),
            Point3::new(f64::INFINITY, 0.0, 0.0),
            Point3::new(f64::NAN, 1.0, 0.0),
            Point3::new(1e300, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let (ids, count) = weld_vertices(&points, 1e-6);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[4], 3);
        assert_eq!(count, 4);

        let vertices = vec![
            Point3::new(f64::INFINITY, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(1.5, 1.0, 0.0),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [1, 3, 2]]).unwrap();
        let adj = AdjacencyIndex::build(&mesh);
        assert_eq!(adj.degenerate_faces(), &[f(0)]);
        assert!(adj.normal(f(1)).is_some());
    }

    #[test]
    fn test_degenerate_face_is_flagged_not_fatal() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0), // collinear with 0 and 1
        ];
        let faces = vec![[0, 1, 2], [0, 1, 3]];
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        assert!(matches!(
            face_normal(&mesh, f(1)),
            Err(CarveError::DegenerateFace { .. })
        ));

        let adj = AdjacencyIndex::build(&mesh);
        assert_eq!(adj.degenerate_faces(), &[f(1)]);
        assert!(adj.normal(f(1)).is_none());
        assert!(adj.neighbors(f(0)).is_empty());
        assert!(adj.neighbors(f(1)).is_empty());
    }

    #[test]
    fn test_non_manifold_edge_is_symmetric() {
        // Three fins sharing the edge 0-1
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        let adj = AdjacencyIndex::build(&mesh);

        assert_eq!(adj.non_manifold_edge_count(), 1);
        for i in 0..3 {
            assert_eq!(adj.neighbors(f(i)).len(), 2);
        }
        assert!(adj.is_symmetric());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let mesh = two_triangles();
        let par = AdjacencyIndex::build(&mesh);
        let seq = AdjacencyIndex::build_with_options(&mesh, &AdjacencyOptions::default().with_parallel(false));

        for face in mesh.face_ids() {
            assert_eq!(par.neighbors(face), seq.neighbors(face));
            assert_eq!(par.normal(face), seq.normal(face));
        }
    }

    #[test]
    fn test_connected_component() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(11.0, 0.0, 0.0),
            Point3::new(10.5, 1.0, 0.0),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let adj = AdjacencyIndex::build(&mesh);

        let comp = adj.connected_component(f(0)).unwrap();
        assert_eq!(comp.into_iter().collect::<Vec<_>>(), vec![f(0)]);
        assert!(adj.connected_component(f(2)).is_err());
    }
}
