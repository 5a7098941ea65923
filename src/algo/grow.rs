//! Region growing by normal similarity.
//!
//! Starting from a seed face, a breadth-first traversal walks across shared
//! edges and accepts a neighbour when the angle between its normal and the
//! **seed** normal is within the tolerance. Comparing against the seed rather
//! than the BFS parent keeps a smoothly curving surface from being swallowed
//! a few degrees at a time, and it makes membership independent of visit
//! order: the result is exactly the connected component of the seed within
//! the set of faces whose normal lies inside the tolerance cone.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use super::adjacency::AdjacencyIndex;
use crate::error::Result;
use crate::mesh::FaceId;

/// Slack on the cosine comparison so coplanar faces whose computed normals
/// differ only by rounding still grow together at zero tolerance.
const COS_SLACK: f64 = 1e-12;

/// Options for region growing.
#[derive(Debug, Clone)]
pub struct GrowOptions {
    /// Maximum angle between a face normal and the seed normal, in degrees.
    /// Clamped to `[0, 180]`.
    pub angle_tolerance_deg: f64,

    /// Stop after this many faces have been accepted. `None` for no limit.
    pub max_faces: Option<usize>,
}

impl Default for GrowOptions {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: 30.0,
            max_faces: None,
        }
    }
}

impl GrowOptions {
    /// Create options with the given angle tolerance in degrees.
    pub fn with_tolerance(degrees: f64) -> Self {
        Self {
            angle_tolerance_deg: clamp_tolerance(degrees),
            max_faces: None,
        }
    }

    /// Limit the size of the grown region.
    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = Some(max_faces);
        self
    }
}

/// Clamp an angle tolerance into `[0, 180]` degrees. NaN becomes 0.
pub fn clamp_tolerance(degrees: f64) -> f64 {
    if degrees.is_nan() {
        0.0
    } else {
        degrees.clamp(0.0, 180.0)
    }
}

/// Grow a region of similar-normal faces around `seed`.
///
/// The result always contains `seed` and is connected through shared edges.
///
/// # Errors
///
/// Returns [`CarveError::InvalidFace`](crate::error::CarveError::InvalidFace)
/// if `seed` is not a face of the indexed mesh.
///
/// # Example
///
/// ```
/// use stlcarve::algo::{grow, AdjacencyIndex};
/// use stlcarve::mesh::{build_from_triangles, FaceId};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// // Two coplanar faces, plus one folded up by 90 degrees
/// let faces = vec![[0, 1, 2], [0, 2, 3], [0, 4, 1]];
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// let adjacency = AdjacencyIndex::build(&mesh);
///
/// let region = grow(&adjacency, FaceId::new(0), 10.0).unwrap();
/// assert_eq!(region.len(), 2);
/// ```
pub fn grow(
    adjacency: &AdjacencyIndex,
    seed: FaceId,
    angle_tolerance_deg: f64,
) -> Result<BTreeSet<FaceId>> {
    grow_with_options(adjacency, seed, &GrowOptions::with_tolerance(angle_tolerance_deg))
}

/// Grow a region around `seed` with explicit options.
///
/// When `max_faces` cuts the traversal short, the result is the first faces
/// reached in breadth-first order and is still connected.
pub fn grow_with_options(
    adjacency: &AdjacencyIndex,
    seed: FaceId,
    options: &GrowOptions,
) -> Result<BTreeSet<FaceId>> {
    adjacency.check_face(seed)?;

    let mut visited = BTreeSet::new();
    visited.insert(seed);

    // A degenerate seed has no orientation to compare against
    let Some(seed_normal) = adjacency.normal(seed) else {
        debug!(seed = seed.index(), "degenerate seed, region is the seed alone");
        return Ok(visited);
    };

    let tolerance = clamp_tolerance(options.angle_tolerance_deg);
    let cos_threshold = tolerance.to_radians().cos() - COS_SLACK;
    let limit = options.max_faces.unwrap_or(usize::MAX).max(1);

    let mut frontier = VecDeque::new();
    frontier.push_back(seed);

    'bfs: while let Some(face) = frontier.pop_front() {
        for &neighbor in adjacency.neighbors(face) {
            if visited.contains(&neighbor) {
                continue;
            }
            let Some(normal) = adjacency.normal(neighbor) else {
                continue;
            };
            if normal.dot(&seed_normal) >= cos_threshold {
                visited.insert(neighbor);
                if visited.len() >= limit {
                    break 'bfs;
                }
                frontier.push_back(neighbor);
            }
        }
    }

    debug!(
        seed = seed.index(),
        tolerance,
        faces = visited.len(),
        "grew region"
    );

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CarveError;
    use crate::mesh::{build_from_triangles, TriangleMesh};
    use nalgebra::Point3;

    fn f(i: usize) -> FaceId {
        FaceId::new(i)
    }

    /// Two separate unit squares of three faces each, facing opposite ways.
    fn two_squares() -> TriangleMesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for (z, flip) in [(0.0, false), (5.0, true)] {
            let base = vertices.len();
            vertices.extend([
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(0.0, 1.0, z),
                Point3::new(0.5, 0.0, z),
            ]);
            let square = [[0, 4, 3], [4, 1, 2], [4, 2, 3]];
            for [a, b, c] in square {
                if flip {
                    faces.push([base + a, base + c, base + b]);
                } else {
                    faces.push([base + a, base + b, base + c]);
                }
            }
        }
        build_from_triangles(&vertices, &faces).unwrap()
    }

    /// A strip of quads bent around the y axis, `segments` quads long, each
    /// quad turning by `step_deg` relative to the previous one.
    fn bent_strip(segments: usize, step_deg: f64) -> TriangleMesh {
        let mut vertices = Vec::new();
        let mut x = 0.0;
        let mut z = 0.0;
        for i in 0..=segments {
            vertices.push(Point3::new(x, 0.0, z));
            vertices.push(Point3::new(x, 1.0, z));
            let theta = (i as f64 * step_deg).to_radians();
            x += theta.cos();
            z += theta.sin();
        }
        let mut faces = Vec::new();
        for i in 0..segments {
            let a = 2 * i;
            faces.push([a, a + 2, a + 3]);
            faces.push([a, a + 3, a + 1]);
        }
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn is_connected(adj: &AdjacencyIndex, region: &BTreeSet<FaceId>, seed: FaceId) -> bool {
        let mut reached = BTreeSet::from([seed]);
        let mut stack = vec![seed];
        while let Some(face) = stack.pop() {
            for &n in adj.neighbors(face) {
                if region.contains(&n) && reached.insert(n) {
                    stack.push(n);
                }
            }
        }
        reached == *region
    }

    #[test]
    fn test_two_squares_stay_apart() {
        let adj = AdjacencyIndex::build(&two_squares());
        for seed in 0..3 {
            let region = grow(&adj, f(seed), 10.0).unwrap();
            assert_eq!(region, BTreeSet::from([f(0), f(1), f(2)]));
        }
        for seed in 3..6 {
            let region = grow(&adj, f(seed), 10.0).unwrap();
            assert_eq!(region, BTreeSet::from([f(3), f(4), f(5)]));
        }
    }

    #[test]
    fn test_zero_tolerance_keeps_flat_patch() {
        let adj = AdjacencyIndex::build(&two_squares());
        let region = grow(&adj, f(1), 0.0).unwrap();
        assert_eq!(region.len(), 3);
    }

    #[test]
    fn test_seed_relative_comparison_bounds_drift() {
        // Each quad turns 10 degrees, so a parent-relative rule would walk the
        // whole strip. Against the seed only quads within 25 degrees qualify.
        let mesh = bent_strip(8, 10.0);
        let adj = AdjacencyIndex::build(&mesh);

        let region = grow(&adj, f(0), 25.0).unwrap();
        // Quads 0, 1, 2 are at 0, 10 and 20 degrees
        assert_eq!(region.len(), 6);
        assert!(region.iter().all(|face| face.index() < 6));
    }

    #[test]
    fn test_result_contains_seed_and_is_connected() {
        let mesh = bent_strip(12, 15.0);
        let adj = AdjacencyIndex::build(&mesh);

        for seed in mesh.face_ids() {
            for tol in [0.0, 5.0, 20.0, 45.0, 90.0, 180.0] {
                let region = grow(&adj, seed, tol).unwrap();
                assert!(region.contains(&seed));
                assert!(is_connected(&adj, &region, seed));
            }
        }
    }

    #[test]
    fn test_tolerance_is_monotonic() {
        let mesh = bent_strip(12, 15.0);
        let adj = AdjacencyIndex::build(&mesh);
        let tolerances = [0.0, 7.5, 15.0, 30.0, 60.0, 120.0, 180.0];

        for seed in mesh.face_ids() {
            for pair in tolerances.windows(2) {
                let small = grow(&adj, seed, pair[0]).unwrap();
                let large = grow(&adj, seed, pair[1]).unwrap();
                assert!(small.is_subset(&large), "seed {:?}, {:?}", seed, pair);
            }
        }
    }

    #[test]
    fn test_grow_is_deterministic() {
        let mesh = bent_strip(10, 12.0);
        let adj = AdjacencyIndex::build(&mesh);
        let first = grow(&adj, f(7), 30.0).unwrap();
        for _ in 0..5 {
            assert_eq!(grow(&adj, f(7), 30.0).unwrap(), first);
        }
    }

    #[test]
    fn test_full_tolerance_is_connected_component() {
        let mesh = two_squares();
        let adj = AdjacencyIndex::build(&mesh);
        let region = grow(&adj, f(4), 180.0).unwrap();
        assert_eq!(region, adj.connected_component(f(4)).unwrap());
    }

    #[test]
    fn test_max_faces_limits_region() {
        let mesh = bent_strip(8, 0.0);
        let adj = AdjacencyIndex::build(&mesh);

        let options = GrowOptions::with_tolerance(10.0).with_max_faces(5);
        let region = grow_with_options(&adj, f(0), &options).unwrap();
        assert_eq!(region.len(), 5);
        assert!(is_connected(&adj, &region, f(0)));
    }

    #[test]
    fn test_invalid_seed() {
        let adj = AdjacencyIndex::build(&two_squares());
        let err = grow(&adj, f(6), 10.0).unwrap_err();
        assert!(matches!(err, CarveError::InvalidFace { face: 6, face_count: 6 }));
    }

    #[test]
    fn test_tolerance_clamping() {
        assert_eq!(clamp_tolerance(-5.0), 0.0);
        assert_eq!(clamp_tolerance(400.0), 180.0);
        assert_eq!(clamp_tolerance(f64::NAN), 0.0);
    }
}
