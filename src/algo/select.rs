//! Rule-based face selection.
//!
//! Unlike region growing these rules ignore connectivity: every face that
//! satisfies the rule is selected, wherever it is on the mesh.

use std::collections::BTreeSet;

use nalgebra::{Point3, Vector3};

use super::adjacency::AdjacencyIndex;
use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, TriangleMesh};

/// Default cosine-distance tolerance for [`select_by_normal`].
pub const DEFAULT_NORMAL_TOLERANCE: f64 = 0.02;

/// Select every face whose normal points along `target`.
///
/// A face qualifies when `|n · t̂ - 1| < tolerance`, where `t̂` is the
/// normalized target direction. Degenerate faces never qualify.
///
/// # Errors
///
/// Returns an invalid parameter error if `target` has zero length.
pub fn select_by_normal(
    adjacency: &AdjacencyIndex,
    target: &Vector3<f64>,
    tolerance: f64,
) -> Result<BTreeSet<FaceId>> {
    let t = target
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| CarveError::invalid_param("target", format!("{:?}", target.as_slice()), "must be non-zero"))?;

    Ok((0..adjacency.face_count())
        .map(FaceId::new)
        .filter(|&f| {
            adjacency
                .normal(f)
                .is_some_and(|n| (n.dot(&t) - 1.0).abs() < tolerance)
        })
        .collect())
}

/// Select every face whose centroid lies inside the box `[min, max]`.
///
/// Bounds are inclusive on all three axes.
pub fn select_by_bbox(mesh: &TriangleMesh, min: &Point3<f64>, max: &Point3<f64>) -> BTreeSet<FaceId> {
    mesh.face_ids()
        .filter(|&f| {
            let c = mesh.face_centroid(f);
            (0..3).all(|i| c[i] >= min[i] && c[i] <= max[i])
        })
        .collect()
}
