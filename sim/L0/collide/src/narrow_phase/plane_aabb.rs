//! Plane versus box classification.
//!
//! A plane's front side (positive signed distance) is its outside. The box
//! is projected onto the normal: `d` is the signed distance of its center
//! and `r = Σ |nᵢ hᵢ|` its projected radius.

use crate::geometry::{Aabb, Plane};

/// Maximum number of planes tracked by [`clip_mask`].
pub const MAX_PLANES: usize = 32;

/// Where a box lies relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the front side.
    Outside,
    /// Crossing or touching the plane.
    Straddling,
    /// Entirely on the back side.
    Inside,
}

/// Classify a box against a plane.
#[must_use]
pub fn classify(plane: &Plane, aabb: &Aabb) -> PlaneSide {
    let d = plane.signed_distance(&aabb.center());
    let h = aabb.half_extents();
    let r = (plane.normal.x * h.x).abs()
        + (plane.normal.y * h.y).abs()
        + (plane.normal.z * h.z).abs();
    if d > r {
        PlaneSide::Outside
    } else if d < -r {
        PlaneSide::Inside
    } else {
        PlaneSide::Straddling
    }
}

/// Classify a box against the planes whose bit is set in `mask`.
///
/// Returns `None` if the box is outside any of them, otherwise the subset
/// of `mask` the box still straddles. Children of a box only need testing
/// against the returned planes. Planes past [`MAX_PLANES`] are ignored.
#[must_use]
pub fn clip_mask(planes: &[Plane], aabb: &Aabb, mask: u32) -> Option<u32> {
    let mut out = mask;
    for (i, plane) in planes.iter().enumerate().take(MAX_PLANES) {
        let bit = 1_u32 << i;
        if mask & bit == 0 {
            continue;
        }
        match classify(plane, aabb) {
            PlaneSide::Outside => return None,
            PlaneSide::Inside => out &= !bit,
            PlaneSide::Straddling => {}
        }
    }
    Some(out)
}

/// Mask with one bit set per plane, for the first call to [`clip_mask`].
#[must_use]
pub fn full_mask(plane_count: usize) -> u32 {
    if plane_count >= MAX_PLANES {
        u32::MAX
    } else {
        (1_u32 << plane_count) - 1
    }
}
