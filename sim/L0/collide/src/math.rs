//! Scalar and vector helpers with defined fallbacks.
//!
//! Every helper here maps degenerate input to a finite value so NaN never
//! leaks into contact data.

use nalgebra::Vector3;

use crate::TOLERANCE;

/// Square root that returns `0.0` for negative or NaN input.
#[must_use]
#[inline]
pub fn sqrt(x: f64) -> f64 {
    if x > 0.0 {
        x.sqrt()
    } else {
        0.0
    }
}

/// Reciprocal square root.
///
/// Returns `0.0` when `x` is too small to invert, so callers scaling a vector
/// by the result collapse it instead of blowing up.
#[must_use]
#[inline]
pub fn inv_sqrt(x: f64) -> f64 {
    if x > TOLERANCE * TOLERANCE {
        1.0 / x.sqrt()
    } else {
        0.0
    }
}

/// Normalize a vector, or `None` if it is too short to have a direction.
#[must_use]
#[inline]
pub fn try_normalize(v: &Vector3<f64>) -> Option<Vector3<f64>> {
    let norm_sq = v.norm_squared();
    if norm_sq > TOLERANCE * TOLERANCE && norm_sq.is_finite() {
        Some(v * inv_sqrt(norm_sq))
    } else {
        None
    }
}

/// Normalize a vector, returning `fallback` when it is degenerate.
#[must_use]
#[inline]
pub fn normalize_or(v: &Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    try_normalize(v).unwrap_or(fallback)
}

/// Some unit vector perpendicular to `n`.
#[must_use]
pub fn any_perpendicular(n: &Vector3<f64>) -> Vector3<f64> {
    let helper = if n.x.abs() < 0.577 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    normalize_or(&n.cross(&helper), Vector3::z())
}
