use crate::error::{FlattenError, Result};
use crate::model::Circle3;
use nalgebra::Point3;

// Keeps an exact multiple of the spacing from rounding up to an extra interval.
const RATIO_SLACK: f64 = 1e-9;

/// Most intervals one arc may be split into; finer spacings are rejected.
pub const MAX_INTERVALS: usize = 1_000_000;

/// Samples the arc `circle[first..=last]` at approximately `spacing` arc length.
///
/// Sampling is uniform in arc length, not curvature adaptive. Both endpoints
/// are always included, so even an arc shorter than `spacing` yields two points.
/// A spacing that would need more than [`MAX_INTERVALS`] intervals fails with
/// [`FlattenError::InvalidSpacing`].
pub fn discretize_arc(
    circle: &Circle3,
    first: f64,
    last: f64,
    spacing: f64,
) -> Result<Vec<Point3<f64>>> {
    let intervals = interval_count(circle.arc_length(first, last), spacing)?;
    let step = (last - first) / intervals as f64;

    let mut points = Vec::with_capacity(intervals + 1);
    for i in 0..intervals {
        points.push(circle.point_at(first + step * i as f64));
    }
    points.push(circle.point_at(last));
    Ok(points)
}

/// Number of sample points `discretize_arc` produces for an arc of `length`.
pub fn sample_count(length: f64, spacing: f64) -> Result<usize> {
    Ok(interval_count(length, spacing)? + 1)
}

fn interval_count(length: f64, spacing: f64) -> Result<usize> {
    if !(spacing > 0.0 && spacing.is_finite()) {
        return Err(FlattenError::InvalidSpacing(spacing));
    }
    if !length.is_finite() || length <= 0.0 {
        return Ok(1);
    }
    let ratio = (length / spacing) - RATIO_SLACK;
    if ratio > MAX_INTERVALS as f64 {
        return Err(FlattenError::InvalidSpacing(spacing));
    }
    Ok(ratio.ceil().max(1.0) as usize)
}
