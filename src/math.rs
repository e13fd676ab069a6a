//! Geometry used by the coordinator and the reference simulation.

use cgmath::{Point2, Vector2};
use cgmath::prelude::*;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Euclidean distance between two points, in m.
pub fn distance(a: Point2d, b: Point2d) -> f64 {
    a.distance(b)
}

/// Linearly interpolates between two points.
///
/// # Parameters
/// * `start` - The point returned for `t == 0`
/// * `end` - The point returned for `t == 1`
/// * `t` - The interpolation factor, clamped to `[0, 1]`
pub fn lerp(start: Point2d, end: Point2d, t: f64) -> Point2d {
    start + (end - start) * t.clamp(0.0, 1.0)
}
