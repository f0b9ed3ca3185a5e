// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distance helpers used by ports and item hit testing.
//!
//! All inputs and outputs are in the same (item-local) coordinate space.

use kurbo::{Point, Rect};

/// Euclidean distance between two points.
pub fn distance_point_point(p1: Point, p2: Point) -> f64 {
    p1.distance(p2)
}

/// Manhattan distance between two points. Cheaper, less precise; good
/// enough for threshold checks.
pub fn distance_point_point_fast(p1: Point, p2: Point) -> f64 {
    (p1.x - p2.x).abs() + (p1.y - p2.y).abs()
}

/// Distance from `point` to the segment `start`–`end`, plus the closest
/// point on the segment.
///
/// A degenerate segment (endpoints closer than 1e-2) falls back to the
/// start point.
pub fn distance_line_point(start: Point, end: Point, point: Point) -> (f64, Point) {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sqr = dx * dx + dy * dy;
    if len_sqr < 1e-4 {
        return (point.distance(start), start);
    }
    let proj = (dx * (point.x - start.x) + dy * (point.y - start.y)) / len_sqr;
    if proj < 0.0 {
        return (point.distance(start), start);
    }
    if proj > 1.0 {
        return (point.distance(end), end);
    }
    let closest = Point::new(start.x + proj * dx, start.y + proj * dy);
    (point.distance(closest), closest)
}

/// Distance from `point` to a rectangle: 0 inside, the (fast) border
/// distance outside.
pub fn distance_rectangle_point(rect: Rect, point: Point) -> f64 {
    distance_rectangle_border_point(rect, point).max(0.0)
}

/// Signed distance from `point` to the border of `rect`: negative inside,
/// the Manhattan-style gap outside.
pub fn distance_rectangle_border_point(rect: Rect, point: Point) -> f64 {
    if rect.x0 < point.x && point.x < rect.x1 && rect.y0 < point.y && point.y < rect.y1 {
        let inset = (point.x - rect.x0)
            .min(rect.x1 - point.x)
            .min(point.y - rect.y0)
            .min(rect.y1 - point.y);
        return -inset;
    }
    let mut dx = 0.0;
    let mut dy = 0.0;
    if point.x < rect.x0 {
        dx = rect.x0 - point.x;
    } else if point.x > rect.x1 {
        dx = point.x - rect.x1;
    }
    if point.y < rect.y0 {
        dy = rect.y0 - point.y;
    } else if point.y > rect.y1 {
        dy = point.y - rect.y1;
    }
    dx + dy
}
