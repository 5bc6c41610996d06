//! Shared geometry calculations for annotations and templates
//!
//! Everything here is plain math shared by the compositors and by hit
//! testing, so preview, export and selection agree on every shape.

use crate::domain::{ArrowHead, Point};

/// Arrow geometry constants
pub mod arrow {
    /// Minimum arrow length to be drawn
    pub const MIN_LENGTH: f32 = 2.0;
    /// Triangle and curved heads: head length multiplier and floor
    pub const TRIANGLE_LENGTH_FACTOR: f32 = 5.0;
    pub const TRIANGLE_MIN_LENGTH: f32 = 16.0;
    pub const TRIANGLE_HALF_ANGLE: f32 = 45.0;
    pub const CURVED_HALF_ANGLE: f32 = 36.0;
    /// Chevron head
    pub const CHEVRON_LENGTH_FACTOR: f32 = 4.0;
    pub const CHEVRON_MIN_LENGTH: f32 = 14.0;
    pub const CHEVRON_HALF_ANGLE: f32 = 45.0;
    /// Sketch head is a wider chevron
    pub const SKETCH_LENGTH_FACTOR: f32 = 7.0;
    pub const SKETCH_MIN_LENGTH: f32 = 20.0;
    pub const SKETCH_HALF_ANGLE: f32 = 50.0;
    /// Sideways bend of curved shafts relative to their length
    pub const CURVE_BEND: f32 = 0.25;
    pub const SKETCH_BEND: f32 = 0.12;
}

/// Measurement geometry constants
pub mod measurement {
    pub const HEAD_HALF_ANGLE: f32 = 30.0;
    pub const HEAD_LENGTH_FACTOR: f32 = 4.0;
    pub const HEAD_MIN_LENGTH: f32 = 12.0;
    /// Label text size relative to the annotation font size
    pub const LABEL_FONT_SCALE: f32 = 0.75;
}

/// Shape (rectangle/circle) geometry constants
pub mod shape {
    /// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
    pub const BEZIER_K: f32 = 0.552_284_8;
}

/// Continuous-corner rectangle constants
pub mod squircle {
    /// Distance from the corner where the curve leaves the straight edge
    pub const EXTENT: f32 = 1.28;
    /// Distance from the corner of both bezier control points
    pub const CONTROL: f32 = 0.4477;
}

/// Text bubble proportions relative to font size
pub mod bubble {
    pub const PAD_X: f32 = 0.55;
    pub const PAD_Y: f32 = 0.25;
    pub const CORNER: f32 = 0.45;
    pub const LINE_HEIGHT: f32 = 1.2;
    /// Average glyph advance used when no font metrics are available
    pub const AVG_ADVANCE: f32 = 0.55;
}

/// Normalize min/max coordinates from arbitrary start/end points
#[inline]
pub fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
    let (min_x, max_x) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    let (min_y, max_y) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    (min_x, min_y, max_x, max_y)
}

/// Calculate ellipse center and radii from bounding box
#[inline]
pub fn ellipse_from_bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> (f32, f32, f32, f32) {
    let cx = (min_x + max_x) * 0.5;
    let cy = (min_y + max_y) * 0.5;
    let rx = ((max_x - min_x) * 0.5).max(1.0);
    let ry = ((max_y - min_y) * 0.5).max(1.0);
    (cx, cy, rx, ry)
}

/// Unit vector from `a` to `b`, `None` when the points coincide
pub fn direction(a: Point, b: Point) -> Option<(f32, f32)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-4 {
        return None;
    }
    Some((dx / len, dy / len))
}

/// Distance from `p` to the segment `a`-`b`
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq < 1e-6 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * vx + (p.y - a.y) * vy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + vx * t, a.y + vy * t))
}

/// Two points of an arrow head: the tip pulled back along `dir` by `length`
/// and rotated by plus and minus `half_angle` degrees
pub fn head_points(tip: Point, dir: (f32, f32), length: f32, half_angle: f32) -> (Point, Point) {
    let a = half_angle.to_radians();
    let (cos_a, sin_a) = (a.cos(), a.sin());
    let (bx, by) = (-dir.0, -dir.1);
    let left = Point::new(
        tip.x + (bx * cos_a - by * sin_a) * length,
        tip.y + (bx * sin_a + by * cos_a) * length,
    );
    let right = Point::new(
        tip.x + (bx * cos_a + by * sin_a) * length,
        tip.y + (-bx * sin_a + by * cos_a) * length,
    );
    (left, right)
}

/// Path of an arrow shaft
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shaft {
    Straight(Point, Point),
    Quad(Point, Point, Point),
    Cubic(Point, Point, Point, Point),
}

/// Resolved arrow geometry in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowGeometry {
    pub shaft: Shaft,
    /// Left barb, tip, right barb
    pub head: [Point; 3],
    /// Filled triangle head, or open chevron stroked with the shaft
    pub filled: bool,
}

/// Geometry for an arrow of the given head variant
pub fn arrow_geometry(
    start: Point,
    end: Point,
    stroke_width: f32,
    variant: ArrowHead,
) -> Option<ArrowGeometry> {
    let length = start.distance(end);
    if length < arrow::MIN_LENGTH {
        return None;
    }
    let dir = direction(start, end)?;
    let perp = (-dir.1, dir.0);

    let geometry = match variant {
        ArrowHead::Chevron => {
            let head_len = (stroke_width * arrow::CHEVRON_LENGTH_FACTOR).max(arrow::CHEVRON_MIN_LENGTH);
            let (l, r) = head_points(end, dir, head_len, arrow::CHEVRON_HALF_ANGLE);
            // the open V meets at the tip, so only the round cap is pulled back
            let back = (stroke_width * 0.5).min(length * 0.5);
            let shaft_end = Point::new(end.x - dir.0 * back, end.y - dir.1 * back);
            ArrowGeometry {
                shaft: Shaft::Straight(start, shaft_end),
                head: [l, end, r],
                filled: false,
            }
        }
        ArrowHead::Triangle => {
            let head_len =
                (stroke_width * arrow::TRIANGLE_LENGTH_FACTOR).max(arrow::TRIANGLE_MIN_LENGTH);
            let (l, r) = head_points(end, dir, head_len, arrow::TRIANGLE_HALF_ANGLE);
            let depth = (head_len * arrow::TRIANGLE_HALF_ANGLE.to_radians().cos()).min(length);
            let shaft_end = Point::new(end.x - dir.0 * depth, end.y - dir.1 * depth);
            ArrowGeometry {
                shaft: Shaft::Straight(start, shaft_end),
                head: [l, end, r],
                filled: true,
            }
        }
        ArrowHead::Curved => {
            let bend = length * arrow::CURVE_BEND;
            let mid = start.midpoint(end);
            let ctrl = Point::new(mid.x + perp.0 * bend, mid.y + perp.1 * bend);
            let tangent = direction(ctrl, end).unwrap_or(dir);
            let head_len =
                (stroke_width * arrow::TRIANGLE_LENGTH_FACTOR).max(arrow::TRIANGLE_MIN_LENGTH);
            let (l, r) = head_points(end, tangent, head_len, arrow::CURVED_HALF_ANGLE);
            let depth = (head_len * arrow::CURVED_HALF_ANGLE.to_radians().cos()).min(length);
            let shaft_end = Point::new(end.x - tangent.0 * depth, end.y - tangent.1 * depth);
            ArrowGeometry {
                shaft: Shaft::Quad(start, ctrl, shaft_end),
                head: [l, end, r],
                filled: true,
            }
        }
        ArrowHead::Sketch => {
            let bend = length * arrow::SKETCH_BEND;
            let c1 = Point::new(
                start.x + dir.0 * length / 3.0 + perp.0 * bend,
                start.y + dir.1 * length / 3.0 + perp.1 * bend,
            );
            let c2 = Point::new(
                start.x + dir.0 * length * 2.0 / 3.0 - perp.0 * bend,
                start.y + dir.1 * length * 2.0 / 3.0 - perp.1 * bend,
            );
            let tangent = direction(c2, end).unwrap_or(dir);
            let head_len =
                (stroke_width * arrow::SKETCH_LENGTH_FACTOR).max(arrow::SKETCH_MIN_LENGTH);
            let (l, r) = head_points(end, tangent, head_len, arrow::SKETCH_HALF_ANGLE);
            ArrowGeometry {
                shaft: Shaft::Cubic(start, c1, c2, end),
                head: [l, end, r],
                filled: false,
            }
        }
    };
    Some(geometry)
}

/// Measurement arrow: a straight shaft between two triangular heads.
/// Returns the shaft and the two heads as (left, tip, right).
pub fn measurement_geometry(
    start: Point,
    end: Point,
    stroke_width: f32,
) -> Option<((Point, Point), [Point; 3], [Point; 3])> {
    let length = start.distance(end);
    if length < arrow::MIN_LENGTH {
        return None;
    }
    let dir = direction(start, end)?;
    let head_len = (stroke_width * measurement::HEAD_LENGTH_FACTOR)
        .max(measurement::HEAD_MIN_LENGTH)
        .min(length * 0.5);
    let depth = head_len * measurement::HEAD_HALF_ANGLE.to_radians().cos();

    let (el, er) = head_points(end, dir, head_len, measurement::HEAD_HALF_ANGLE);
    let back = (-dir.0, -dir.1);
    let (sl, sr) = head_points(start, back, head_len, measurement::HEAD_HALF_ANGLE);

    let shaft = (
        Point::new(start.x + dir.0 * depth, start.y + dir.1 * depth),
        Point::new(end.x - dir.0 * depth, end.y - dir.1 * depth),
    );
    Some((shaft, [sl, start, sr], [el, end, er]))
}

/// Label for a measurement: distance in logical points
pub fn measurement_label(start: Point, end: Point, backing_scale: f32) -> String {
    let scale = if backing_scale > 0.0 { backing_scale } else { 1.0 };
    format!("{} px", (start.distance(end) / scale).round() as i64)
}

/// Two passes of 1-2-1 moving-average smoothing. Endpoints are kept.
pub fn smooth_polyline(points: &[Point]) -> Vec<Point> {
    let mut current = points.to_vec();
    for _ in 0..2 {
        if current.len() < 3 {
            break;
        }
        let mut next = Vec::with_capacity(current.len());
        next.push(current[0]);
        for w in current.windows(3) {
            next.push(Point::new(
                (w[0].x + 2.0 * w[1].x + w[2].x) * 0.25,
                (w[0].y + 2.0 * w[1].y + w[2].y) * 0.25,
            ));
        }
        next.push(current[current.len() - 1]);
        current = next;
    }
    current
}

/// Clamp a squircle radius so opposite corners never overlap
pub fn squircle_radius(width: f32, height: f32, radius: f32) -> f32 {
    radius
        .max(0.0)
        .min(width.min(height) * 0.5 / squircle::EXTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_label_scenario() {
        let label = measurement_label(Point::new(0.0, 0.0), Point::new(300.0, 400.0), 2.0);
        assert_eq!(label, "250 px");
    }

    #[test]
    fn test_triangle_head_shortens_shaft() {
        let geo = arrow_geometry(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            4.0,
            ArrowHead::Triangle,
        )
        .unwrap();
        let Shaft::Straight(_, shaft_end) = geo.shaft else {
            panic!("triangle arrows have a straight shaft");
        };
        // head length 20, depth 20 * cos 45
        assert!((shaft_end.x - (100.0 - 20.0 * std::f32::consts::FRAC_1_SQRT_2)).abs() < 1e-3);
        assert!(geo.filled);
        // barbs sit symmetric about the shaft
        assert!((geo.head[0].y + geo.head[2].y).abs() < 1e-3);
        assert!(geo.head[0].x < 100.0 && geo.head[2].x < 100.0);
    }

    #[test]
    fn test_sketch_head_is_open_and_long() {
        let geo = arrow_geometry(
            Point::new(0.0, 0.0),
            Point::new(0.0, 200.0),
            2.0,
            ArrowHead::Sketch,
        )
        .unwrap();
        assert!(!geo.filled);
        assert!(matches!(geo.shaft, Shaft::Cubic(..)));
        assert!((geo.head[1].distance(geo.head[0]) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_short_arrow_is_rejected() {
        assert!(
            arrow_geometry(Point::new(1.0, 1.0), Point::new(1.5, 1.0), 4.0, ArrowHead::Chevron)
                .is_none()
        );
    }

    #[test]
    fn test_smoothing_keeps_endpoints() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 10.0),
        ];
        let smoothed = smooth_polyline(&pts);
        assert_eq!(smoothed.len(), pts.len());
        assert_eq!(smoothed[0], pts[0]);
        assert_eq!(smoothed[3], pts[3]);
        assert!(smoothed[1].y < 10.0);
    }

    #[test]
    fn test_point_segment_distance() {
        let d = point_segment_distance(
            Point::new(5.0, 5.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(d, 5.0);
        let beyond = point_segment_distance(
            Point::new(13.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(beyond, 5.0);
    }
}
