//! Core geometry types and hit-testing helpers.
//!
//! Everything here works in image coordinates. Thresholds passed to the
//! nearest-vertex/edge queries are expected to already be converted from
//! device pixels (divide by the current zoom scale).

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

// ============================================================================
// Point
// ============================================================================

/// A 2D point (or displacement) in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Dot product when both points are treated as vectors.
    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Whether this displacement is non-zero.
    pub fn is_nonzero(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;

    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

// ============================================================================
// Size and Rect
// ============================================================================

/// Width and height of an image or widget.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero (no image loaded).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points, in any order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the rectangle (edges included).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Tolerance used for boundary-inclusive containment.
const BOUNDARY_EPSILON: f32 = 1e-4;

/// Euclidean distance between two points.
pub fn distance(p: Point, q: Point) -> f32 {
    p.distance_to(&q)
}

/// Even-odd point-in-polygon test.
///
/// Points lying on an edge count as inside. Fewer than 3 vertices never
/// contain anything.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    if (0..n).any(|i| {
        let foot = foot_on_segment(point, vertices[i], vertices[(i + 1) % n]);
        point.distance_to(&foot) <= BOUNDARY_EPSILON
    }) {
        return true;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Index of the vertex nearest to `point`, if it lies within `threshold`.
pub fn closest_vertex(point: Point, vertices: &[Point], threshold: f32) -> Option<usize> {
    vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.distance_to(&point)))
        .filter(|(_, d)| *d <= threshold)
        .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

/// Result of an edge hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    /// Index of the edge, i.e. the segment from vertex `index` to `index + 1`
    /// (wrapping to vertex 0 for the last edge).
    pub index: usize,
    /// Foot of the perpendicular from the query point, clamped to the segment.
    pub foot: Point,
    /// Distance from the query point to `foot`.
    pub distance: f32,
}

/// Nearest edge of the closed polygon `vertices` within `threshold`.
///
/// Ties resolve to the lower edge index.
pub fn closest_edge(point: Point, vertices: &[Point], threshold: f32) -> Option<EdgeHit> {
    let n = vertices.len();
    if n < 2 {
        return None;
    }

    let mut best: Option<EdgeHit> = None;
    for i in 0..n {
        let foot = foot_on_segment(point, vertices[i], vertices[(i + 1) % n]);
        let d = point.distance_to(&foot);
        if d > threshold {
            continue;
        }
        if best.is_none_or(|b| d < b.distance) {
            best = Some(EdgeHit {
                index: i,
                foot,
                distance: d,
            });
        }
    }
    best
}

/// Perpendicular foot of `p` on segment `a`-`b`, clamped to the segment ends.
pub fn foot_on_segment(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let len_sq = ab.dot(&ab);
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Clamp a point into `[0, width] x [0, height]`.
///
/// Returns the clamped point and whether it had to be moved.
pub fn bounded_by(point: Point, size: Size) -> (Point, bool) {
    let clamped = Point::new(
        point.x.clamp(0.0, size.width.max(0.0)),
        point.y.clamp(0.0, size.height.max(0.0)),
    );
    (clamped, clamped != point)
}

/// Whether `point` lies within `[0, width] x [0, height]`.
pub fn is_within(point: Point, size: Size) -> bool {
    point.x >= 0.0 && point.x <= size.width && point.y >= 0.0 && point.y <= size.height
}

/// Axis-aligned bounding rectangle of the vertices, if any.
pub fn bounding_rect(vertices: &[Point]) -> Option<Rect> {
    let first = vertices.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &vertices[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Arithmetic mean of the vertices.
pub fn centroid(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let sum = vertices.iter().fold(Point::ZERO, |acc, p| acc + *p);
    Some(sum / vertices.len() as f32)
}

/// Whether four vertices form an axis-aligned rectangle in the winding
/// produced by rectangle creation: vertex 1 shares y with vertex 0 and
/// vertex 3 shares x with vertex 0.
pub fn is_axis_aligned_rect(vertices: &[Point]) -> bool {
    match vertices {
        [a, b, c, d] => a.y == b.y && b.x == c.x && c.y == d.y && d.x == a.x,
        _ => false,
    }
}

/// Corner of a square anchored at `anchor` towards `target`.
///
/// The side is the larger of the two axis deltas; the signs of the deltas
/// pick the quadrant (a zero delta counts as positive).
pub fn square_corner(anchor: Point, target: Point) -> Point {
    let dx = target.x - anchor.x;
    let dy = target.y - anchor.y;
    let side = dx.abs().max(dy.abs());
    let sx = if dx < 0.0 { -1.0 } else { 1.0 };
    let sy = if dy < 0.0 { -1.0 } else { 1.0 };
    Point::new(anchor.x + sx * side, anchor.y + sy * side)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_distance() {
        assert!(approx_eq(
            distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            5.0
        ));
    }

    #[test]
    fn test_point_in_polygon_centroid_and_far_point() {
        let polygons = vec![
            square(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(20.0, 0.0),
                Point::new(10.0, 15.0),
            ],
            vec![
                Point::new(5.0, 0.0),
                Point::new(10.0, 4.0),
                Point::new(8.0, 10.0),
                Point::new(2.0, 10.0),
                Point::new(0.0, 4.0),
            ],
        ];
        for vertices in polygons {
            let c = centroid(&vertices).unwrap();
            assert!(point_in_polygon(c, &vertices), "centroid {:?}", c);
            let rect = bounding_rect(&vertices).unwrap();
            let far = Point::new(rect.x + rect.width * 10.0 + 100.0, rect.y - 100.0);
            assert!(!point_in_polygon(far, &vertices));
        }
    }

    #[test]
    fn test_point_in_polygon_boundary_inclusive() {
        let sq = square();
        assert!(point_in_polygon(Point::new(10.0, 5.0), &sq));
        assert!(point_in_polygon(Point::new(0.0, 0.0), &sq));
        assert!(point_in_polygon(Point::new(5.0, 10.0), &sq));
        assert!(!point_in_polygon(Point::new(10.5, 5.0), &sq));
    }

    #[test]
    fn test_point_in_polygon_degenerate() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(!point_in_polygon(Point::new(5.0, 0.0), &line));
        assert!(!point_in_polygon(Point::new(5.0, 0.0), &[]));
    }

    #[test]
    fn test_point_in_concave_polygon() {
        // U shape opening upwards
        let u = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 7.0),
            Point::new(7.0, 7.0),
            Point::new(7.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(!point_in_polygon(Point::new(5.0, 3.0), &u));
        assert!(point_in_polygon(Point::new(1.5, 3.0), &u));
        assert!(point_in_polygon(Point::new(5.0, 9.0), &u));
    }

    #[test]
    fn test_closest_vertex_exact_hits() {
        let sq = square();
        for (i, v) in sq.iter().enumerate() {
            assert_eq!(closest_vertex(*v, &sq, 1.0), Some(i));
        }
    }

    #[test]
    fn test_closest_vertex_threshold() {
        let sq = square();
        assert_eq!(closest_vertex(Point::new(1.0, 1.0), &sq, 2.0), Some(0));
        assert_eq!(closest_vertex(Point::new(5.0, 5.0), &sq, 2.0), None);
        // Nearest wins, not first within range
        assert_eq!(closest_vertex(Point::new(6.0, 0.0), &sq, 20.0), Some(1));
    }

    #[test]
    fn test_closest_edge_on_top_edge() {
        let hit = closest_edge(Point::new(5.0, 0.0), &square(), 1.0).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.foot, Point::new(5.0, 0.0));
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_closest_edge_wraps_last_to_first() {
        let hit = closest_edge(Point::new(-1.0, 5.0), &square(), 2.0).unwrap();
        assert_eq!(hit.index, 3);
        assert!(approx_eq(hit.foot.x, 0.0));
        assert!(approx_eq(hit.foot.y, 5.0));
        assert!(approx_eq(hit.distance, 1.0));
    }

    #[test]
    fn test_closest_edge_clamps_foot_to_segment() {
        let foot = foot_on_segment(
            Point::new(15.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(foot, Point::new(10.0, 0.0));
        assert!(closest_edge(Point::new(5.0, 5.0), &square(), 2.0).is_none());
    }

    #[test]
    fn test_bounded_by() {
        let size = Size::new(200.0, 200.0);
        assert_eq!(
            bounded_by(Point::new(-5.0, 50.0), size),
            (Point::new(0.0, 50.0), true)
        );
        assert_eq!(
            bounded_by(Point::new(250.0, 210.0), size),
            (Point::new(200.0, 200.0), true)
        );
        assert_eq!(
            bounded_by(Point::new(200.0, 0.0), size),
            (Point::new(200.0, 0.0), false)
        );
    }

    #[test]
    fn test_bounding_rect() {
        let rect = bounding_rect(&[
            Point::new(3.0, 8.0),
            Point::new(-2.0, 4.0),
            Point::new(7.0, 1.0),
        ])
        .unwrap();
        assert_eq!(rect, Rect::new(-2.0, 1.0, 9.0, 7.0));
        assert!(bounding_rect(&[]).is_none());
    }

    #[test]
    fn test_rect_from_corners() {
        let a = Rect::from_corners(Point::new(10.0, 20.0), Point::new(50.0, 80.0));
        let b = Rect::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(a, b);
        assert_eq!(a.area(), 2400.0);
        assert!(a.contains(&Point::new(10.0, 20.0)));
    }

    #[test]
    fn test_square_corner_uses_larger_delta() {
        assert_eq!(
            square_corner(Point::new(0.0, 0.0), Point::new(10.0, 7.0)),
            Point::new(10.0, 10.0)
        );
        assert_eq!(
            square_corner(Point::new(0.0, 0.0), Point::new(-3.0, 8.0)),
            Point::new(-8.0, 8.0)
        );
    }

    #[test]
    fn test_is_axis_aligned_rect() {
        assert!(is_axis_aligned_rect(&square()));
        let mut skewed = square();
        skewed[2].x = 11.0;
        assert!(!is_axis_aligned_rect(&skewed));
        assert!(!is_axis_aligned_rect(&square()[..3]));
    }
}
