//! Plain geometric value types shared by the warp engine

use serde::{Deserialize, Serialize};

use crate::error::{WarpError, WarpResult};

/// Tolerance used when deciding whether three points enclose any area
pub const AREA_EPSILON: f64 = 1e-8;

/// A 2D point in pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Scale both coordinates, e.g. canvas -> full resolution
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Twice the signed area of triangle `(p0, p1, p2)`.
///
/// Positive for clockwise winding in image coordinates (y pointing down).
#[inline]
pub fn cross(p0: Point2D, p1: Point2D, p2: Point2D) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// True when the three points enclose (near-)zero area
pub fn is_degenerate_triangle(tri: &[Point2D; 3]) -> bool {
    cross(tri[0], tri[1], tri[2]).abs() < AREA_EPSILON
}

/// Corner labels in the order the quadrilateral stores them
pub const CORNER_NAMES: [&str; 4] = ["Top-Left", "Top-Right", "Bottom-Right", "Bottom-Left"];

/// Four points ordered Top-Left, Top-Right, Bottom-Right, Bottom-Left.
///
/// The order decides the triangle split and edge correspondence. It is a
/// caller contract: nothing here sorts or re-orders the corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quadrilateral {
    pub corners: [Point2D; 4],
}

impl Quadrilateral {
    pub const TOP_LEFT: usize = 0;
    pub const TOP_RIGHT: usize = 1;
    pub const BOTTOM_RIGHT: usize = 2;
    pub const BOTTOM_LEFT: usize = 3;

    pub fn new(tl: Point2D, tr: Point2D, br: Point2D, bl: Point2D) -> Self {
        Self {
            corners: [tl, tr, br, bl],
        }
    }

    /// Build from a slice holding exactly four points
    pub fn from_slice(points: &[Point2D]) -> WarpResult<Self> {
        match points {
            [tl, tr, br, bl] => Ok(Self::new(*tl, *tr, *br, *bl)),
            _ => Err(WarpError::InvalidPointCount {
                expected: 4,
                actual: points.len(),
            }),
        }
    }

    /// Axis-aligned rectangle `(0,0)-(width,height)`, i.e. the source image frame
    pub fn from_size(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        Self::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(w, 0.0),
            Point2D::new(w, h),
            Point2D::new(0.0, h),
        )
    }

    pub fn top_left(&self) -> Point2D {
        self.corners[Self::TOP_LEFT]
    }

    pub fn top_right(&self) -> Point2D {
        self.corners[Self::TOP_RIGHT]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.corners[Self::BOTTOM_RIGHT]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.corners[Self::BOTTOM_LEFT]
    }

    /// Upper-left triangle (TL, TR, BL)
    pub fn upper_triangle(&self) -> [Point2D; 3] {
        [self.top_left(), self.top_right(), self.bottom_left()]
    }

    /// Lower-right triangle (TR, BR, BL)
    pub fn lower_triangle(&self) -> [Point2D; 3] {
        [self.top_right(), self.bottom_right(), self.bottom_left()]
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(Point2D::is_finite)
    }

    /// Scale every corner by the same factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            corners: self.corners.map(|p| p.scaled(factor)),
        }
    }

    /// Convex and simple in the stored order.
    ///
    /// All four turns must share one sign and none may be (near-)zero.
    /// Self-intersecting "bow-tie" orders fail because the turn signs flip.
    pub fn is_convex(&self) -> bool {
        let mut sign = 0.0f64;
        for i in 0..4 {
            let turn = cross(
                self.corners[i],
                self.corners[(i + 1) % 4],
                self.corners[(i + 2) % 4],
            );
            if turn.abs() < AREA_EPSILON {
                return false;
            }
            if sign == 0.0 {
                sign = turn.signum();
            } else if turn.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Axis-aligned bounds as `(min, max)`
    pub fn bounds(&self) -> (Point2D, Point2D) {
        bounds_of(&self.corners)
    }
}

/// Axis-aligned bounds of a point set as `(min, max)`
pub fn bounds_of(points: &[Point2D]) -> (Point2D, Point2D) {
    let mut min = Point2D::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Point-in-convex-polygon test with a top-left fill rule.
///
/// A point strictly inside is contained. A point exactly on an edge is
/// contained only when that edge is a "top" or "left" edge after the polygon
/// is brought to positive winding. An edge shared by two adjacent polygons
/// runs in opposite directions in each, so the point belongs to exactly one
/// of them. Winding may be either direction.
pub fn convex_polygon_contains(polygon: &[Point2D], p: Point2D) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let area: f64 = (1..polygon.len() - 1)
        .map(|i| cross(polygon[0], polygon[i], polygon[i + 1]))
        .sum();
    if area == 0.0 || !area.is_finite() {
        return false;
    }
    let orient = area.signum();

    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let c = cross(a, b, p) * orient;
        if c < 0.0 {
            return false;
        }
        if c == 0.0 && !is_top_left_edge(a, b, orient) {
            return false;
        }
    }
    true
}

/// Edge `a -> b` of a polygon with winding `orient` owns the points on it
#[inline]
fn is_top_left_edge(a: Point2D, b: Point2D, orient: f64) -> bool {
    let dx = (b.x - a.x) * orient;
    let dy = (b.y - a.y) * orient;
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quad() -> Quadrilateral {
        Quadrilateral::new(
            Point2D::new(10.0, 10.0),
            Point2D::new(210.0, 20.0),
            Point2D::new(200.0, 120.0),
            Point2D::new(20.0, 110.0),
        )
    }

    #[test]
    fn test_from_slice_requires_four_points() {
        let pts = [Point2D::new(0.0, 0.0); 3];
        assert_eq!(
            Quadrilateral::from_slice(&pts),
            Err(WarpError::InvalidPointCount {
                expected: 4,
                actual: 3
            })
        );
        assert!(Quadrilateral::from_slice(&[Point2D::default(); 4]).is_ok());
    }

    #[test]
    fn test_from_size_corners() {
        let q = Quadrilateral::from_size(100, 50);
        assert_eq!(q.top_right(), Point2D::new(100.0, 0.0));
        assert_eq!(q.bottom_right(), Point2D::new(100.0, 50.0));
        assert_eq!(q.bottom_left(), Point2D::new(0.0, 50.0));
    }

    #[test]
    fn test_triangles_share_diagonal() {
        let q = sample_quad();
        let upper = q.upper_triangle();
        let lower = q.lower_triangle();
        assert_eq!(upper[1], lower[0]);
        assert_eq!(upper[2], lower[2]);
    }

    #[test]
    fn test_convexity() {
        assert!(sample_quad().is_convex());

        // TR and BR swapped -> bow-tie
        let q = sample_quad();
        let bowtie = Quadrilateral::new(q.top_left(), q.bottom_right(), q.top_right(), q.bottom_left());
        assert!(!bowtie.is_convex());

        // Dart shape: BR pulled inside
        let dart = Quadrilateral::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(30.0, 30.0),
            Point2D::new(0.0, 100.0),
        );
        assert!(!dart.is_convex());
    }

    #[test]
    fn test_degenerate_triangle() {
        let collinear = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        ];
        assert!(is_degenerate_triangle(&collinear));
        assert!(!is_degenerate_triangle(&sample_quad().upper_triangle()));
    }

    #[test]
    fn test_polygon_contains_edges() {
        let tri = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ];
        assert!(convex_polygon_contains(&tri, Point2D::new(2.0, 2.0)));
        assert!(!convex_polygon_contains(&tri, Point2D::new(6.0, 6.0)));

        let mut reversed = tri;
        reversed.reverse();
        assert!(convex_polygon_contains(&reversed, Point2D::new(2.0, 2.0)));
        assert!(!convex_polygon_contains(&reversed, Point2D::new(6.0, 6.0)));
    }

    #[test]
    fn test_shared_edge_belongs_to_one_polygon() {
        // Square (0,0)-(10,10) split on the TR-BL diagonal
        let upper = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ];
        let lower = [
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ];
        let mut upper_rev = upper;
        upper_rev.reverse();

        for p in [
            Point2D::new(5.0, 5.0),
            Point2D::new(2.5, 7.5),
            Point2D::new(9.0, 1.0),
        ] {
            let hits = [&upper[..], &lower[..]]
                .iter()
                .filter(|poly| convex_polygon_contains(poly, p))
                .count();
            assert_eq!(hits, 1, "{:?} covered {} times", p, hits);
            // Winding of one polygon must not change ownership
            assert_eq!(
                convex_polygon_contains(&upper, p),
                convex_polygon_contains(&upper_rev, p)
            );
        }
    }

    #[test]
    fn test_bounds() {
        let (min, max) = sample_quad().bounds();
        assert_eq!(min, Point2D::new(10.0, 10.0));
        assert_eq!(max, Point2D::new(210.0, 120.0));
    }
}
