//! Affine transforms and the closed-form triangle-to-triangle solve

use crate::error::{WarpError, WarpResult};
use crate::geometry::{Point2D, AREA_EPSILON};

/// 2D affine transformation.
///
/// Stores six coefficients representing the matrix
///
/// ```text
///   | a  c  e |
///   | b  d  f |
///   | 0  0  1 |
/// ```
///
/// so `x' = a*x + c*y + e` and `y' = b*x + d*y + f`. This is the same
/// argument order a 2D canvas `setTransform` takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Coefficients as `[a, b, c, d, e, f]`
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compute the unique affine map taking `src[k]` onto `dst[k]` for k = 0..3.
    ///
    /// Works on edge vectors relative to the first vertex, which reduces the
    /// problem to two 2x2 solves sharing one determinant (Cramer's rule).
    /// Fails with [`WarpError::DegenerateTriangle`] when the source vertices
    /// are collinear or coincident.
    pub fn from_triangles(src: &[Point2D; 3], dst: &[Point2D; 3]) -> WarpResult<Self> {
        let [s0, s1, s2] = *src;
        let [d0, d1, d2] = *dst;

        let dx1 = s1.x - s0.x;
        let dy1 = s1.y - s0.y;
        let dx2 = s2.x - s0.x;
        let dy2 = s2.y - s0.y;

        let du1 = d1.x - d0.x;
        let dv1 = d1.y - d0.y;
        let du2 = d2.x - d0.x;
        let dv2 = d2.y - d0.y;

        let det = dx1 * dy2 - dx2 * dy1;
        // Written so a NaN determinant is rejected as well
        if !(det.abs() >= AREA_EPSILON) {
            return Err(WarpError::DegenerateTriangle);
        }

        let a = (du1 * dy2 - du2 * dy1) / det;
        let b = (dv1 * dy2 - dv2 * dy1) / det;
        let c = (du2 * dx1 - du1 * dx2) / det;
        let d = (dv2 * dx1 - dv1 * dx2) / det;
        let e = d0.x - a * s0.x - c * s0.y;
        let f = d0.y - b * s0.x - d * s0.y;

        Ok(Self::new(a, b, c, d, e, f))
    }

    /// Map a point through the transform
    #[inline]
    pub fn apply(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Determinant of the linear part
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the linear part is singular
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if !(det.abs() >= AREA_EPSILON) {
            return None;
        }
        let inv = 1.0 / det;
        let a = self.d * inv;
        let b = -self.b * inv;
        let c = -self.c * inv;
        let d = self.a * inv;
        let e = -(a * self.e + c * self.f);
        let f = -(b * self.e + d * self.f);
        Some(Self::new(a, b, c, d, e, f))
    }

    /// Transform that applies `self` first and then `next`
    pub fn then(&self, next: &AffineTransform) -> Self {
        Self::new(
            next.a * self.a + next.c * self.b,
            next.b * self.a + next.d * self.b,
            next.a * self.c + next.c * self.d,
            next.b * self.c + next.d * self.d,
            next.a * self.e + next.c * self.f + next.e,
            next.b * self.e + next.d * self.f + next.f,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Coefficient-wise comparison within `eps`
    pub fn approx_eq(&self, other: &AffineTransform, eps: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(x, y)| (x - y).abs() <= eps)
    }
}
