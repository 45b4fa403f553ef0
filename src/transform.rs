//! Perspective (homography) estimation and the true-perspective renderer
//!
//! The default mockup path approximates the quad mapping with two affine
//! triangles (see [`crate::renderer`]). This module keeps the full projective
//! model alongside it: estimating the 8 homography coefficients from four
//! correspondences, and an optional renderer that resamples every covered
//! destination pixel through the inverse homography.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{WarpError, WarpResult};
use crate::geometry::{Point2D, Quadrilateral};
use crate::linalg::solve_linear_system;
use crate::raster::{bilinear_sample, blend_over};

/// Homogeneous weights at or below this are treated as points at infinity
const W_EPSILON: f64 = 1e-10;

/// Anything that maps source-image coordinates onto the destination quad
pub trait QuadMapping {
    /// Destination position of source point `p`, or `None` where the mapping
    /// is undefined
    fn map_point(&self, p: Point2D) -> Option<Point2D>;
}

/// The eight free coefficients of a 3x3 homography with `h33 = 1`.
///
/// Stored row-major as `[h11, h12, h13, h21, h22, h23, h31, h32]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomographyCoefficients {
    pub h: [f64; 8],
}

impl HomographyCoefficients {
    pub fn identity() -> Self {
        Self {
            h: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Full 3x3 matrix in row-major order
    pub fn to_matrix(&self) -> [f64; 9] {
        let h = &self.h;
        [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0]
    }

    /// Estimate the homography taking each `src[i]` to `dst[i]`.
    ///
    /// Both slices must hold exactly four points in Top-Left, Top-Right,
    /// Bottom-Right, Bottom-Left order. A singular system (collinear or
    /// coincident points) is reported as [`WarpError::DegenerateQuad`].
    pub fn estimate(src: &[Point2D], dst: &[Point2D]) -> WarpResult<Self> {
        for points in [src, dst] {
            if points.len() != 4 {
                return Err(WarpError::InvalidPointCount {
                    expected: 4,
                    actual: points.len(),
                });
            }
        }

        // For each correspondence (x,y) -> (x',y'):
        //   h11*x + h12*y + h13 - h31*x*x' - h32*y*x' = x'
        //   h21*x + h22*y + h23 - h31*x*y' - h32*y*y' = y'
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let Point2D { x, y } = src[i];
            let Point2D { x: xp, y: yp } = dst[i];

            let row1 = i * 2;
            let row2 = i * 2 + 1;

            a[row1] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
            b[row1] = xp;

            a[row2] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
            b[row2] = yp;
        }

        let h = solve_linear_system(a, b).map_err(|e| {
            debug!("Homography system rejected: {}", e);
            WarpError::DegenerateQuad
        })?;

        Ok(Self { h })
    }

    /// Estimate between two quadrilaterals
    pub fn between(src: &Quadrilateral, dst: &Quadrilateral) -> WarpResult<Self> {
        Self::estimate(&src.corners, &dst.corners)
    }

    /// Apply the homography, dividing by the homogeneous weight
    #[inline]
    pub fn apply(&self, p: Point2D) -> Option<Point2D> {
        let h = &self.h;
        let w = h[6] * p.x + h[7] * p.y + 1.0;
        if !(w.abs() > W_EPSILON) {
            return None;
        }
        Some(Point2D::new(
            (h[0] * p.x + h[1] * p.y + h[2]) / w,
            (h[3] * p.x + h[4] * p.y + h[5]) / w,
        ))
    }

    /// Homogeneous weight `w` at `p`; its sign tells which side of the
    /// horizon line the point falls on
    #[inline]
    pub fn weight(&self, p: Point2D) -> f64 {
        self.h[6] * p.x + self.h[7] * p.y + 1.0
    }
}

impl QuadMapping for HomographyCoefficients {
    fn map_point(&self, p: Point2D) -> Option<Point2D> {
        self.apply(p)
    }
}

/// Forward and inverse homographies for one source/destination quad pair
#[derive(Debug, Clone)]
pub struct PerspectiveTransform {
    forward: HomographyCoefficients,
    inverse: HomographyCoefficients,
    src_width: u32,
    src_height: u32,
}

impl PerspectiveTransform {
    /// Map the `src_width x src_height` image frame onto `dst`
    pub fn compute(src_width: u32, src_height: u32, dst: &Quadrilateral) -> WarpResult<Self> {
        let src = Quadrilateral::from_size(src_width, src_height);
        let forward = HomographyCoefficients::between(&src, dst)?;
        let inverse = HomographyCoefficients::between(dst, &src)?;

        Ok(Self {
            forward,
            inverse,
            src_width,
            src_height,
        })
    }

    pub fn forward(&self) -> &HomographyCoefficients {
        &self.forward
    }

    /// Transform a point from source to destination coordinates
    #[inline]
    pub fn transform_point(&self, p: Point2D) -> Option<Point2D> {
        self.forward.apply(p)
    }

    /// Transform a point from destination to source coordinates
    #[inline]
    pub fn inverse_transform_point(&self, p: Point2D) -> Option<Point2D> {
        self.inverse.apply(p)
    }

    /// Source position for destination point `p`, if it lies inside the image frame
    fn source_for(&self, p: Point2D) -> Option<Point2D> {
        let src = self.inverse_transform_point(p)?;
        // Points beyond the horizon map back "through" infinity and must be dropped
        if self.forward.weight(src) <= 0.0 {
            return None;
        }
        let inside = src.x >= 0.0
            && src.y >= 0.0
            && src.x < self.src_width as f64
            && src.y < self.src_height as f64;
        inside.then_some(src)
    }

    /// Resample `design` into `canvas` with per-pixel perspective division.
    ///
    /// Only pixels whose centres map back inside the design frame are touched.
    /// Rows are processed in parallel; each row owns its slice of the canvas.
    pub fn warp_onto(&self, design: &RgbaImage, canvas: &mut RgbaImage) {
        if design.width() == 0 || design.height() == 0 {
            return;
        }

        let canvas_width = canvas.width() as usize;
        let stride = canvas_width * 4;
        if stride == 0 {
            return;
        }

        canvas
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..canvas_width {
                    let centre = Point2D::new(x as f64 + 0.5, y as f64 + 0.5);
                    let Some(src) = self.source_for(centre) else {
                        continue;
                    };
                    let sample = bilinear_sample(design, src.x - 0.5, src.y - 0.5);
                    let offset = x * 4;
                    let mut pixel = image::Rgba([
                        row[offset],
                        row[offset + 1],
                        row[offset + 2],
                        row[offset + 3],
                    ]);
                    blend_over(&mut pixel, sample);
                    row[offset..offset + 4].copy_from_slice(&pixel.0);
                }
            });
    }
}

/// Warp `design` onto `quad` in `canvas` using the full homography
pub fn warp_perspective(
    design: &RgbaImage,
    canvas: &mut RgbaImage,
    quad: &Quadrilateral,
) -> WarpResult<()> {
    let transform = PerspectiveTransform::compute(design.width(), design.height(), quad)?;
    transform.warp_onto(design, canvas);
    Ok(())
}
