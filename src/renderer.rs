//! Two-triangle affine warp of a rectangular image onto a quadrilateral
//!
//! The source frame `(0,0)-(W,H)` is split along the Top-Right/Bottom-Left
//! diagonal:
//!
//! ```text
//!   TL ------- TR
//!   |  A     / |
//!   |     /    |
//!   |  /    B  |
//!   BL ------- BR
//! ```
//!
//! Each half gets its own exact affine map onto the matching destination
//! triangle, and the full image is drawn once per half through a clip on the
//! destination triangle. Both halves agree on the shared diagonal vertices,
//! so for a convex, simple destination quad the two draws tile it without a
//! seam. Non-convex or self-intersecting quads are not handled; the result
//! for them is whatever the two clipped draws happen to produce.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::affine::AffineTransform;
use crate::error::{WarpError, WarpResult};
use crate::geometry::{cross, is_degenerate_triangle, Point2D, Quadrilateral};
use crate::surface::{ClipScope, DrawSurface, RasterImage};
use crate::transform::{HomographyCoefficients, QuadMapping};

/// Which half of the source rectangle a triangle covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleId {
    /// TL, TR, BL
    Upper,
    /// TR, BR, BL
    Lower,
}

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriangleId::Upper => write!(f, "upper (TL, TR, BL)"),
            TriangleId::Lower => write!(f, "lower (TR, BR, BL)"),
        }
    }
}

/// Mapping strategy for placing the design onto the quad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Two affine triangles drawn through clip + transform (default)
    #[default]
    Affine,
    /// Per-pixel resampling through the full homography
    Perspective,
}

impl RenderStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStrategy::Affine => "affine",
            RenderStrategy::Perspective => "perspective",
        }
    }
}

/// One half of the warp: its corners and the affine map between them
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleWarp {
    pub id: TriangleId,
    pub source: [Point2D; 3],
    pub destination: [Point2D; 3],
    pub transform: WarpResult<AffineTransform>,
}

impl TriangleWarp {
    /// Solve the affine map for one triangle pair.
    ///
    /// A destination triangle with no area is rejected as well as a source
    /// one: there is nothing to draw into, and its transform is not
    /// invertible for surfaces that sample backwards.
    pub fn solve(id: TriangleId, source: [Point2D; 3], destination: [Point2D; 3]) -> Self {
        let transform = if is_degenerate_triangle(&destination) {
            Err(WarpError::DegenerateTriangle)
        } else {
            AffineTransform::from_triangles(&source, &destination).and_then(|t| {
                if t.is_finite() {
                    Ok(t)
                } else {
                    Err(WarpError::DegenerateTriangle)
                }
            })
        };

        Self {
            id,
            source,
            destination,
            transform,
        }
    }
}

/// The two triangle warps for one image size and destination quad
#[derive(Debug, Clone, PartialEq)]
pub struct TrianglePairMapping {
    pub width: u32,
    pub height: u32,
    pub upper: TriangleWarp,
    pub lower: TriangleWarp,
}

impl TrianglePairMapping {
    pub fn new(width: u32, height: u32, quad: &Quadrilateral) -> Self {
        let src = Quadrilateral::from_size(width, height);
        Self {
            width,
            height,
            upper: TriangleWarp::solve(TriangleId::Upper, src.upper_triangle(), quad.upper_triangle()),
            lower: TriangleWarp::solve(TriangleId::Lower, src.lower_triangle(), quad.lower_triangle()),
        }
    }

    pub fn triangles(&self) -> [&TriangleWarp; 2] {
        [&self.upper, &self.lower]
    }
}

impl QuadMapping for TrianglePairMapping {
    /// Maps through whichever triangle holds `p` on the source side of the
    /// TR-BL diagonal; points on the diagonal use the upper triangle
    fn map_point(&self, p: Point2D) -> Option<Point2D> {
        let tr = Point2D::new(self.width as f64, 0.0);
        let bl = Point2D::new(0.0, self.height as f64);
        // TL sits on the positive side of TR -> BL
        let side = cross(tr, bl, p);
        let warp = if side >= 0.0 { &self.upper } else { &self.lower };
        warp.transform.as_ref().ok().map(|t| t.apply(p))
    }
}

/// Build the quad mapping for a strategy, mainly for diagnostics and
/// comparing the two models
pub fn quad_mapping(
    strategy: RenderStrategy,
    width: u32,
    height: u32,
    quad: &Quadrilateral,
) -> WarpResult<Box<dyn QuadMapping>> {
    match strategy {
        RenderStrategy::Affine => Ok(Box::new(TrianglePairMapping::new(width, height, quad))),
        RenderStrategy::Perspective => {
            let src = Quadrilateral::from_size(width, height);
            Ok(Box::new(HomographyCoefficients::between(&src, quad)?))
        }
    }
}

/// Outcome of one render call.
///
/// `drawn` and `skipped` list triangles and stay empty for a perspective
/// render, which warps the quad as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub strategy: RenderStrategy,
    pub drawn: Vec<TriangleId>,
    pub skipped: Vec<TriangleId>,
}

impl RenderReport {
    /// Report for a successful single-pass perspective warp
    pub fn perspective() -> Self {
        Self {
            strategy: RenderStrategy::Perspective,
            ..Self::default()
        }
    }

    /// Some but not all of the design made it onto the surface
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        match self.strategy {
            RenderStrategy::Affine => self.skipped.is_empty() && !self.drawn.is_empty(),
            RenderStrategy::Perspective => self.skipped.is_empty(),
        }
    }
}

/// Draws a rectangular image onto a destination quad using two affine triangles
#[derive(Debug, Clone, Default)]
pub struct QuadWarpRenderer {
    validate_convex: bool,
}

impl QuadWarpRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning when the destination quad is not convex in its stored order
    pub fn with_convexity_check(mut self, enabled: bool) -> Self {
        self.validate_convex = enabled;
        self
    }

    /// Render `image` onto `quad`.
    ///
    /// A triangle whose affine map cannot be solved is skipped and listed in
    /// the report; the other triangle is still drawn. Every clip acquired on
    /// the surface is released before this returns.
    pub fn render<I, S>(&self, surface: &mut S, image: &I, quad: &Quadrilateral) -> WarpResult<RenderReport>
    where
        I: RasterImage + ?Sized,
        S: DrawSurface<I> + ?Sized,
    {
        if self.validate_convex && !quad.is_convex() {
            warn!(
                "Destination corners {:?} do not form a convex quad in TL, TR, BR, BL order; \
                 the warped design may show gaps or overlaps",
                quad.corners
            );
        }

        let (width, height) = image.dimensions();
        let mapping = TrianglePairMapping::new(width, height, quad);
        let mut report = RenderReport::default();

        for warp in mapping.triangles() {
            match &warp.transform {
                Ok(transform) => {
                    debug!("Triangle {}: transform {:?}", warp.id, transform.to_array());
                    let mut scope: ClipScope<'_, I, S> = ClipScope::acquire(surface, &warp.destination);
                    scope.set_transform(transform);
                    scope.draw_image(image);
                    report.drawn.push(warp.id);
                }
                Err(e) => {
                    warn!("Skipping {} triangle: {}", warp.id, e);
                    report.skipped.push(warp.id);
                }
            }
        }

        if report.is_partial() {
            warn!(
                "Partial mockup: drew {} of 2 triangles",
                report.drawn.len()
            );
        }

        Ok(report)
    }
}
