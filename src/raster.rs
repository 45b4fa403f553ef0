//! Software destination surface backed by an RGBA buffer
//!
//! Implements the canvas-like primitives from [`crate::surface`] on top of an
//! [`RgbaImage`]: a save/restore state stack, convex polygon clipping tested
//! at pixel centres, and affine image drawing by inverse mapping each covered
//! destination pixel back into the source with bilinear interpolation.
//!
//! Clip edges follow a top-left fill rule, so a pixel centre lying on an edge
//! shared by two clip polygons is drawn by exactly one of them.

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::affine::AffineTransform;
use crate::geometry::{bounds_of, convex_polygon_contains, Point2D, Quadrilateral};
use crate::surface::DrawSurface;

/// Clip and transform in effect for draw calls
#[derive(Debug, Clone, Default)]
struct SurfaceState {
    /// Convex polygons; a pixel is visible only inside all of them
    clips: Vec<Vec<Point2D>>,
    transform: AffineTransform,
}

/// An RGBA canvas that can be clipped, transformed and drawn onto
#[derive(Debug, Clone)]
pub struct RasterSurface {
    canvas: RgbaImage,
    state: SurfaceState,
    saved: Vec<SurfaceState>,
}

impl RasterSurface {
    /// Wrap an existing image; drawing happens on top of its pixels
    pub fn from_image(canvas: RgbaImage) -> Self {
        Self {
            canvas,
            state: SurfaceState::default(),
            saved: Vec::new(),
        }
    }

    /// Transparent canvas of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Mutable pixel access for renderers that write pixels directly
    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }

    /// Number of saved states not yet restored
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Current transform
    pub fn transform(&self) -> AffineTransform {
        self.state.transform
    }

    /// Pixel-space bounds `(x0, y0, x1, y1)` (end-exclusive) covering `points`
    /// intersected with the current clip and the canvas
    fn covered_span(&self, points: &[Point2D]) -> Option<(u32, u32, u32, u32)> {
        let (mut min, mut max) = bounds_of(points);
        for clip in &self.state.clips {
            let (cmin, cmax) = bounds_of(clip);
            min.x = min.x.max(cmin.x);
            min.y = min.y.max(cmin.y);
            max.x = max.x.min(cmax.x);
            max.y = max.y.min(cmax.y);
        }
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }

        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(self.canvas.width());
        let y1 = (max.y.ceil().max(0.0) as u32).min(self.canvas.height());

        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    fn is_visible(&self, centre: Point2D) -> bool {
        self.state
            .clips
            .iter()
            .all(|clip| convex_polygon_contains(clip, centre))
    }
}

impl DrawSurface<RgbaImage> for RasterSurface {
    fn begin_clip_polygon(&mut self, points: &[Point2D]) {
        self.saved.push(self.state.clone());
        self.state.clips.push(points.to_vec());
    }

    fn set_transform(&mut self, transform: &AffineTransform) {
        self.state.transform = *transform;
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let transform = self.state.transform;
        let Some(inverse) = transform.invert() else {
            debug!("Transform {:?} is not invertible, nothing to draw", transform);
            return;
        };

        let footprint = Quadrilateral::from_size(width, height)
            .corners
            .map(|p| transform.apply(p));
        let Some((x0, y0, x1, y1)) = self.covered_span(&footprint) else {
            return;
        };

        let (w, h) = (width as f64, height as f64);
        for y in y0..y1 {
            for x in x0..x1 {
                let centre = Point2D::new(x as f64 + 0.5, y as f64 + 0.5);
                if !self.is_visible(centre) {
                    continue;
                }
                let src = inverse.apply(centre);
                if src.x < 0.0 || src.y < 0.0 || src.x >= w || src.y >= h {
                    continue;
                }
                let sample = bilinear_sample(image, src.x - 0.5, src.y - 0.5);
                blend_over(self.canvas.get_pixel_mut(x, y), sample);
            }
        }
    }

    fn restore(&mut self) {
        match self.saved.pop() {
            Some(state) => self.state = state,
            None => warn!("restore() called without a matching clip acquisition"),
        }
    }
}

/// Bilinear interpolation sampling at continuous pixel-index coordinates.
///
/// Coordinates are clamped to the image so edge pixels extend outward.
/// An empty image samples as transparent.
#[inline]
pub fn bilinear_sample(src: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return [0, 0, 0, 0];
    }
    let x = x.max(0.0).min((width - 1) as f64);
    let y = y.max(0.0).min((height - 1) as f64);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut result = [0u8; 4];
    for c in 0..4 {
        let value = p00[c] as f64 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f64 * fx * (1.0 - fy)
            + p01[c] as f64 * (1.0 - fx) * fy
            + p11[c] as f64 * fx * fy;
        result[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    result
}

/// Source-over compositing of `src` onto `dst`
#[inline]
pub fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        dst.0 = src;
        return;
    }
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src[c] as f32 * sa;
        let d = dst.0[c] as f32 * da * (1.0 - sa);
        dst.0[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ClipScope;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn solid(width: u32, height: u32, colour: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(width, height, colour)
    }

    #[test]
    fn test_identity_draw_covers_image_rect() {
        let mut surface = RasterSurface::from_image(solid(8, 8, WHITE));
        surface.draw_image(&solid(4, 4, RED));
        let out = surface.image();
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(3, 3), RED);
        assert_eq!(*out.get_pixel(4, 4), WHITE);
    }

    #[test]
    fn test_translation() {
        let mut surface = RasterSurface::from_image(solid(8, 8, WHITE));
        surface.set_transform(&AffineTransform::new(1.0, 0.0, 0.0, 1.0, 4.0, 2.0));
        surface.draw_image(&solid(2, 2, RED));
        let out = surface.image();
        assert_eq!(*out.get_pixel(4, 2), RED);
        assert_eq!(*out.get_pixel(5, 3), RED);
        assert_eq!(*out.get_pixel(3, 2), WHITE);
        assert_eq!(*out.get_pixel(6, 2), WHITE);
    }

    #[test]
    fn test_clip_limits_draw() {
        let mut surface = RasterSurface::from_image(solid(10, 10, WHITE));
        let triangle = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ];
        {
            let mut scope: ClipScope<'_, RgbaImage, _> = ClipScope::acquire(&mut surface, &triangle);
            scope.draw_image(&solid(10, 10, RED));
        }
        let out = surface.image();
        assert_eq!(*out.get_pixel(1, 1), RED);
        assert_eq!(*out.get_pixel(8, 8), WHITE);
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_restore_resets_transform_and_clip() {
        let mut surface = RasterSurface::new(4, 4);
        surface.begin_clip_polygon(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
        ]);
        surface.set_transform(&AffineTransform::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0));
        surface.restore();
        assert_eq!(surface.transform(), AffineTransform::identity());

        surface.draw_image(&solid(4, 4, RED));
        assert_eq!(*surface.image().get_pixel(3, 3), RED);
    }

    #[test]
    fn test_unbalanced_restore_is_ignored() {
        let mut surface = RasterSurface::new(2, 2);
        surface.restore();
        assert_eq!(surface.depth(), 0);
    }

    #[test]
    fn test_singular_transform_draws_nothing() {
        let mut surface = RasterSurface::from_image(solid(4, 4, WHITE));
        surface.set_transform(&AffineTransform::new(1.0, 1.0, 1.0, 1.0, 0.0, 0.0));
        surface.draw_image(&solid(4, 4, RED));
        assert!(surface.image().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_bilinear_midpoint() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 100, 50, 255]));
        assert_eq!(bilinear_sample(&img, 0.5, 0.0), [100, 50, 25, 255]);
        assert_eq!(bilinear_sample(&img, -3.0, 0.0), [0, 0, 0, 255]);
        assert_eq!(bilinear_sample(&img, 9.0, 0.0), [200, 100, 50, 255]);
    }

    #[test]
    fn test_bilinear_empty_image_is_transparent() {
        let empty = RgbaImage::new(0, 0);
        assert_eq!(bilinear_sample(&empty, 0.0, 0.0), [0, 0, 0, 0]);
        assert_eq!(bilinear_sample(&RgbaImage::new(3, 0), 1.0, 0.0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_shared_clip_edge_blends_once() {
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
        let shade = solid(10, 10, Rgba([0, 0, 0, 128]));

        let mut surface = RasterSurface::from_image(solid(10, 10, WHITE));
        for clip in [&upper, &lower] {
            let mut scope: ClipScope<'_, RgbaImage, _> = ClipScope::acquire(&mut surface, clip);
            scope.draw_image(&shade);
        }

        // Every pixel, including those centred on the diagonal, is shaded once
        let expected = *surface.image().get_pixel(1, 1);
        assert!(expected.0[0] > 120 && expected.0[0] < 135);
        for (x, y, p) in surface.image().enumerate_pixels() {
            assert_eq!(*p, expected, "pixel ({}, {}) blended {:?}", x, y, p);
        }
    }

    #[test]
    fn test_blend_over() {
        let mut dst = WHITE;
        blend_over(&mut dst, [0, 0, 0, 0]);
        assert_eq!(dst, WHITE);

        blend_over(&mut dst, [0, 0, 0, 255]);
        assert_eq!(dst, Rgba([0, 0, 0, 255]));

        let mut dst = WHITE;
        blend_over(&mut dst, [0, 0, 0, 128]);
        assert!(dst.0[0] > 120 && dst.0[0] < 135);
        assert_eq!(dst.0[3], 255);
    }
}
