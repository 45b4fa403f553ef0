//! Destination surface abstraction
//!
//! The warp engine never touches pixels directly. It talks to a surface that
//! understands four primitives, in the style of a 2D canvas context:
//!
//! - `begin_clip_polygon` saves the current state and narrows the clip
//! - `set_transform` replaces the current transform
//! - `draw_image` draws a whole image at the origin through the transform
//! - `restore` undoes exactly one `begin_clip_polygon`
//!
//! [`ClipScope`] pairs the first and the last so a clip can never outlive
//! the block that acquired it.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::affine::AffineTransform;
use crate::geometry::Point2D;

/// Anything with known pixel dimensions that a surface can draw
pub trait RasterImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

impl RasterImage for RgbaImage {
    fn width(&self) -> u32 {
        RgbaImage::width(self)
    }

    fn height(&self) -> u32 {
        RgbaImage::height(self)
    }
}

impl RasterImage for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }
}

/// Bare dimensions, for planning a warp without decoded pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl RasterImage for ImageSize {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// A destination that accepts clip, transform and draw requests for images of type `I`
pub trait DrawSurface<I: RasterImage + ?Sized> {
    /// Save the current state, then intersect the clip with `points`
    fn begin_clip_polygon(&mut self, points: &[Point2D]);

    /// Replace the current transform
    fn set_transform(&mut self, transform: &AffineTransform);

    /// Draw the full image with its top-left corner at the origin
    fn draw_image(&mut self, image: &I);

    /// Return to the state saved by the matching `begin_clip_polygon`
    fn restore(&mut self);
}

/// Clip acquisition that restores the surface when dropped.
///
/// Dereferences to the surface so the transform and draw calls go through
/// the scope while it is alive.
pub struct ClipScope<'a, I, S>
where
    I: RasterImage + ?Sized,
    S: DrawSurface<I> + ?Sized,
{
    surface: &'a mut S,
    _image: PhantomData<fn(&I)>,
}

impl<'a, I, S> ClipScope<'a, I, S>
where
    I: RasterImage + ?Sized,
    S: DrawSurface<I> + ?Sized,
{
    pub fn acquire(surface: &'a mut S, polygon: &[Point2D]) -> Self {
        surface.begin_clip_polygon(polygon);
        Self {
            surface,
            _image: PhantomData,
        }
    }
}

impl<I, S> Deref for ClipScope<'_, I, S>
where
    I: RasterImage + ?Sized,
    S: DrawSurface<I> + ?Sized,
{
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<I, S> DerefMut for ClipScope<'_, I, S>
where
    I: RasterImage + ?Sized,
    S: DrawSurface<I> + ?Sized,
{
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<I, S> Drop for ClipScope<'_, I, S>
where
    I: RasterImage + ?Sized,
    S: DrawSurface<I> + ?Sized,
{
    fn drop(&mut self) {
        self.surface.restore();
    }
}

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    BeginClipPolygon(Vec<Point2D>),
    SetTransform(AffineTransform),
    DrawImage { width: u32, height: u32 },
    Restore,
}

/// Surface that only records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<SurfaceOp>,
    depth: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Number of clip acquisitions not yet restored
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Transforms in the order they were set
    pub fn transforms(&self) -> Vec<AffineTransform> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::SetTransform(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SurfaceOp::DrawImage { .. }))
            .count()
    }
}

impl<I: RasterImage + ?Sized> DrawSurface<I> for RecordingSurface {
    fn begin_clip_polygon(&mut self, points: &[Point2D]) {
        self.depth += 1;
        self.ops.push(SurfaceOp::BeginClipPolygon(points.to_vec()));
    }

    fn set_transform(&mut self, transform: &AffineTransform) {
        self.ops.push(SurfaceOp::SetTransform(*transform));
    }

    fn draw_image(&mut self, image: &I) {
        self.ops.push(SurfaceOp::DrawImage {
            width: image.width(),
            height: image.height(),
        });
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.ops.push(SurfaceOp::Restore);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> [Point2D; 3] {
        [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_scope_restores_on_drop() {
        let mut surface = RecordingSurface::new();
        {
            let mut scope: ClipScope<'_, ImageSize, _> = ClipScope::acquire(&mut surface, &triangle());
            assert_eq!(scope.depth(), 1);
            DrawSurface::<ImageSize>::set_transform(&mut *scope, &AffineTransform::identity());
            scope.draw_image(&ImageSize { width: 4, height: 2 });
        }
        assert_eq!(surface.depth(), 0);
        assert_eq!(
            surface.ops(),
            &[
                SurfaceOp::BeginClipPolygon(triangle().to_vec()),
                SurfaceOp::SetTransform(AffineTransform::identity()),
                SurfaceOp::DrawImage { width: 4, height: 2 },
                SurfaceOp::Restore,
            ]
        );
    }

    #[test]
    fn test_scope_restores_on_early_return() {
        fn fails_midway(surface: &mut RecordingSurface) -> Result<(), &'static str> {
            let _scope: ClipScope<'_, ImageSize, _> = ClipScope::acquire(surface, &triangle());
            Err("bail out before drawing")
        }

        let mut surface = RecordingSurface::new();
        assert!(fails_midway(&mut surface).is_err());
        assert_eq!(surface.depth(), 0);
        assert_eq!(surface.ops().last(), Some(&SurfaceOp::Restore));
    }

    #[test]
    fn test_nested_scopes() {
        let mut surface = RecordingSurface::new();
        {
            let mut outer: ClipScope<'_, ImageSize, _> = ClipScope::acquire(&mut surface, &triangle());
            {
                let inner: ClipScope<'_, ImageSize, _> = ClipScope::acquire(&mut *outer, &triangle());
                assert_eq!(inner.depth(), 2);
            }
            assert_eq!(outer.depth(), 1);
        }
        assert_eq!(surface.depth(), 0);
    }
}
