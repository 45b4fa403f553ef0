//! Mockup session: images, selected points and the working canvas
//!
//! Owns everything one mockup needs and hands the warp engine explicit
//! references, so the engine itself holds no state between calls.

use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, info, Level};

use crate::config::{CanvasConfig, Config, RenderConfig};
use crate::geometry::Point2D;
use crate::raster::RasterSurface;
use crate::renderer::{quad_mapping, QuadWarpRenderer, RenderReport, RenderStrategy};
use crate::selection::{AddPoint, PointCollectionState};
use crate::surface::{ImageSize, RecordingSurface};
use crate::transform::{warp_perspective, QuadMapping};

/// Base image resized to the working canvas
#[derive(Debug, Clone)]
struct BaseImage {
    pixels: RgbaImage,
    /// Canvas size divided by original size
    scale: f64,
}

/// One mockup in progress
#[derive(Debug, Clone, Default)]
pub struct MockupSession {
    canvas: CanvasConfig,
    render: RenderConfig,
    base: Option<BaseImage>,
    design: Option<RgbaImage>,
    points: PointCollectionState,
    surface: Option<RasterSurface>,
    applied: bool,
}

impl MockupSession {
    pub fn new(config: &Config) -> Self {
        Self {
            canvas: config.canvas.clone(),
            render: config.render.clone(),
            ..Self::default()
        }
    }

    pub fn set_strategy(&mut self, strategy: RenderStrategy) {
        self.render.strategy = strategy;
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.render.strategy
    }

    /// Install a new base image. The canvas is redrawn and the selection cleared.
    pub fn load_base(&mut self, image: RgbaImage) {
        let (width, height) = image.dimensions();
        let scale = self.canvas.scale_for(width, height);
        let pixels = if scale < 1.0 {
            let w = ((width as f64 * scale).round() as u32).max(1);
            let h = ((height as f64 * scale).round() as u32).max(1);
            debug!("Scaling base image {}x{} -> {}x{}", width, height, w, h);
            imageops::resize(&image, w, h, FilterType::Triangle)
        } else {
            image
        };

        info!(
            "Base image loaded: canvas {}x{} (scale {:.3})",
            pixels.width(),
            pixels.height(),
            scale
        );
        self.base = Some(BaseImage { pixels, scale });
        self.reset_points();
    }

    pub fn load_design(&mut self, image: RgbaImage) {
        info!("Design image loaded: {}x{}", image.width(), image.height());
        self.design = Some(image);
    }

    /// Offer a canvas point to the selection
    pub fn add_point(&mut self, point: Point2D) -> Result<AddPoint> {
        if self.base.is_none() {
            bail!("Please load a base image first");
        }
        if !point.is_finite() {
            bail!("Point {:?} is not a finite coordinate", point);
        }
        let outcome = self.points.add_point(point);
        match outcome {
            AddPoint::Accepted(state) => debug!("Added point {:?} -> {:?}", point, state),
            AddPoint::Rejected => {
                info!("4 points already selected. Reset points to select new ones.")
            }
        }
        Ok(outcome)
    }

    /// Clear the selection and any applied mockup
    pub fn reset_points(&mut self) {
        self.points.reset();
        self.applied = false;
        self.surface = self
            .base
            .as_ref()
            .map(|base| RasterSurface::from_image(base.pixels.clone()));
    }

    pub fn points(&self) -> &PointCollectionState {
        &self.points
    }

    /// Canvas size divided by original base size, if a base is loaded
    pub fn canvas_scale(&self) -> Option<f64> {
        self.base.as_ref().map(|b| b.scale)
    }

    pub fn can_apply(&self) -> bool {
        self.base.is_some() && self.design.is_some() && self.points.is_ready()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// What the user should do next
    pub fn prompt(&self) -> String {
        if self.base.is_none() {
            "Load a base image to start.".to_string()
        } else if self.applied {
            "Mockup applied! Reset points or save the result.".to_string()
        } else {
            self.points.prompt()
        }
    }

    /// Current canvas contents
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.surface.as_ref().map(RasterSurface::image)
    }

    /// Redraw the base and warp the design onto the selected quad
    pub fn apply(&mut self) -> Result<RenderReport> {
        let (Some(base), Some(design)) = (&self.base, &self.design) else {
            bail!("Need a base image, a design image and 4 selected points");
        };
        let quad = self
            .points
            .quadrilateral()
            .context("Need a base image, a design image and 4 selected points")?;

        let mut surface = RasterSurface::from_image(base.pixels.clone());
        let strategy = self.render.strategy;
        info!("Applying {}x{} design with {} warp", design.width(), design.height(), strategy.as_str());

        if tracing::enabled!(Level::DEBUG) {
            let centre = Point2D::new(design.width() as f64 / 2.0, design.height() as f64 / 2.0);
            match quad_mapping(strategy, design.width(), design.height(), &quad) {
                Ok(mapping) => debug!("Design centre lands at {:?}", mapping.map_point(centre)),
                Err(e) => debug!("No {} mapping for this quad: {}", strategy.as_str(), e),
            }
        }

        let report = match strategy {
            RenderStrategy::Affine => QuadWarpRenderer::new()
                .with_convexity_check(self.render.validate_convex)
                .render(&mut surface, design, &quad)?,
            RenderStrategy::Perspective => {
                warp_perspective(design, surface.image_mut(), &quad)?;
                RenderReport::perspective()
            }
        };

        self.surface = Some(surface);
        self.applied = true;
        Ok(report)
    }

    /// Record the surface calls an affine apply would make, without drawing
    pub fn plan(&self) -> Result<RecordingSurface> {
        let Some(design) = &self.design else {
            bail!("No design image loaded");
        };
        let quad = self.points.quadrilateral()?;
        let mut surface = RecordingSurface::new();
        let size = ImageSize {
            width: design.width(),
            height: design.height(),
        };
        QuadWarpRenderer::new()
            .with_convexity_check(self.render.validate_convex)
            .render(&mut surface, &size, &quad)?;
        Ok(surface)
    }
}
