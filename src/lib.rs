//! quadwarp - warp a flat design onto a four-point region of a photo
//!
//! The engine maps a `W x H` design image onto an arbitrary destination
//! quadrilateral. The default path splits the design into two triangles and
//! draws each through an exact affine map clipped to its destination
//! triangle; a full homography estimate is available as an alternative
//! per-pixel perspective renderer.

pub mod affine;
pub mod config;
pub mod error;
pub mod geometry;
pub mod linalg;
pub mod raster;
pub mod renderer;
pub mod selection;
pub mod session;
pub mod surface;
pub mod transform;

pub use affine::AffineTransform;
pub use error::{WarpError, WarpResult};
pub use geometry::{Point2D, Quadrilateral};
pub use renderer::{QuadWarpRenderer, RenderReport, RenderStrategy};
pub use selection::PointCollectionState;
pub use session::MockupSession;
pub use surface::{DrawSurface, RasterImage};
pub use transform::{HomographyCoefficients, QuadMapping};
