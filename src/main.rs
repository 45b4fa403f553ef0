//! quadwarp - place a design image onto a photo for quick mockups
//!
//! Loads a base photo and a flat design, takes the four destination corners
//! (Top-Left, Top-Right, Bottom-Right, Bottom-Left, in canvas pixels) and
//! writes the composited mockup as a PNG.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use quadwarp::config::Config;
use quadwarp::selection::AddPoint;
use quadwarp::surface::SurfaceOp;
use quadwarp::{MockupSession, Point2D, RenderStrategy};

/// quadwarp - warp a design onto four points of a photo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base photo to draw onto
    #[arg(short, long)]
    base: PathBuf,

    /// Design image to warp
    #[arg(short, long)]
    design: PathBuf,

    /// Destination corner as "x,y" in canvas pixels; give four, in
    /// Top-Left, Top-Right, Bottom-Right, Bottom-Left order
    #[arg(short, long = "point", value_parser = parse_point)]
    points: Vec<Point2D>,

    /// Output PNG (default: <base name>_mockup.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "quadwarp.toml")]
    config: PathBuf,

    /// Override the configured render strategy
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<RenderStrategy>,

    /// Store the points used in the configuration file
    #[arg(long)]
    save_points: bool,

    /// Log the drawing operations instead of writing an image
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_point(s: &str) -> Result<Point2D, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {:?}", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {:?}: {}", s, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {:?}: {}", s, e))?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(format!("point {:?} is not finite", s));
    }
    Ok(Point2D::new(x, y))
}

fn parse_strategy(s: &str) -> Result<RenderStrategy, String> {
    match s.to_ascii_lowercase().as_str() {
        "affine" => Ok(RenderStrategy::Affine),
        "perspective" => Ok(RenderStrategy::Perspective),
        other => Err(format!("unknown strategy {:?} (affine|perspective)", other)),
    }
}

fn default_output(base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mockup".to_string());
    base.with_file_name(format!("{}_mockup.png", stem))
}

fn load_rgba(path: &Path) -> Result<image::RgbaImage> {
    let img = image::open(path).with_context(|| format!("Failed to load image {:?}", path))?;
    Ok(img.to_rgba8())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("quadwarp v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_or_create(&args.config)?;
    if let Some(strategy) = args.strategy {
        config.render.strategy = strategy;
    }

    let mut session = MockupSession::new(&config);
    session.load_base(load_rgba(&args.base)?);
    session.load_design(load_rgba(&args.design)?);

    let points = if args.points.is_empty() {
        info!("Using {} points from {:?}", config.selection.points.len(), args.config);
        config.selection.points.clone()
    } else {
        args.points.clone()
    };

    for point in &points {
        if session.add_point(*point)? == AddPoint::Rejected {
            warn!("Ignoring extra point {:?}: 4 points already selected", point);
        }
    }

    for labeled in session.points().labeled_points() {
        info!("{}: ({:.1}, {:.1})", labeled.label, labeled.x, labeled.y);
    }

    if !session.can_apply() {
        bail!("{}", session.prompt());
    }

    if args.save_points {
        config.selection.points = session.points().points().to_vec();
        config.save(&args.config)?;
    }

    if args.dry_run {
        let plan = session.plan()?;
        for op in plan.ops() {
            match op {
                SurfaceOp::BeginClipPolygon(poly) => info!("clip {:?}", poly),
                SurfaceOp::SetTransform(t) => info!("transform {:?}", t.to_array()),
                SurfaceOp::DrawImage { width, height } => info!("draw {}x{}", width, height),
                SurfaceOp::Restore => info!("restore"),
            }
        }
        return Ok(());
    }

    let report = session.apply()?;
    if report.is_partial() {
        warn!("Only part of the design was drawn: skipped {:?}", report.skipped);
    }

    let output = args.output.unwrap_or_else(|| default_output(&args.base));
    let canvas = session.canvas().context("No canvas to save")?;
    canvas
        .save(&output)
        .with_context(|| format!("Failed to write mockup to {:?}", output))?;

    info!("{}", session.prompt());
    info!("Saved mockup to {:?}", output);
    Ok(())
}
