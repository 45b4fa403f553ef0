//! Configuration management for quadwarp

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::Point2D;
use crate::renderer::RenderStrategy;

/// Working canvas settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Base images larger than this (in either dimension) are scaled down
    pub max_dim: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { max_dim: 800 }
    }
}

impl CanvasConfig {
    /// Scale factor that fits `width x height` inside `max_dim`, never enlarging
    pub fn scale_for(&self, width: u32, height: u32) -> f64 {
        if width == 0 || height == 0 || self.max_dim == 0 {
            return 1.0;
        }
        let max = self.max_dim as f64;
        (max / width as f64).min(max / height as f64).min(1.0)
    }
}

/// Render settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub strategy: RenderStrategy,
    /// Warn when the selected corners do not form a convex quad
    #[serde(default)]
    pub validate_convex: bool,
}

/// Persisted destination points, in canvas coordinates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub points: Vec<Point2D>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub selection: SelectionConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.canvas.max_dim, 800);
        assert_eq!(config.render.strategy, RenderStrategy::Affine);
        assert!(!config.render.validate_convex);
        assert!(config.selection.points.is_empty());
    }

    #[test]
    fn test_canvas_scale() {
        let canvas = CanvasConfig::default();
        assert_eq!(canvas.scale_for(400, 300), 1.0);
        assert_eq!(canvas.scale_for(1600, 800), 0.5);
        assert_eq!(canvas.scale_for(800, 3200), 0.25);
        assert_eq!(canvas.scale_for(0, 10), 1.0);
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [render]
            strategy = "perspective"
            "#,
        )
        .unwrap();
        assert_eq!(config.render.strategy, RenderStrategy::Perspective);
        assert_eq!(config.canvas.max_dim, 800);
    }

    #[test]
    fn test_load_or_create_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quadwarp.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.canvas.max_dim, 800);

        let mut edited = created.clone();
        edited.selection.points = vec![Point2D::new(1.5, 2.5), Point2D::new(3.0, 4.0)];
        edited.render.validate_convex = true;
        edited.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.selection.points, edited.selection.points);
        assert!(loaded.render.validate_convex);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "canvas = 7").unwrap();

        let err = Config::load_or_create(&path).unwrap_err();
        assert!(format!("{}", err).contains("Failed to parse config"));
    }
}
