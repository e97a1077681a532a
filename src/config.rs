use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const MIN_POINT_SIZE: u8 = 1;
pub const MAX_POINT_SIZE: u8 = 10;
pub const DEFAULT_POINT_SIZE: u8 = 2;

// ---------------------------------------------------------------------------
// Colour mode
// ---------------------------------------------------------------------------

/// How points are coloured in the viewport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Every point white.
    #[default]
    Solid,
    /// Viridis on the Z coordinate.
    Height,
    /// Viridis on the intensity channel.
    Intensity,
}

impl ColorMode {
    pub fn label(self) -> &'static str {
        match self {
            ColorMode::Solid => "Solid (white)",
            ColorMode::Height => "Color by Height (Z)",
            ColorMode::Intensity => "Color by Intensity",
        }
    }
}

// ---------------------------------------------------------------------------
// Viewer settings
// ---------------------------------------------------------------------------

/// Settings that survive restarts (eframe storage) and can be overridden
/// by a JSON file or command line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub point_size: u8,
    pub color_mode: ColorMode,
    /// Directory opened at startup, if it still exists.
    pub last_directory: Option<PathBuf>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            point_size: DEFAULT_POINT_SIZE,
            color_mode: ColorMode::default(),
            last_directory: None,
        }
    }
}

/// Contents of a `--config` JSON file. Absent keys leave the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub point_size: Option<u8>,
    pub color_mode: Option<ColorMode>,
    pub directory: Option<PathBuf>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply(self, settings: &mut ViewerSettings) {
        if let Some(size) = self.point_size {
            settings.point_size = size;
        }
        if let Some(mode) = self.color_mode {
            settings.color_mode = mode;
        }
        if let Some(dir) = self.directory {
            settings.last_directory = Some(dir);
        }
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Desktop viewer for LiDAR point cloud scans (.pcd, .ply, .xyz, .bin, .npy).
#[derive(Debug, Default, Parser)]
#[command(name = "lidar-viewer", version, about)]
pub struct Cli {
    /// Directory of scans to open at startup.
    pub directory: Option<PathBuf>,

    /// JSON settings file (keys: point_size, color_mode, directory).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Point size in pixels.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub point_size: Option<u8>,

    /// Initial colouring of the points.
    #[arg(long, value_enum)]
    pub color_mode: Option<ColorMode>,
}

impl Cli {
    /// Layer defaults < persisted < config file < command line.
    pub fn resolve(&self, persisted: Option<ViewerSettings>) -> ViewerSettings {
        let mut settings = persisted.unwrap_or_default();

        if let Some(path) = &self.config {
            match SettingsFile::load(path) {
                Ok(file) => {
                    log::info!("Using config {}", path.display());
                    file.apply(&mut settings);
                }
                Err(e) => log::warn!("Ignoring config file: {e:#}"),
            }
        }

        if let Some(size) = self.point_size {
            settings.point_size = size;
        }
        if let Some(mode) = self.color_mode {
            settings.color_mode = mode;
        }
        if let Some(dir) = &self.directory {
            settings.last_directory = Some(dir.clone());
        }

        settings.point_size = settings.point_size.clamp(MIN_POINT_SIZE, MAX_POINT_SIZE);
        settings
    }
}
