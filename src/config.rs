use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Output size as the host expresses it: a base resolution and a
/// percentage applied on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default = "default_width")]
    pub x: u32,
    #[serde(default = "default_height")]
    pub y: u32,
    #[serde(default = "default_percentage")]
    pub percentage: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            x: default_width(),
            y: default_height(),
            percentage: default_percentage(),
        }
    }
}

impl Resolution {
    /// Pixel size of the rendered frame, truncated like the host does.
    pub fn effective(&self) -> Result<(u32, u32)> {
        let scale = |value: u32| {
            u32::try_from(value as u64 * self.percentage as u64 / 100).map_err(|_| {
                anyhow!(
                    "resolution {}x{} at {}% is too large",
                    self.x,
                    self.y,
                    self.percentage
                )
            })
        };
        let (width, height) = (scale(self.x)?, scale(self.y)?);
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "resolution {}x{} at {}% is empty",
                self.x,
                self.y,
                self.percentage
            ));
        }
        Ok((width, height))
    }
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_percentage() -> u32 {
    100
}

/// Bridge settings, read from a TOML file.
///
/// ```toml
/// source_path = "/opt/rendergirl/kernels"
/// log_filter = "rendergirl_bridge=debug"
/// flip_vertical = true
///
/// [resolution]
/// x = 640
/// y = 480
/// percentage = 50
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory the engine loads its kernel sources from.
    pub source_path: Option<PathBuf>,
    /// Overrides the scene's own resolution when set.
    pub resolution: Option<Resolution>,
    /// `env_logger` filter string.
    pub log_filter: Option<String>,
    /// Reverse row order before writing images.
    pub flip_vertical: bool,
}

impl BridgeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse TOML")
    }
}
