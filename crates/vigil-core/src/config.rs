//! Detection configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/vigil/config/detection.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/detection.toml");

/// Default trailing window scanned by a detection run
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Thresholds and limits for anomaly detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Trailing window (days) used when the caller does not pass one
    pub lookback_days: i64,
    /// Global amount |z| threshold
    pub amount_z_threshold: f64,
    /// Per-category amount |z| threshold
    pub category_z_threshold: f64,
    /// Categories below this percentage of the window are rare
    pub rare_category_percent: f64,
    /// Score contribution for a category with no history
    pub new_category_weight: f64,
    /// Timeout for a single explanation request
    pub explanation_timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            amount_z_threshold: 2.5,
            category_z_threshold: 2.5,
            rare_category_percent: 5.0,
            new_category_weight: 1.0,
            explanation_timeout: Duration::from_secs(12),
        }
    }
}

impl DetectionConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit path (embedded defaults if the file does not exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("vigil").join("config").join("detection.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<DetectionConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    let content = match path {
        Some(path) if path.exists() => fs::read_to_string(&path)
            .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    window: Option<RawWindow>,
    thresholds: Option<RawThresholds>,
    explanations: Option<RawExplanations>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    lookback_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawThresholds {
    amount_z: Option<f64>,
    category_z: Option<f64>,
    rare_category_percent: Option<f64>,
    new_category_weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawExplanations {
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<DetectionConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = DetectionConfig::default();

    if let Some(window) = raw.window {
        if let Some(days) = window.lookback_days {
            if days <= 0 {
                return Err(Error::InvalidData(format!(
                    "lookback_days must be positive, got {}",
                    days
                )));
            }
            config.lookback_days = days;
        }
    }

    if let Some(thresholds) = raw.thresholds {
        if let Some(z) = thresholds.amount_z {
            config.amount_z_threshold = z;
        }
        if let Some(z) = thresholds.category_z {
            config.category_z_threshold = z;
        }
        if let Some(pct) = thresholds.rare_category_percent {
            config.rare_category_percent = pct;
        }
        if let Some(weight) = thresholds.new_category_weight {
            config.new_category_weight = weight;
        }
    }

    if let Some(explanations) = raw.explanations {
        if let Some(secs) = explanations.timeout_secs {
            if secs == 0 {
                return Err(Error::InvalidData(
                    "timeout_secs must be positive, got 0".to_string(),
                ));
            }
            config.explanation_timeout = Duration::from_secs(secs);
        }
    }

    Ok(config)
}
