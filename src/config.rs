//! Settings for an analysis run
//!
//! Read from TOML: an explicit `--config` path, else
//! `$XDG_CONFIG_HOME/tradecheck/config.toml` when it exists, else defaults.
//!
//! ```toml
//! ranking_size = 5
//! delta_display_limit = 10
//! nan_marker = "NaN"
//!
//! [columns.kite]
//! realized_pnl = ["Net P&L"]
//!
//! [columns.tradingview]
//! price = ["Fill Rate"]
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_RANKING_SIZE: usize = 5;
pub const DEFAULT_DELTA_DISPLAY_LIMIT: usize = 10;
pub const DEFAULT_NAN_MARKER: &str = "NaN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Size of the top/bottom performer lists
    pub ranking_size: usize,
    /// How many deltas (by magnitude) the delta chart shows
    pub delta_display_limit: usize,
    /// Marker written for undefined percentages in the export
    pub nan_marker: String,
    pub columns: ColumnSettings,
}

/// Extra header synonyms per source, keyed by canonical field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub kite: HashMap<String, Vec<String>>,
    pub tradingview: HashMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ranking_size: DEFAULT_RANKING_SIZE,
            delta_display_limit: DEFAULT_DELTA_DISPLAY_LIMIT,
            nan_marker: DEFAULT_NAN_MARKER.to_string(),
            columns: ColumnSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(content).context("Invalid configuration")?;
        settings.nan_marker = settings.nan_marker.trim().to_string();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from an explicit path or the user config directory
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Settings::default());
                }
            },
        };

        info!("Loading config from {:?}", path);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("In config file {:?}", path))
    }

    fn validate(&self) -> Result<()> {
        if self.nan_marker.is_empty() {
            return Err(anyhow!(
                "nan_marker must not be empty; it would read back as a missing value"
            ));
        }
        if self.nan_marker == "0" {
            return Err(anyhow!("nan_marker must not be '0'; it would read back as zero"));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("tradecheck").join("config.toml"))
}
