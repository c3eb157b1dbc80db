//! Configuration loading and path resolution
//!
//! Every build step receives an explicit [`PipelineConfig`]. Each field is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Default derived from the data root (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_DATA_ROOT: &str = "FOODB_DATA_ROOT";
pub const ENV_DATABASE: &str = "FOODB_DATABASE";
pub const ENV_CSV_DIR: &str = "FOODB_CSV_DIR";
pub const ENV_MAPPING: &str = "FOODB_MAPPING";
pub const ENV_STRICT_MAPPING: &str = "FOODB_STRICT_MAPPING";

/// Database file name under the data root
pub const DEFAULT_DATABASE_FILE: &str = "food_app.db";
/// USDA CSV export directory under the data root
pub const DEFAULT_CSV_DIR: &str = "usda/csv";
/// Canonical foods mapping under the data root
pub const DEFAULT_MAPPING_FILE: &str = "nutrition/mappings/canonical_foods.yaml";

/// Contents of a foodb TOML config file
///
/// All keys are optional. Relative paths are resolved against the directory
/// containing the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TomlConfig {
    pub data_root: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub mapping_path: Option<PathBuf>,
    pub strict_mapping: Option<bool>,
}

impl TomlConfig {
    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let mut config: TomlConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        if let Some(base) = path.parent() {
            config.anchor_paths(base);
        }

        Ok(config)
    }

    fn anchor_paths(&mut self, base: &Path) {
        for slot in [
            &mut self.data_root,
            &mut self.database_path,
            &mut self.csv_dir,
            &mut self.mapping_path,
        ] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file; must exist and parse when given
    pub config_file: Option<PathBuf>,
    pub data_root: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub mapping_path: Option<PathBuf>,
    /// `--strict-mapping[=true|false]`; `None` when not given
    pub strict_mapping: Option<bool>,
}

/// Fully resolved paths and options for one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// SQLite database file (deleted and recreated by a full build)
    pub database_path: PathBuf,
    /// Directory holding food.csv, nutrient.csv, ...
    pub csv_dir: PathBuf,
    /// Canonical foods mapping file (YAML)
    pub mapping_path: PathBuf,
    /// Treat mapping entries with no matching USDA food as errors
    pub strict_mapping: bool,
}

impl PipelineConfig {
    /// Default layout under a data root
    pub fn from_data_root(root: &Path) -> Self {
        Self {
            database_path: root.join(DEFAULT_DATABASE_FILE),
            csv_dir: root.join(DEFAULT_CSV_DIR),
            mapping_path: root.join(DEFAULT_MAPPING_FILE),
            strict_mapping: false,
        }
    }

    /// Resolve configuration from CLI overrides, environment, and TOML
    ///
    /// An explicit `--config` file that is missing or unparsable is an error.
    /// The default config file location is optional: when absent or broken a
    /// warning is logged and defaults are used.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => TomlConfig::load(path)?,
            None => load_default_toml(),
        };
        Self::resolve_with(overrides, &toml_config)
    }

    /// Resolve against an already-loaded TOML config
    pub fn resolve_with(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let data_root = pick_path(
            overrides.data_root.as_ref(),
            ENV_DATA_ROOT,
            toml_config.data_root.as_ref(),
        )
        .unwrap_or_else(default_data_root);
        let defaults = Self::from_data_root(&data_root);

        let database_path = pick_path(
            overrides.database_path.as_ref(),
            ENV_DATABASE,
            toml_config.database_path.as_ref(),
        )
        .unwrap_or(defaults.database_path);

        let csv_dir = pick_path(
            overrides.csv_dir.as_ref(),
            ENV_CSV_DIR,
            toml_config.csv_dir.as_ref(),
        )
        .unwrap_or(defaults.csv_dir);

        let mapping_path = pick_path(
            overrides.mapping_path.as_ref(),
            ENV_MAPPING,
            toml_config.mapping_path.as_ref(),
        )
        .unwrap_or(defaults.mapping_path);

        let strict_mapping = if let Some(strict) = overrides.strict_mapping {
            strict
        } else if let Ok(value) = std::env::var(ENV_STRICT_MAPPING) {
            parse_bool(&value).ok_or_else(|| {
                Error::Config(format!(
                    "{} must be true/false/1/0/yes/no, got '{}'",
                    ENV_STRICT_MAPPING, value
                ))
            })?
        } else {
            toml_config.strict_mapping.unwrap_or(false)
        };

        Ok(Self {
            database_path,
            csv_dir,
            mapping_path,
            strict_mapping,
        })
    }
}

fn pick_path(cli: Option<&PathBuf>, env_var: &str, toml: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli {
        return Some(path.clone());
    }
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    toml.cloned()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Default config file path: `<config_dir>/foodb/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("foodb").join("config.toml"))
}

fn load_default_toml() -> TomlConfig {
    let Some(path) = default_config_file() else {
        return TomlConfig::default();
    };
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }
    match TomlConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file: {}", e);
            TomlConfig::default()
        }
    }
}

/// OS-dependent default data root
pub fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("foodb"))
        .unwrap_or_else(|| PathBuf::from("./foodb_data"))
}
