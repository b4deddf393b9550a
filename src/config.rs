//! Configuration loader - YAML viewer settings + .env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::Palette;
use crate::records::Field;
use crate::view::ViewSpec;

/// Viewer configuration loaded from viewer.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record document produced by the ETL pipeline
    pub data_path: PathBuf,
    /// Default "color by" field name
    pub color_by: String,
    pub legend: LegendConfig,
    pub palette: Palette,
    /// Fields whose options come from every record
    pub dropdown_fields: Vec<Field>,
    /// Fields whose values come from the visible records
    pub legend_fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub max_items: usize,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self { max_items: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        let spec = ViewSpec::default();
        Self {
            data_path: PathBuf::from("public/data/map_points.json"),
            color_by: Field::Species.name().to_string(),
            legend: LegendConfig::default(),
            palette: Palette::default(),
            dropdown_fields: spec.dropdown_fields,
            legend_fields: spec.legend_fields,
        }
    }
}

/// Overrides loaded from .env / the process environment
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub data_path: Option<PathBuf>,
    pub log_dir: String,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content).with_context(|| format!("parsing {:?}", path))?;
        Ok(config)
    }

    /// Load if the file exists, otherwise defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn view_spec(&self) -> ViewSpec {
        ViewSpec {
            dropdown_fields: self.dropdown_fields.clone(),
            legend_fields: self.legend_fields.clone(),
        }
    }

    /// Data path after applying the environment override
    pub fn resolve_data_path(&self, env: &Env) -> PathBuf {
        env.data_path.clone().unwrap_or_else(|| self.data_path.clone())
    }
}

impl Env {
    /// Load overrides from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            data_path: std::env::var("ITHOMIINI_DATA").ok().map(PathBuf::from),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
