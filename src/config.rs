//! Project configuration handling for Stencil runs.
//! This module loads the optional per-project configuration file that
//! tunes scanning filters and matcher name sets.

use crate::error::{Error, Result};
use crate::extractor::MatcherConfig;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Supported configuration file names
pub const CONFIG_FILES: [&str; 3] = ["stencil.json", "stencil.yml", "stencil.yaml"];

/// Per-project settings. Every field is optional; absent fields fall back
/// to built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Include globs for scanning; empty admits every recognized source file
    pub include: Vec<String>,
    /// Extra exclude globs applied on top of the conventional exclusions
    pub exclude: Vec<String>,
    /// Templates directory used by generation
    pub templates_dir: Option<PathBuf>,
    /// Known component names (trailing `*` for prefixes)
    pub components: Vec<String>,
    /// Remote data-source method names
    pub datasource_methods: Vec<String>,
    /// Field validation decorator names
    pub validators: Vec<String>,
}

impl ProjectConfig {
    /// Matcher name sets, with built-in defaults where the file is silent.
    pub fn matcher_config(&self) -> MatcherConfig {
        let mut config = MatcherConfig::default();
        if !self.components.is_empty() {
            config.components = self.components.clone();
        }
        if !self.datasource_methods.is_empty() {
            config.datasource_methods = self.datasource_methods.clone();
        }
        if !self.validators.is_empty() {
            config.validators = self.validators.clone();
        }
        config
    }
}

/// Loads configuration from a project root, trying multiple file formats.
/// Supports: stencil.json, stencil.yml, stencil.yaml. A project without a
/// configuration file gets the defaults.
///
/// # Errors
/// * `Error::Config` if a present file cannot be parsed
pub fn load_config<P: AsRef<Path>>(root: P) -> Result<ProjectConfig> {
    for file in CONFIG_FILES {
        let config_path = root.as_ref().join(file);
        if !config_path.exists() {
            continue;
        }
        debug!("loading configuration from {}", config_path.display());
        let content = std::fs::read_to_string(&config_path).map_err(Error::Io)?;

        // Try parsing as JSON first, then YAML.
        let config = match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(_) => serde_yaml::from_str(&content).map_err(|e| {
                Error::Config(format!("invalid configuration format: {}", e))
            })?,
        };
        return Ok(config);
    }

    debug!("no configuration file found; using defaults");
    Ok(ProjectConfig::default())
}
