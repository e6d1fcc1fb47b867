//! Template source resolution and reading.
//!
//! Templates live on disk as `<templates_dir>/<category>/<name>.j2`, with
//! a `common/<name>.j2` fallback shared across categories. Partials live
//! under `partials/` and per-category data-model schemas as
//! `<category>/schema.json`.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Template file extension
pub const TEMPLATE_EXT: &str = "j2";

/// Category searched when a template is not found under its own category
pub const COMMON_CATEGORY: &str = "common";

/// Directory of partial templates registered with every environment
pub const PARTIALS_DIR: &str = "partials";

/// File name of the optional per-category data-model schema
pub const SCHEMA_FILE: &str = "schema.json";

/// Identifies one template within the templates directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateKey {
    pub category: String,
    pub name: String,
}

impl TemplateKey {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self { category: category.into(), name: name.into() }
    }

    /// Stable identifier used to key the compiled-template cache.
    pub fn cache_id(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Modification fingerprint of a template source file. A cached compiled
/// template is reused only while its fingerprint matches the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    len: u64,
    modified: SystemTime,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Result<Fingerprint> {
        let metadata = fs::metadata(path).map_err(Error::Io)?;
        Ok(Fingerprint {
            len: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }
}

/// Read-only view of a templates directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates_dir: PathBuf,
}

impl TemplateStore {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self { templates_dir: templates_dir.into() }
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Resolves a key to its source file: the category directory first,
    /// then the `common` fallback.
    pub fn resolve(&self, key: &TemplateKey) -> Option<PathBuf> {
        let file_name = format!("{}.{}", key.name, TEMPLATE_EXT);

        let direct = self.templates_dir.join(&key.category).join(&file_name);
        if direct.is_file() {
            return Some(direct);
        }

        let common = self.templates_dir.join(COMMON_CATEGORY).join(&file_name);
        if common.is_file() {
            debug!("template '{}' resolved from '{}'", key, COMMON_CATEGORY);
            return Some(common);
        }

        None
    }

    /// Existence check that never reads or compiles anything.
    pub fn exists(&self, key: &TemplateKey) -> bool {
        self.resolve(key).is_some()
    }

    /// Reads the template source along with its fingerprint.
    ///
    /// # Errors
    /// * `Error::TemplateNotFound` when the key resolves to no file
    /// * `Error::Io` when the file cannot be read
    pub fn read(&self, key: &TemplateKey) -> Result<(String, Fingerprint)> {
        let path = self.resolve(key).ok_or_else(|| Error::TemplateNotFound {
            category: key.category.clone(),
            name: key.name.clone(),
        })?;
        let fingerprint = Fingerprint::of(&path)?;
        let source = fs::read_to_string(&path).map_err(Error::Io)?;
        Ok((source, fingerprint))
    }

    /// Current fingerprint of the template source on disk.
    pub fn fingerprint(&self, key: &TemplateKey) -> Result<Fingerprint> {
        let path = self.resolve(key).ok_or_else(|| Error::TemplateNotFound {
            category: key.category.clone(),
            name: key.name.clone(),
        })?;
        Fingerprint::of(&path)
    }

    /// Loads the optional data-model schema for a category.
    pub fn load_schema(&self, category: &str) -> Result<Option<serde_json::Value>> {
        let path = self.templates_dir.join(category).join(SCHEMA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(Error::Io)?;
        let schema = serde_json::from_str(&content).map_err(|e| Error::Schema {
            category: category.to_string(),
            reason: format!("schema file is not valid JSON: {}", e),
        })?;
        Ok(Some(schema))
    }

    /// Name/source pairs for every partial template on disk. A missing
    /// partials directory is an empty set, not an error.
    pub fn partials(&self) -> Result<Vec<(String, String)>> {
        let dir = self.templates_dir.join(PARTIALS_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => {
                debug!("no partials directory at '{}'", dir.display());
                return Ok(Vec::new());
            }
        };

        let mut partials = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Error::Io)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(Error::Io)?;
            partials.push((name.to_string(), source));
        }
        partials.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(partials)
    }
}
