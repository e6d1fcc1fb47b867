//! Output generation: data-model validation, rendering and atomic file
//! writes.
//!
//! Each request is handled independently: a missing template, a render
//! failure or an unwritable path is recorded on the shared error list and
//! never aborts the sibling requests. Writes go through a staging file in
//! the destination directory followed by a rename, so a crash mid-write
//! cannot leave a half-written output.

use crate::error::{Error, Result};
use crate::loader::TemplateKey;
use crate::renderer::TemplateCache;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One unit of generation: a template reference, the data model to bind,
/// and the output path to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub template: TemplateKey,
    pub model: serde_json::Value,
    #[serde(rename = "output")]
    pub output_path: PathBuf,
}

impl GenerationRequest {
    pub fn new(
        template: TemplateKey,
        model: serde_json::Value,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self { template, model, output_path: output_path.into() }
    }
}

/// A failed request, kept alongside the successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationError {
    pub template: TemplateKey,
    pub output_path: PathBuf,
    pub reason: String,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> '{}': {}",
            self.template,
            self.output_path.display(),
            self.reason
        )
    }
}

/// Aggregate outcome of a generation run. `success` holds exactly when
/// the error list is empty.
#[derive(Debug, Default)]
pub struct GenerationResult {
    pub written: Vec<PathBuf>,
    pub success: bool,
    pub errors: Vec<GenerationError>,
}

/// Binds data models to cached templates and writes the rendered output.
pub struct Generator<'a> {
    cache: &'a TemplateCache,
    overwrite: bool,
}

impl<'a> Generator<'a> {
    pub fn new(cache: &'a TemplateCache, overwrite: bool) -> Self {
        Self { cache, overwrite }
    }

    /// Processes every request, isolating failures per request.
    pub fn generate(&self, requests: &[GenerationRequest]) -> GenerationResult {
        let mut result = GenerationResult::default();

        for request in requests {
            match self.generate_one(request) {
                Ok(path) => {
                    debug!("wrote '{}'", path.display());
                    result.written.push(path);
                }
                Err(e) => {
                    warn!("request {} failed: {}", request.template, e);
                    result.errors.push(GenerationError {
                        template: request.template.clone(),
                        output_path: request.output_path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        result.success = result.errors.is_empty();
        result
    }

    fn generate_one(&self, request: &GenerationRequest) -> Result<PathBuf> {
        self.validate_model(request)?;
        let template = self.cache.load_template(&request.template)?;
        let rendered = template.render(&request.model)?;
        write_atomic(&request.output_path, &rendered, self.overwrite)?;
        Ok(request.output_path.clone())
    }

    /// Checks the data model against the category schema when one exists,
    /// turning render-time surprises into construction-time rejections.
    fn validate_model(&self, request: &GenerationRequest) -> Result<()> {
        let Some(schema) = self.cache.load_schema(&request.template.category)? else {
            return Ok(());
        };
        let validator = jsonschema::validator_for(&schema).map_err(|e| Error::Schema {
            category: request.template.category.clone(),
            reason: format!("invalid schema: {}", e),
        })?;
        if let Err(error) = validator.validate(&request.model) {
            return Err(Error::Schema {
                category: request.template.category.clone(),
                reason: error.to_string(),
            });
        }
        Ok(())
    }
}

/// Writes content through a staging file in the destination directory and
/// commits it with a rename.
///
/// # Errors
/// * `Error::Write` when the destination exists without `overwrite`, or
///   when staging or the final rename fails
pub fn write_atomic(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(Error::Write {
            path: path.display().to_string(),
            reason: "destination already exists".to_string(),
        });
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut staging = NamedTempFile::new_in(parent).map_err(|e| Error::Write {
        path: path.display().to_string(),
        reason: format!("staging file failed: {}", e),
    })?;
    staging.write_all(content.as_bytes()).map_err(|e| Error::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    staging.persist(path).map_err(|e| Error::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Rejects request lists where two requests target the same output path.
/// Which of two such writes would win is undefined, so the list is
/// refused before any work starts.
pub fn reject_duplicate_outputs(requests: &[GenerationRequest]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for request in requests {
        if !seen.insert(&request.output_path) {
            return Err(Error::Config(format!(
                "two generation requests target '{}'",
                request.output_path.display()
            )));
        }
    }
    Ok(())
}
