//! Source tree scanning for Stencil.
//! Walks a project directory, filters out non-source and vendored paths,
//! detects the dialect of each candidate file and yields its content.

use crate::error::{Error, Result, Warning};
use globset::GlobSet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into, regardless of glob filters.
pub const EXCLUDED_DIRS: [&str; 8] =
    ["node_modules", "dist", "build", ".git", "coverage", ".next", "out", "target"];

/// Source dialects the extractor can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    /// Detect the dialect from a file extension string.
    pub fn from_extension(ext: Option<&str>) -> Option<Dialect> {
        match ext? {
            "ts" | "mts" | "cts" => Some(Dialect::TypeScript),
            "tsx" => Some(Dialect::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Dialect::JavaScript),
            _ => None,
        }
    }

    /// The tree-sitter grammar used to parse this dialect.
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::TypeScript => "TypeScript",
            Dialect::Tsx => "TSX",
            Dialect::JavaScript => "JavaScript",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate source file. Immutable once read; `path` is relative to
/// the scan root so catalog provenance stays portable.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub dialect: Dialect,
}

/// A single scanner observation: a readable source file, or a file that
/// had to be skipped with the reason why.
#[derive(Debug)]
pub enum ScanEvent {
    Source(SourceFile),
    Skipped(Warning),
}

/// Walks a directory tree and yields candidate source files.
pub struct SourceScanner {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl SourceScanner {
    /// Creates a scanner over `root`. An empty `include` set admits every
    /// recognized source file; `exclude` is applied on top.
    pub fn new(root: impl Into<PathBuf>, include: GlobSet, exclude: GlobSet) -> Self {
        Self { root: root.into(), include, exclude }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns a lazy iterator over the tree. Calling this again restarts
    /// the walk from the root.
    ///
    /// # Errors
    /// * `Error::Io` if the root does not exist or cannot be read, the
    ///   only fatal condition in scanning
    pub fn files(&self) -> Result<ScanIter> {
        if !self.root.exists() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("scan root '{}' does not exist", self.root.display()),
            )));
        }
        // Surfaces permission problems on the root up front.
        fs::read_dir(&self.root).map_err(Error::Io)?;

        Ok(ScanIter {
            root: self.root.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            walker: WalkDir::new(&self.root).into_iter(),
        })
    }

    /// Drains the walk into source files and per-file warnings.
    pub fn collect_sources(&self) -> Result<(Vec<SourceFile>, Vec<Warning>)> {
        let mut sources = Vec::new();
        let mut warnings = Vec::new();
        for event in self.files()? {
            match event {
                ScanEvent::Source(file) => sources.push(file),
                ScanEvent::Skipped(warning) => warnings.push(warning),
            }
        }
        Ok((sources, warnings))
    }
}

/// Lazy iterator over scan events.
pub struct ScanIter {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    walker: walkdir::IntoIter,
}

impl Iterator for ScanIter {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    return Some(ScanEvent::Skipped(Warning::new(path, e.to_string())));
                }
            };

            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                if entry.depth() > 0 && EXCLUDED_DIRS.contains(&name.as_ref()) {
                    debug!("skipping directory '{}'", entry.path().display());
                    self.walker.skip_current_dir();
                }
                continue;
            }

            let path = entry.path();
            let relative = match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => path.to_path_buf(),
            };

            let ext = path.extension().and_then(|e| e.to_str());
            let Some(dialect) = Dialect::from_extension(ext) else {
                continue;
            };

            if !self.include.is_empty() && !self.include.is_match(&relative) {
                continue;
            }
            if self.exclude.is_match(&relative) {
                debug!("skipping '{}' by ignore pattern", relative.display());
                continue;
            }

            match fs::read_to_string(path) {
                Ok(content) => {
                    debug!("scanned '{}' ({})", relative.display(), dialect);
                    return Some(ScanEvent::Source(SourceFile {
                        path: relative,
                        content,
                        dialect,
                    }));
                }
                Err(e) => {
                    return Some(ScanEvent::Skipped(Warning::new(
                        relative.display().to_string(),
                        format!("unreadable file skipped: {}", e),
                    )));
                }
            }
        }
    }
}
