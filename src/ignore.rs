//! File and directory ignore pattern handling for Stencil scans.
//! This module processes .stencilignore files and the conventional
//! dependency/build-directory exclusions, similar to .gitignore handling.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::{fs::read_to_string, path::Path};

/// Stencil's ignore file name
pub const IGNORE_FILE: &str = ".stencilignore";

/// Paths excluded from every scan by convention.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 11] = [
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/.git/**",
    "**/out/**",
    "**/*.d.ts",
    "**/*.min.js",
    "**/*.test.*",
    "**/*.spec.*",
    "**/.DS_Store",
];

/// Builds the exclusion glob set for a scan root.
///
/// Combines, in order: the conventional default patterns, the lines of
/// `<root>/.stencilignore` when present, and any extra patterns supplied
/// by configuration or the command line.
///
/// # Errors
/// * `Error::Ignore` if any pattern is not a valid glob
pub fn parse_scanignore_file<P: AsRef<Path>>(root: P, extra: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in DEFAULT_IGNORE_PATTERNS {
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::Ignore(format!("default pattern loading failed: {}", e))
        })?);
    }

    let ignore_path = root.as_ref().join(IGNORE_FILE);
    if let Ok(contents) = read_to_string(&ignore_path) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            builder.add(Glob::new(line).map_err(|e| {
                Error::Ignore(format!(".stencilignore loading failed: {}", e))
            })?);
        }
    } else {
        debug!(".stencilignore does not exist");
    }

    for pattern in extra {
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::Ignore(format!("exclude pattern '{}' is invalid: {}", pattern, e))
        })?);
    }

    let glob_set = builder
        .build()
        .map_err(|e| Error::Ignore(format!("ignore pattern set failed to build: {}", e)))?;

    Ok(glob_set)
}

/// Builds a glob set from include patterns. An empty pattern list yields
/// an empty set, which the scanner treats as "include everything".
pub fn build_include_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::Ignore(format!("include pattern '{}' is invalid: {}", pattern, e))
        })?);
    }
    builder
        .build()
        .map_err(|e| Error::Ignore(format!("include pattern set failed to build: {}", e)))
}
