//! Stencil is a pattern-scanning and code-generation system for existing
//! projects. It discovers framework usage patterns in a source tree,
//! aggregates them into a portable catalog, and renders new source files
//! from cached templates driven by that catalog or by user-supplied models.

/// Pattern catalog: aggregation, deduplication and JSON import/export
pub mod catalog;

/// Command-line interface module for the Stencil application
pub mod cli;

/// Project configuration handling
/// Supports JSON and YAML formats (stencil.json, stencil.yml, stencil.yaml)
pub mod config;

/// Error types and handling for the Stencil application
pub mod error;

/// Structural matchers and pattern extraction from syntax trees
pub mod extractor;

/// Closed field-type vocabulary for form-field patterns
pub mod fields;

/// Output generation: model validation, rendering and atomic file writes
pub mod generator;

/// File and directory ignore patterns
/// Processes .stencilignore files and conventional build-directory exclusions
pub mod ignore;

/// Template source resolution and reading
pub mod loader;

/// Pipeline orchestration
/// Combines all components: scan, extract, merge, render, write
pub mod processor;

/// Template compilation and caching
pub mod renderer;

/// Source tree scanning and dialect detection
pub mod scanner;

/// Generic syntax tree lowering for scanned source files
pub mod syntax;
