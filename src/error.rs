//! Error handling for the Stencil application.
//! Defines custom error types and results used throughout the application.

use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Custom error types for Stencil operations.
///
/// Only `Io` is fatal to a whole run (missing or unreadable scan root).
/// Every other variant is scoped to one file, one template, or one
/// generation request and is reported as data rather than propagated.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Represents a source file that could not be parsed
    #[error("failed to parse '{path}': {reason}")]
    Parse { path: String, reason: String },

    /// Represents a template reference that resolves to no file on disk
    #[error("template '{category}/{name}' does not exist")]
    TemplateNotFound { category: String, name: String },

    /// Represents a template source that failed to compile
    #[error("template '{category}/{name}' failed to compile: {reason}")]
    TemplateSyntax {
        category: String,
        name: String,
        reason: String,
    },

    /// Represents errors raised by the rendering engine
    #[error("template rendering error: {0}")]
    Minijinja(#[from] minijinja::Error),

    /// Represents an output path that could not be written
    #[error("cannot write '{path}': {reason}")]
    Write { path: String, reason: String },

    /// Represents a data model that failed its category schema check
    #[error("data model rejected for category '{category}': {reason}")]
    Schema { category: String, reason: String },

    /// Represents errors during configuration parsing or processing
    #[error("configuration error: {0}")]
    Config(String),

    /// Represents errors in catalog import or export
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Represents errors in processing ignore patterns
    #[error("ignore pattern error: {0}")]
    Ignore(String),

    /// Summarizes a generation run that finished with per-request errors
    #[error("generation finished with errors: {0}")]
    Generation(String),
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A recoverable, per-file problem recorded on a report instead of
/// aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub path: String,
    pub reason: String,
}

impl Warning {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.path, self.reason)
    }
}

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
