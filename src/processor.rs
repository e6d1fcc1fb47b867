//! Pipeline orchestration for Stencil.
//! Combines scanner, extractor, catalog, cache and generator into one run:
//! `Idle -> Scanning -> Extracting -> Merging -> Rendering -> Writing ->
//! {Done | Failed}`.

use crate::catalog::PatternCatalog;
use crate::error::{Result, Warning};
use crate::extractor::MatcherRegistry;
use crate::generator::{GenerationRequest, GenerationResult, Generator};
use crate::renderer::TemplateCache;
use crate::scanner::SourceScanner;
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Extracting,
    Merging,
    Rendering,
    Writing,
    Done,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Scanning => "scanning",
            RunState::Extracting => "extracting",
            RunState::Merging => "merging",
            RunState::Rendering => "rendering",
            RunState::Writing => "writing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one run. Warnings and per-request errors are enumerated in
/// full; `success` is false when any request failed or when requests were
/// given but nothing was written.
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub catalog: PatternCatalog,
    pub files_scanned: usize,
    pub warnings: Vec<Warning>,
    pub generation: Option<GenerationResult>,
    pub success: bool,
}

/// Drives a scan/extract/merge run and optional generation over the
/// resulting catalog. All collaborators are constructed by the caller and
/// passed in; nothing here reaches for ambient state.
pub struct Pipeline<'a> {
    scanner: &'a SourceScanner,
    registry: &'a MatcherRegistry,
    abort: Option<Arc<AtomicBool>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(scanner: &'a SourceScanner, registry: &'a MatcherRegistry) -> Self {
        Self { scanner, registry, abort: None }
    }

    /// Installs a cooperative cancellation flag, checked between
    /// whole-file units of work.
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    fn aborted(&self) -> bool {
        self.abort.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Scans the tree, extracts patterns and merges them into a catalog,
    /// optionally seeded from a previously exported one.
    ///
    /// # Errors
    /// * `Error::Io` if the scan root is missing or unreadable, the only
    ///   fatal condition; every other problem lands on the report
    pub fn scan(&self, previous: Option<PatternCatalog>) -> Result<RunReport> {
        debug!("state: {}", RunState::Scanning);
        let (files, mut warnings) = self.scanner.collect_sources()?;

        debug!("state: {} ({} files)", RunState::Extracting, files.len());
        // Workers fill private buffers; the catalog is only touched at the
        // sequential merge below.
        let extractions: Vec<(Vec<crate::catalog::Pattern>, Option<Warning>)> = files
            .par_iter()
            .map(|file| {
                if self.aborted() {
                    return (Vec::new(), None);
                }
                match self.registry.extract_file(file) {
                    Ok(extraction) => {
                        let warning = extraction.had_syntax_errors.then(|| {
                            Warning::new(
                                file.path.display().to_string(),
                                "file contains syntax errors; extracted from intact subtrees",
                            )
                        });
                        (extraction.patterns, warning)
                    }
                    Err(e) => (Vec::new(), Some(Warning::new(
                        file.path.display().to_string(),
                        e.to_string(),
                    ))),
                }
            })
            .collect();

        debug!("state: {}", RunState::Merging);
        let mut catalog = previous.unwrap_or_default();
        for (patterns, warning) in extractions {
            warnings.extend(warning);
            warnings.extend(catalog.add(patterns));
        }

        debug!("state: {}", RunState::Done);
        Ok(RunReport {
            state: RunState::Done,
            files_scanned: files.len(),
            catalog,
            warnings,
            generation: None,
            success: true,
        })
    }

    /// Full run: scan as above, then render and write the given requests
    /// against the cache. Per-request failures accumulate on the result;
    /// the run still reaches `Done`.
    pub fn run(
        &self,
        cache: &TemplateCache,
        requests: &[GenerationRequest],
        overwrite: bool,
        previous: Option<PatternCatalog>,
    ) -> Result<RunReport> {
        let mut report = self.scan(previous)?;
        if requests.is_empty() {
            return Ok(report);
        }

        // Rendering and writing interleave per request inside the
        // generator; failures there are isolated, not fatal.
        debug!("state: {}", RunState::Rendering);
        let generator = Generator::new(cache, overwrite);
        let generation = generator.generate(requests);
        debug!("state: {}", RunState::Writing);

        report.success = generation.success && !generation.written.is_empty();
        report.generation = Some(generation);
        report.state = RunState::Done;
        Ok(report)
    }
}
