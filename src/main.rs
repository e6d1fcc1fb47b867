//! Stencil's main application entry point and orchestration logic.
//! Handles command-line argument parsing and coordinates the scan and
//! generate flows across the library modules.

use std::fs;
use std::path::PathBuf;

use stencil::{
    catalog::PatternCatalog,
    cli::{get_args, Args, Command},
    config::load_config,
    error::{default_error_handler, Error, Result},
    extractor::MatcherRegistry,
    generator::{reject_duplicate_outputs, write_atomic, GenerationRequest, Generator},
    ignore::{build_include_set, parse_scanignore_file},
    loader::{TemplateKey, TemplateStore},
    processor::{Pipeline, RunReport},
    renderer::TemplateCache,
    scanner::SourceScanner,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Scan { path, catalog, merge, include, exclude } => {
            run_scan(path, catalog, merge, include, exclude)
        }
        Command::Generate { category, name, data, out, plan, templates, overwrite } => {
            run_generate(category, name, data, out, plan, templates, overwrite)
        }
    }
}

fn run_scan(
    path: PathBuf,
    catalog_out: Option<PathBuf>,
    merge: Option<PathBuf>,
    include: Vec<String>,
    exclude: Vec<String>,
) -> Result<()> {
    let config = load_config(&path)?;

    let mut include_patterns = config.include.clone();
    include_patterns.extend(include);
    let mut exclude_patterns = config.exclude.clone();
    exclude_patterns.extend(exclude);

    let include_set = build_include_set(&include_patterns)?;
    let exclude_set = parse_scanignore_file(&path, &exclude_patterns)?;

    let scanner = SourceScanner::new(path, include_set, exclude_set);
    let registry = MatcherRegistry::with_defaults(&config.matcher_config());
    let pipeline = Pipeline::new(&scanner, &registry);

    let previous = match merge {
        Some(merge_path) => {
            let content = fs::read_to_string(&merge_path).map_err(Error::Io)?;
            let (imported, warnings) = PatternCatalog::import(&content);
            for warning in &warnings {
                println!("Warning: {}", warning);
            }
            Some(imported)
        }
        None => None,
    };

    let report = pipeline.scan(previous)?;
    print_scan_report(&report);

    if let Some(out) = catalog_out {
        let document = report.catalog.export()?;
        write_atomic(&out, &document, true)?;
        println!("Catalog written to '{}'", out.display());
    }

    Ok(())
}

fn print_scan_report(report: &RunReport) {
    let stats = report.catalog.stats();
    println!(
        "Scanned {} files: {} patterns ({} components, {} data sources, {} form fields, {} navigation items)",
        report.files_scanned,
        stats.total(),
        stats.component_usages,
        stats.datasource_usages,
        stats.form_fields,
        stats.navigation_items,
    );
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
}

fn run_generate(
    category: Option<String>,
    name: Option<String>,
    data: Option<PathBuf>,
    out: Option<PathBuf>,
    plan: Option<PathBuf>,
    templates: Option<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let requests = build_requests(category, name, data, out, plan)?;
    reject_duplicate_outputs(&requests)?;

    let config = load_config(".")?;
    let templates_dir = templates
        .or(config.templates_dir)
        .unwrap_or_else(|| PathBuf::from("templates"));

    let store = TemplateStore::new(templates_dir);
    let cache = TemplateCache::new(store)?;
    let generator = Generator::new(&cache, overwrite);
    let result = generator.generate(&requests);

    for path in &result.written {
        println!("Created: '{}'", path.display());
    }
    for error in &result.errors {
        println!("Error: {}", error);
    }

    if !result.success {
        return Err(Error::Generation(format!(
            "{} of {} requests failed",
            result.errors.len(),
            requests.len()
        )));
    }

    println!("Generation completed successfully.");
    Ok(())
}

fn build_requests(
    category: Option<String>,
    name: Option<String>,
    data: Option<PathBuf>,
    out: Option<PathBuf>,
    plan: Option<PathBuf>,
) -> Result<Vec<GenerationRequest>> {
    if let Some(plan_path) = plan {
        let content = fs::read_to_string(&plan_path).map_err(Error::Io)?;
        return serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid plan file: {}", e)));
    }

    let (Some(category), Some(name), Some(out)) = (category, name, out) else {
        return Err(Error::Config(
            "either --plan or CATEGORY, NAME and --out are required".to_string(),
        ));
    };

    let model = match data {
        Some(data_path) => {
            let content = fs::read_to_string(&data_path).map_err(Error::Io)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("invalid data model: {}", e)))?
        }
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    Ok(vec![GenerationRequest::new(TemplateKey::new(category, name), model, out)])
}
