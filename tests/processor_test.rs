use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stencil::catalog::{PatternCatalog, PatternKind};
use stencil::error::Error;
use stencil::extractor::MatcherRegistry;
use stencil::generator::GenerationRequest;
use stencil::ignore::parse_scanignore_file;
use stencil::loader::{TemplateKey, TemplateStore};
use stencil::processor::{Pipeline, RunState};
use stencil::renderer::TemplateCache;
use stencil::scanner::SourceScanner;
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scanner_over(root: &Path) -> SourceScanner {
    let exclude = parse_scanignore_file(root, &[]).unwrap();
    SourceScanner::new(root, globset::GlobSet::empty(), exclude)
}

fn seed_project(root: &Path) {
    write_file(
        root,
        "src/fields.ts",
        r#"export const emailField = { name: "email", type: "email", required: true };"#,
    );
    write_file(
        root,
        "src/nav.ts",
        r#"export const nav = { label: "Customers", route: "/customers" };"#,
    );
    write_file(
        root,
        "src/list.tsx",
        r#"
export function CustomerList() {
  const ds = useRemoteDataSource("customers");
  return <DataTable dataSource={ds} />;
}
"#,
    );
    // Vendored code must not contribute patterns.
    write_file(
        root,
        "node_modules/lib/field.ts",
        r#"export const f = { name: "vendored", type: "text" };"#,
    );
}

#[test_log::test]
fn test_scan_builds_catalog_from_tree() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let report = Pipeline::new(&scanner, &registry).scan(None).unwrap();

    assert_eq!(report.state, RunState::Done);
    assert!(report.success);
    assert_eq!(report.files_scanned, 3);

    let catalog = &report.catalog;
    assert!(catalog.get(PatternKind::FormField, "email").is_some());
    assert!(catalog.get(PatternKind::NavigationItem, "Customers").is_some());
    assert!(catalog.get(PatternKind::DatasourceUsage, "customers").is_some());
    assert!(catalog.get(PatternKind::ComponentUsage, "DataTable").is_some());
    assert!(catalog.get(PatternKind::FormField, "vendored").is_none());
}

#[test]
fn test_empty_tree_is_not_an_error() {
    let project = TempDir::new().unwrap();
    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();

    let report = Pipeline::new(&scanner, &registry).scan(None).unwrap();
    assert!(report.success);
    assert_eq!(report.files_scanned, 0);
    assert!(report.catalog.is_empty());
    assert_eq!(report.catalog.version, stencil::catalog::CATALOG_SCHEMA_VERSION);
}

#[test]
fn test_missing_root_fails_the_run() {
    let scanner = SourceScanner::new(
        Path::new("/definitely/not/here"),
        globset::GlobSet::empty(),
        globset::GlobSet::empty(),
    );
    let registry = MatcherRegistry::default();

    match Pipeline::new(&scanner, &registry).scan(None) {
        Err(Error::Io(_)) => {}
        other => panic!("Expected fatal Error::Io, got ok={}", other.is_ok()),
    }
}

#[test]
fn test_scanning_twice_is_idempotent() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let pipeline = Pipeline::new(&scanner, &registry);

    let first = pipeline.scan(None).unwrap();
    let second = pipeline.scan(None).unwrap();
    assert!(first.catalog.same_entries(&second.catalog));
}

#[test]
fn test_conflicting_files_share_one_entry() {
    let project = TempDir::new().unwrap();
    write_file(
        project.path(),
        "src/a.ts",
        r#"const f = { name: "age", type: "number" };"#,
    );
    write_file(
        project.path(),
        "src/b.ts",
        r#"const f = { name: "age", type: "decimal" };"#,
    );

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let report = Pipeline::new(&scanner, &registry).scan(None).unwrap();

    let entry = report.catalog.get(PatternKind::FormField, "age").unwrap();
    assert_eq!(report.catalog.stats().form_fields, 1);
    assert_eq!(entry.sources.len(), 2);
    assert_eq!(entry.attributes["type"], json!(["number", "decimal"]));
}

#[test]
fn test_scan_merges_previously_exported_catalog() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let pipeline = Pipeline::new(&scanner, &registry);

    let exported = pipeline.scan(None).unwrap().catalog.export().unwrap();
    let (previous, _) = PatternCatalog::import(&exported);

    let merged = pipeline.scan(Some(previous)).unwrap();
    // Same tree re-scanned over its own export collapses to the same set.
    assert!(merged.catalog.same_entries(&pipeline.scan(None).unwrap().catalog));
}

#[test]
fn test_malformed_file_warns_but_run_succeeds() {
    let project = TempDir::new().unwrap();
    write_file(project.path(), "src/ok.ts", r#"const f = { name: "a", type: "text" };"#);
    write_file(project.path(), "src/broken.ts", "const broken = { name: \"b\", type:");

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let report = Pipeline::new(&scanner, &registry).scan(None).unwrap();

    assert!(report.success);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.path.contains("broken.ts") && w.reason.contains("syntax errors")));
    assert!(report.catalog.get(PatternKind::FormField, "a").is_some());
}

#[test]
fn test_abort_flag_stops_extraction_between_files() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let abort = Arc::new(AtomicBool::new(false));
    abort.store(true, Ordering::Relaxed);

    let report = Pipeline::new(&scanner, &registry)
        .with_abort(Arc::clone(&abort))
        .scan(None)
        .unwrap();

    assert!(report.catalog.is_empty());
    assert_eq!(report.files_scanned, 3);
}

#[test_log::test]
fn test_full_run_with_partial_generation_failure() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());
    let templates = TempDir::new().unwrap();
    write_file(templates.path(), "forms/basic.j2", "form {{ name }}");
    let output = TempDir::new().unwrap();

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let cache = TemplateCache::new(TemplateStore::new(templates.path())).unwrap();

    let good = output.path().join("good.ts");
    let bad = output.path().join("bad.ts");
    let requests = vec![
        GenerationRequest::new(TemplateKey::new("forms", "basic"), json!({"name": "x"}), &good),
        GenerationRequest::new(TemplateKey::new("forms", "missing"), json!({"name": "y"}), &bad),
    ];

    let report = Pipeline::new(&scanner, &registry)
        .run(&cache, &requests, false, None)
        .unwrap();

    assert_eq!(report.state, RunState::Done);
    assert!(!report.success);
    let generation = report.generation.unwrap();
    assert_eq!(generation.written, vec![good.clone()]);
    assert_eq!(generation.errors.len(), 1);
    assert!(good.exists());
    assert!(!bad.exists());
}

#[test]
fn test_full_run_success() {
    let project = TempDir::new().unwrap();
    seed_project(project.path());
    let templates = TempDir::new().unwrap();
    write_file(templates.path(), "forms/basic.j2", "form {{ name }}");
    let output = TempDir::new().unwrap();

    let scanner = scanner_over(project.path());
    let registry = MatcherRegistry::default();
    let cache = TemplateCache::new(TemplateStore::new(templates.path())).unwrap();

    let out = output.path().join("form.ts");
    let requests = vec![GenerationRequest::new(
        TemplateKey::new("forms", "basic"),
        json!({"name": "customer"}),
        &out,
    )];

    let report = Pipeline::new(&scanner, &registry)
        .run(&cache, &requests, false, None)
        .unwrap();

    assert!(report.success);
    assert_eq!(fs::read_to_string(out).unwrap(), "form customer");
}
