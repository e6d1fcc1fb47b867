use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use stencil::catalog::{Pattern, PatternCatalog, PatternKind, CATALOG_SCHEMA_VERSION};

fn field(name: &str, ty: &str, source: &str) -> Pattern {
    Pattern::new(PatternKind::FormField, name, Path::new(source), None)
        .with_attr("type", json!(ty))
}

fn component(name: &str, source: &str) -> Pattern {
    Pattern::new(PatternKind::ComponentUsage, name, Path::new(source), None)
}

#[test]
fn test_add_is_idempotent() {
    let patterns = vec![
        field("email", "email", "src/a.ts"),
        component("DataTable", "src/b.tsx"),
    ];

    let mut once = PatternCatalog::new();
    once.add(patterns.clone());

    let mut twice = PatternCatalog::new();
    twice.add(patterns.clone());
    twice.add(patterns);

    assert!(once.same_entries(&twice));
    assert_eq!(twice.len(), 2);
}

#[test]
fn test_export_import_round_trip() {
    let mut catalog = PatternCatalog::new();
    catalog.add(vec![
        field("email", "email", "src/a.ts"),
        field("age", "number", "src/b.ts"),
        component("DataTable", "src/c.tsx"),
        Pattern::new(PatternKind::NavigationItem, "Customers", Path::new("src/nav.ts"), None)
            .with_attr("route", json!("/customers")),
    ]);

    let exported = catalog.export().unwrap();
    let (imported, warnings) = PatternCatalog::import(&exported);

    assert!(warnings.is_empty());
    assert!(catalog.same_entries(&imported));
    assert_eq!(imported.version, CATALOG_SCHEMA_VERSION);
    assert!(imported.generated_at.is_some());
}

#[test]
fn test_import_rejects_future_version_as_empty() {
    let serialized = format!(
        r#"{{"version": {}, "patterns": [{{"kind": "form-field", "name": "email"}}]}}"#,
        CATALOG_SCHEMA_VERSION + 1
    );

    let (imported, warnings) = PatternCatalog::import(&serialized);
    assert!(imported.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].reason.contains("schema version"));
}

#[test]
fn test_import_ignores_unknown_kinds() {
    let serialized = format!(
        r#"{{"version": {}, "patterns": [
            {{"kind": "hologram-usage", "name": "Spinny"}},
            {{"kind": "form-field", "name": "email", "attributes": {{"type": "email"}}}}
        ]}}"#,
        CATALOG_SCHEMA_VERSION
    );

    let (imported, _) = PatternCatalog::import(&serialized);
    assert_eq!(imported.len(), 1);
    assert!(imported.get(PatternKind::FormField, "email").is_some());
}

#[test]
fn test_import_of_garbage_warns_instead_of_failing() {
    let (imported, warnings) = PatternCatalog::import("{not json");
    assert!(imported.is_empty());
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_conflict_keeps_both_values_and_both_sources() {
    let mut catalog = PatternCatalog::new();
    catalog.add(vec![field("age", "number", "src/a.ts")]);
    catalog.add(vec![field("age", "decimal", "src/b.ts")]);

    assert_eq!(catalog.len(), 1);
    let entry = catalog.get(PatternKind::FormField, "age").unwrap();
    assert_eq!(entry.attributes["type"], json!(["number", "decimal"]));
    assert!(entry.sources.contains(Path::new("src/a.ts")));
    assert!(entry.sources.contains(Path::new("src/b.ts")));
}

#[test]
fn test_merge_composes_catalogs() {
    let mut left = PatternCatalog::new();
    left.add(vec![field("email", "email", "src/a.ts")]);

    let mut right = PatternCatalog::new();
    right.add(vec![
        field("email", "email", "src/b.ts"),
        component("DataTable", "src/c.tsx"),
    ]);

    left.merge(right);

    assert_eq!(left.len(), 2);
    let email = left.get(PatternKind::FormField, "email").unwrap();
    assert_eq!(email.sources.len(), 2);
}

#[test]
fn test_name_normalization_trims_whitespace() {
    let mut catalog = PatternCatalog::new();
    catalog.add(vec![field("  email ", "email", "src/a.ts"), field("email", "email", "src/b.ts")]);

    assert_eq!(catalog.len(), 1);
    assert!(catalog.get(PatternKind::FormField, "email").is_some());
}

#[test]
fn test_stats_count_per_kind() {
    let mut catalog = PatternCatalog::new();
    catalog.add(vec![
        field("email", "email", "src/a.ts"),
        field("age", "number", "src/a.ts"),
        component("DataTable", "src/b.tsx"),
        Pattern::new(PatternKind::NavigationItem, "Home", Path::new("src/nav.ts"), None),
    ]);

    let stats = catalog.stats();
    assert_eq!(stats.form_fields, 2);
    assert_eq!(stats.component_usages, 1);
    assert_eq!(stats.navigation_items, 1);
    assert_eq!(stats.datasource_usages, 0);
    assert_eq!(stats.total(), 4);
}

#[test]
fn test_exported_document_shape() {
    let mut catalog = PatternCatalog::new();
    catalog.add(vec![field("email", "email", "src/a.ts")]);

    let exported = catalog.export().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&exported).unwrap();

    assert_eq!(doc["version"], json!(CATALOG_SCHEMA_VERSION));
    assert_eq!(doc["patterns"][0]["kind"], json!("form-field"));
    assert_eq!(doc["patterns"][0]["name"], json!("email"));
    assert_eq!(doc["patterns"][0]["attributes"]["type"], json!("email"));
    assert_eq!(doc["patterns"][0]["sources"], json!(["src/a.ts"]));
}
