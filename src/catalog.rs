//! Pattern catalog: aggregation, deduplication and portable JSON
//! (de)serialization of extracted patterns.
//!
//! Entries are keyed by (kind, normalized name). Merging unions provenance
//! and keeps every distinct attribute contribution; nothing is silently
//! overwritten.

use crate::error::{Error, Result, Warning};
use crate::fields::FieldType;
use crate::syntax::SourceLocation;
use chrono::Utc;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Version written into every exported catalog document.
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

/// The closed set of pattern kinds this tool extracts. `Unknown` exists
/// only so that catalogs written by future versions can be read; such
/// entries are ignored on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    ComponentUsage,
    DatasourceUsage,
    FormField,
    NavigationItem,
    #[serde(other)]
    Unknown,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::ComponentUsage => "component-usage",
            PatternKind::DatasourceUsage => "datasource-usage",
            PatternKind::FormField => "form-field",
            PatternKind::NavigationItem => "navigation-item",
            PatternKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One recognized code usage. Identity is (kind, name); everything else
/// merges when the same identity is seen again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
    #[serde(default)]
    pub sources: BTreeSet<PathBuf>,
    /// Per-extraction diagnostics; not part of the exported document.
    #[serde(skip)]
    pub location: Option<SourceLocation>,
}

impl Pattern {
    pub fn new(
        kind: PatternKind,
        name: impl Into<String>,
        source: &Path,
        location: Option<SourceLocation>,
    ) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source.to_path_buf());
        Self {
            kind,
            name: normalize_name(&name.into()),
            attributes: IndexMap::new(),
            sources,
            location,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn identity(&self) -> (PatternKind, &str) {
        (self.kind, self.name.as_str())
    }
}

/// Trims surrounding whitespace; pattern names are otherwise kept verbatim
/// so catalogs stay readable against the scanned source.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Per-kind entry counts for the scan report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub component_usages: usize,
    pub datasource_usages: usize,
    pub form_fields: usize,
    pub navigation_items: usize,
}

impl CatalogStats {
    pub fn total(&self) -> usize {
        self.component_usages + self.datasource_usages + self.form_fields + self.navigation_items
    }
}

/// The aggregated, exportable set of patterns for a scanned project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCatalog {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    patterns: Vec<Pattern>,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self { version: CATALOG_SCHEMA_VERSION, generated_at: None, patterns: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn get(&self, kind: PatternKind, name: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.kind == kind && p.name == name)
    }

    /// Merges new patterns into the catalog by identity key.
    ///
    /// Provenance is unioned. An attribute key already present with a
    /// different value keeps both: the entry's value becomes an array of
    /// every distinct contribution, and resolution is deferred to the
    /// consumer. Form-field type strings are checked against the closed
    /// [`FieldType`] set here; unrecognized ones are kept but reported.
    pub fn add(&mut self, patterns: Vec<Pattern>) -> Vec<Warning> {
        let mut warnings = Vec::new();

        for mut pattern in patterns {
            pattern.name = normalize_name(&pattern.name);
            if pattern.kind == PatternKind::Unknown {
                debug!("ignoring pattern '{}' with unknown kind", pattern.name);
                continue;
            }
            if pattern.name.is_empty() {
                continue;
            }

            warnings.extend(validate_form_field(&pattern));

            let position = self
                .patterns
                .iter()
                .position(|p| p.kind == pattern.kind && p.name == pattern.name);
            match position {
                Some(index) => merge_pattern(&mut self.patterns[index], pattern),
                None => self.patterns.push(pattern),
            }
        }

        warnings
    }

    /// Composes another catalog into this one using the `add` policy.
    pub fn merge(&mut self, other: PatternCatalog) -> Vec<Warning> {
        self.add(other.patterns)
    }

    /// Serializes the catalog as a versioned, schema-stable JSON document
    /// with an export timestamp.
    pub fn export(&self) -> Result<String> {
        let mut doc = self.clone();
        doc.generated_at = Some(Utc::now().to_rfc3339());
        doc.patterns.retain(|p| p.kind != PatternKind::Unknown);
        serde_json::to_string_pretty(&doc).map_err(|e| Error::Catalog(e.to_string()))
    }

    /// Reconstructs a catalog from an exported document.
    ///
    /// A document from an unknown future schema version, or one that does
    /// not parse, yields an empty catalog plus a warning rather than a
    /// failure. Entries with unknown kinds are dropped.
    pub fn import(serialized: &str) -> (PatternCatalog, Vec<Warning>) {
        let doc: PatternCatalog = match serde_json::from_str(serialized) {
            Ok(doc) => doc,
            Err(e) => {
                return (
                    PatternCatalog::new(),
                    vec![Warning::new("catalog", format!("import skipped: {}", e))],
                );
            }
        };

        if doc.version > CATALOG_SCHEMA_VERSION {
            return (
                PatternCatalog::new(),
                vec![Warning::new(
                    "catalog",
                    format!(
                        "import skipped: schema version {} is newer than supported version {}",
                        doc.version, CATALOG_SCHEMA_VERSION
                    ),
                )],
            );
        }

        // Re-merge through `add` so identity uniqueness holds even for
        // hand-edited documents. Field-type findings were already reported
        // when the document was first built, so they are not repeated here.
        let mut catalog = PatternCatalog::new();
        catalog.generated_at = doc.generated_at;
        let _ = catalog.add(doc.patterns);
        (catalog, Vec::new())
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats::default();
        for pattern in &self.patterns {
            match pattern.kind {
                PatternKind::ComponentUsage => stats.component_usages += 1,
                PatternKind::DatasourceUsage => stats.datasource_usages += 1,
                PatternKind::FormField => stats.form_fields += 1,
                PatternKind::NavigationItem => stats.navigation_items += 1,
                PatternKind::Unknown => {}
            }
        }
        stats
    }

    /// Order-independent equality on (kind, name, attributes, sources).
    pub fn same_entries(&self, other: &PatternCatalog) -> bool {
        if self.patterns.len() != other.patterns.len() {
            return false;
        }
        self.patterns.iter().all(|p| {
            other.get(p.kind, &p.name).is_some_and(|o| {
                o.attributes == p.attributes && o.sources == p.sources
            })
        })
    }
}

fn merge_pattern(existing: &mut Pattern, incoming: Pattern) {
    existing.sources.extend(incoming.sources);
    for (key, value) in incoming.attributes {
        match existing.attributes.entry(key) {
            indexmap::map::Entry::Occupied(mut occupied) => {
                merge_attr(occupied.get_mut(), value)
            }
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(value);
            }
        }
    }
}

/// Conflicting attribute values accumulate into an array of distinct
/// contributions instead of being overwritten.
fn merge_attr(current: &mut Value, incoming: Value) {
    if *current == incoming {
        return;
    }
    match current {
        Value::Array(items) => {
            if !items.contains(&incoming) {
                items.push(incoming);
            }
        }
        _ => {
            let previous = current.take();
            *current = Value::Array(vec![previous, incoming]);
        }
    }
}

fn validate_form_field(pattern: &Pattern) -> Option<Warning> {
    if pattern.kind != PatternKind::FormField {
        return None;
    }
    let raw = pattern.attributes.get("type")?.as_str()?;
    if FieldType::parse(raw).is_some() {
        return None;
    }
    let path = pattern
        .sources
        .iter()
        .next()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Some(Warning::new(
        path,
        format!("field '{}' has unrecognized type '{}'", pattern.name, raw),
    ))
}
