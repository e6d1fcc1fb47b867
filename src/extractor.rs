//! Pattern extraction: structural matchers applied over the generic
//! syntax tree.
//!
//! Each matcher is a (predicate, extractor) pair bound to one pattern
//! kind. Matching is shape- and name-based only; scanned projects often
//! have incomplete type information or are partially generated, so
//! nothing here resolves types. New pattern kinds are added by
//! registering a matcher, not by touching the traversal.

use crate::catalog::{Pattern, PatternKind};
use crate::error::Result;
use crate::fields;
use crate::scanner::SourceFile;
use crate::syntax::{parse_source, SyntaxNode};
use serde_json::Value;
use std::collections::BTreeSet;

/// Names recognized by the built-in matchers. All lists accept a trailing
/// `*` for prefix matching.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Component names for `component-usage`; empty means any
    /// capitalized element tag.
    pub components: Vec<String>,
    /// Call targets treated as remote data-source access.
    pub datasource_methods: Vec<String>,
    /// Decorator names treated as field validation rules.
    pub validators: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            datasource_methods: vec![
                "useDataSource".to_string(),
                "useRemoteDataSource".to_string(),
                "createDataSource".to_string(),
                "createRemoteDataSource".to_string(),
            ],
            validators: vec![
                "IsEmail".to_string(),
                "IsNotEmpty".to_string(),
                "IsOptional".to_string(),
                "IsNumber".to_string(),
                "IsDate".to_string(),
                "IsBoolean".to_string(),
                "MinLength".to_string(),
                "MaxLength".to_string(),
                "Min".to_string(),
                "Max".to_string(),
                "Length".to_string(),
                "Matches".to_string(),
            ],
        }
    }
}

/// A (predicate, extractor) pair recognizing one pattern kind.
pub trait Matcher: Send + Sync {
    /// Pattern kind this matcher produces.
    fn kind(&self) -> PatternKind;

    /// Cheap structural predicate over a single node.
    fn matches(&self, node: &SyntaxNode) -> bool;

    /// Builds the pattern for a node that passed `matches`. May still
    /// decline when a required piece (such as a name) is not a literal.
    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern>;
}

/// Patterns recovered from one file, plus whether the parse was partial.
pub struct FileExtraction {
    pub patterns: Vec<Pattern>,
    pub had_syntax_errors: bool,
}

/// Pluggable set of matchers run over every file.
pub struct MatcherRegistry {
    matchers: Vec<Box<dyn Matcher>>,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self { matchers: Vec::new() }
    }

    /// Registry with the built-in matchers for every supported kind.
    pub fn with_defaults(config: &MatcherConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(FormFieldMatcher));
        registry.register(Box::new(ComponentUsageMatcher::new(&config.components)));
        registry.register(Box::new(DatasourceUsageMatcher::new(&config.datasource_methods)));
        registry.register(Box::new(NavigationItemMatcher));
        registry.register(Box::new(ValidationRuleMatcher::new(&config.validators)));
        registry
    }

    pub fn register(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.push(matcher);
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Parses one file and runs every matcher over its tree.
    ///
    /// # Errors
    /// * `Error::Parse` when the file cannot be parsed at all; the caller
    ///   records it as a warning and moves on
    pub fn extract_file(&self, file: &SourceFile) -> Result<FileExtraction> {
        let parsed = parse_source(file)?;

        let mut patterns = Vec::new();
        parsed.root.visit(&mut |node| {
            for matcher in &self.matchers {
                if matcher.matches(node) {
                    if let Some(pattern) = matcher.extract(node, file) {
                        patterns.push(pattern);
                    }
                }
            }
        });

        Ok(FileExtraction { patterns, had_syntax_errors: parsed.had_errors })
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::with_defaults(&MatcherConfig::default())
    }
}

/// Matches name lists that may carry trailing-`*` prefixes.
#[derive(Debug, Clone)]
struct NameSet {
    exact: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl NameSet {
    fn new(names: &[String]) -> Self {
        let mut exact = BTreeSet::new();
        let mut prefixes = Vec::new();
        for name in names {
            match name.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(name.clone());
                }
            }
        }
        Self { exact, prefixes }
    }

    fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }

    fn contains(&self, name: &str) -> bool {
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

fn object_value<'a>(entries: &'a [(String, SyntaxNode)], key: &str) -> Option<&'a SyntaxNode> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Object literal whose keys include `name` and `type`.
pub struct FormFieldMatcher;

impl Matcher for FormFieldMatcher {
    fn kind(&self) -> PatternKind {
        PatternKind::FormField
    }

    fn matches(&self, node: &SyntaxNode) -> bool {
        matches!(node, SyntaxNode::Object { entries, .. }
            if object_value(entries, "name").is_some() && object_value(entries, "type").is_some())
    }

    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern> {
        let SyntaxNode::Object { entries, location } = node else { return None };
        let name = object_value(entries, "name")?.as_str()?;

        let mut pattern =
            Pattern::new(PatternKind::FormField, name, &file.path, Some(*location));
        for (key, value) in entries {
            if key == "name" {
                continue;
            }
            if let Some(literal) = value.literal() {
                pattern.attributes.insert(key.clone(), literal);
            }
        }
        Some(pattern)
    }
}

/// JSX-like element referencing a known component name.
pub struct ComponentUsageMatcher {
    known: NameSet,
}

impl ComponentUsageMatcher {
    pub fn new(components: &[String]) -> Self {
        Self { known: NameSet::new(components) }
    }

    fn is_known(&self, name: &str) -> bool {
        let capitalized = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        capitalized && (self.known.is_empty() || self.known.contains(name))
    }
}

impl Matcher for ComponentUsageMatcher {
    fn kind(&self) -> PatternKind {
        PatternKind::ComponentUsage
    }

    fn matches(&self, node: &SyntaxNode) -> bool {
        matches!(node, SyntaxNode::Element { name, .. } if self.is_known(name))
    }

    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern> {
        let SyntaxNode::Element { name, attributes, location, .. } = node else { return None };

        let mut pattern =
            Pattern::new(PatternKind::ComponentUsage, name.clone(), &file.path, Some(*location));
        for (key, value) in attributes {
            if let Some(literal) = value.literal() {
                pattern.attributes.insert(key.clone(), literal);
            }
        }
        Some(pattern)
    }
}

/// Call to a known remote-service method.
pub struct DatasourceUsageMatcher {
    methods: NameSet,
}

impl DatasourceUsageMatcher {
    pub fn new(methods: &[String]) -> Self {
        Self { methods: NameSet::new(methods) }
    }
}

impl Matcher for DatasourceUsageMatcher {
    fn kind(&self) -> PatternKind {
        PatternKind::DatasourceUsage
    }

    fn matches(&self, node: &SyntaxNode) -> bool {
        matches!(node, SyntaxNode::Call { method, .. } if self.methods.contains(method))
    }

    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern> {
        let SyntaxNode::Call { callee, method, args, location } = node else { return None };

        let endpoint = args.first().and_then(|arg| match arg {
            SyntaxNode::Str(s) => Some(s.clone()),
            _ => None,
        });
        let name = endpoint.clone().unwrap_or_else(|| method.clone());

        let mut pattern =
            Pattern::new(PatternKind::DatasourceUsage, name, &file.path, Some(*location))
                .with_attr("method", Value::String(callee.clone()));
        if let Some(endpoint) = endpoint {
            pattern.attributes.insert("endpoint".to_string(), Value::String(endpoint));
        }
        Some(pattern)
    }
}

/// Object literal with a `label` and a route-like key.
pub struct NavigationItemMatcher;

const ROUTE_KEYS: [&str; 4] = ["route", "path", "link", "href"];

impl Matcher for NavigationItemMatcher {
    fn kind(&self) -> PatternKind {
        PatternKind::NavigationItem
    }

    fn matches(&self, node: &SyntaxNode) -> bool {
        matches!(node, SyntaxNode::Object { entries, .. }
            if object_value(entries, "label").is_some()
                && ROUTE_KEYS.iter().any(|key| object_value(entries, key).is_some()))
    }

    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern> {
        let SyntaxNode::Object { entries, location } = node else { return None };
        let label = object_value(entries, "label")?.as_str()?;

        let mut pattern =
            Pattern::new(PatternKind::NavigationItem, label, &file.path, Some(*location));
        for (key, value) in entries {
            if key == "label" {
                continue;
            }
            if let Some(literal) = value.literal() {
                pattern.attributes.insert(key.clone(), literal);
            }
        }
        Some(pattern)
    }
}

/// Decorator on a class property expressing a validation rule. Produces a
/// `form-field` pattern for the property so the rule lands on the same
/// catalog entry as field literals with that name.
pub struct ValidationRuleMatcher {
    validators: NameSet,
}

impl ValidationRuleMatcher {
    pub fn new(validators: &[String]) -> Self {
        Self { validators: NameSet::new(validators) }
    }

    fn rule_name<'a>(decorator: &'a SyntaxNode) -> Option<&'a str> {
        match decorator {
            SyntaxNode::Call { method, .. } => Some(method),
            SyntaxNode::Ident(name) => Some(name),
            _ => None,
        }
    }

    fn rule_display(decorator: &SyntaxNode) -> Option<String> {
        match decorator {
            SyntaxNode::Call { method, args, .. } => {
                let rendered: Vec<String> = args
                    .iter()
                    .filter_map(|arg| arg.literal())
                    .map(|v| v.to_string())
                    .collect();
                if rendered.is_empty() {
                    Some(method.clone())
                } else {
                    Some(format!("{}({})", method, rendered.join(", ")))
                }
            }
            SyntaxNode::Ident(name) => Some(name.clone()),
            _ => None,
        }
    }
}

impl Matcher for ValidationRuleMatcher {
    fn kind(&self) -> PatternKind {
        PatternKind::FormField
    }

    fn matches(&self, node: &SyntaxNode) -> bool {
        match node {
            SyntaxNode::Property { decorators, .. } => decorators.iter().any(|d| {
                Self::rule_name(d).is_some_and(|name| self.validators.contains(name))
            }),
            _ => false,
        }
    }

    fn extract(&self, node: &SyntaxNode, file: &SourceFile) -> Option<Pattern> {
        let SyntaxNode::Property { name, type_annotation, decorators, location } = node else {
            return None;
        };
        if name.is_empty() {
            return None;
        }

        let rules: Vec<Value> = decorators
            .iter()
            .filter(|d| Self::rule_name(d).is_some_and(|n| self.validators.contains(n)))
            .filter_map(Self::rule_display)
            .map(Value::String)
            .collect();

        let mut pattern =
            Pattern::new(PatternKind::FormField, name.clone(), &file.path, Some(*location))
                .with_attr("validate", Value::Array(rules));

        if let Some(field_type) =
            type_annotation.as_deref().and_then(fields::from_type_annotation)
        {
            pattern
                .attributes
                .insert("type".to_string(), Value::String(field_type.name().to_string()));
        }
        Some(pattern)
    }
}
