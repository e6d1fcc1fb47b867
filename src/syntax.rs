//! Generic syntax tree lowering for scanned source files.
//!
//! Concrete tree-sitter trees are lowered into a small language-independent
//! node set that the matchers operate on. Constructs without a dedicated
//! variant are kept as opaque groups so traversal never loses a subtree.

use crate::error::{Error, Result};
use crate::scanner::SourceFile;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tree_sitter::{Node, Parser};

/// 1-based line and 0-based column of a construct in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// Language-independent structural node.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    /// Object literal with its key/value entries
    Object {
        entries: Vec<(String, SyntaxNode)>,
        location: SourceLocation,
    },
    Array {
        items: Vec<SyntaxNode>,
    },
    /// JSX-like element
    Element {
        name: String,
        attributes: Vec<(String, SyntaxNode)>,
        children: Vec<SyntaxNode>,
        location: SourceLocation,
    },
    /// Function, method or constructor call. `method` is the last path
    /// segment of `callee` (`api.users.fetch` keeps `fetch`).
    Call {
        callee: String,
        method: String,
        args: Vec<SyntaxNode>,
        location: SourceLocation,
    },
    /// Class property, possibly decorated
    Property {
        name: String,
        type_annotation: Option<String>,
        decorators: Vec<SyntaxNode>,
        location: SourceLocation,
    },
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Ident(String),
    /// Catch-all container. Keeps children reachable without claiming any
    /// structure for them.
    Group(Vec<SyntaxNode>),
}

/// Result of lowering one source file.
pub struct ParsedFile {
    pub root: SyntaxNode,
    /// The concrete tree contained ERROR nodes; intact subtrees were
    /// still lowered.
    pub had_errors: bool,
}

impl SyntaxNode {
    /// Depth-first visit of this node and every descendant.
    pub fn visit(&self, visit: &mut impl FnMut(&SyntaxNode)) {
        visit(self);
        match self {
            SyntaxNode::Object { entries, .. } => {
                for (_, value) in entries {
                    value.visit(visit);
                }
            }
            SyntaxNode::Array { items } | SyntaxNode::Group(items) => {
                for item in items {
                    item.visit(visit);
                }
            }
            SyntaxNode::Element { attributes, children, .. } => {
                for (_, value) in attributes {
                    value.visit(visit);
                }
                for child in children {
                    child.visit(visit);
                }
            }
            SyntaxNode::Call { args, .. } => {
                for arg in args {
                    arg.visit(visit);
                }
            }
            SyntaxNode::Property { decorators, .. } => {
                for decorator in decorators {
                    decorator.visit(visit);
                }
            }
            _ => {}
        }
    }

    /// String content of a `Str` or `Ident` node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SyntaxNode::Str(s) | SyntaxNode::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Converts literal-shaped nodes into a JSON value. Identifiers map
    /// to their name; nodes with no literal shape yield `None`.
    pub fn literal(&self) -> Option<Value> {
        match self {
            SyntaxNode::Str(s) => Some(Value::String(s.clone())),
            SyntaxNode::Num(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Some(Value::from(*n as i64))
                } else {
                    Some(Value::from(*n))
                }
            }
            SyntaxNode::Bool(b) => Some(Value::Bool(*b)),
            SyntaxNode::Null => Some(Value::Null),
            SyntaxNode::Ident(name) => Some(Value::String(name.clone())),
            SyntaxNode::Array { items } => {
                Some(Value::Array(items.iter().filter_map(|i| i.literal()).collect()))
            }
            SyntaxNode::Object { entries, .. } => {
                let map = entries
                    .iter()
                    .filter_map(|(k, v)| v.literal().map(|v| (k.clone(), v)))
                    .collect();
                Some(Value::Object(map))
            }
            _ => None,
        }
    }
}

/// Parses a source file and lowers it into the generic tree.
///
/// # Errors
/// * `Error::Parse` when the grammar cannot be loaded or the parser
///   produces no tree at all. Trees with localized ERROR nodes are not
///   an error here; `ParsedFile::had_errors` flags them and the intact
///   parts remain available.
pub fn parse_source(file: &SourceFile) -> Result<ParsedFile> {
    let mut parser = Parser::new();
    parser.set_language(&file.dialect.grammar()).map_err(|e| Error::Parse {
        path: file.path.display().to_string(),
        reason: format!("grammar unavailable: {}", e),
    })?;

    let tree = parser.parse(&file.content, None).ok_or_else(|| Error::Parse {
        path: file.path.display().to_string(),
        reason: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    let had_errors = root.has_error();
    if had_errors {
        debug!("'{}' contains syntax errors; lowering intact subtrees", file.path.display());
    }

    Ok(ParsedFile { root: lower(root, file.content.as_bytes()), had_errors })
}

fn location(node: Node) -> SourceLocation {
    let point = node.start_position();
    SourceLocation { line: point.row + 1, column: point.column }
}

fn text(node: Node, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

fn lower(node: Node, src: &[u8]) -> SyntaxNode {
    match node.kind() {
        "object" => lower_object(node, src),
        "array" => SyntaxNode::Array { items: lower_children(node, src) },
        "jsx_element" => lower_jsx_element(node, src),
        "jsx_self_closing_element" => lower_jsx_opening(node, src, Vec::new()),
        "call_expression" => lower_call(node, src, "function"),
        "new_expression" => lower_call(node, src, "constructor"),
        "decorator" => match node.named_child(0) {
            Some(inner) => lower(inner, src),
            None => SyntaxNode::Group(Vec::new()),
        },
        "public_field_definition" | "field_definition" | "property_signature" => {
            lower_property(node, src)
        }
        "string" | "template_string" => SyntaxNode::Str(string_content(node, src)),
        "number" => text(node, src)
            .replace('_', "")
            .parse::<f64>()
            .map(SyntaxNode::Num)
            .unwrap_or(SyntaxNode::Null),
        "true" => SyntaxNode::Bool(true),
        "false" => SyntaxNode::Bool(false),
        "null" | "undefined" => SyntaxNode::Null,
        "identifier" | "property_identifier" | "shorthand_property_identifier"
        | "member_expression" => SyntaxNode::Ident(text(node, src)),
        "comment" => SyntaxNode::Group(Vec::new()),
        _ => SyntaxNode::Group(lower_children(node, src)),
    }
}

fn lower_children(node: Node, src: &[u8]) -> Vec<SyntaxNode> {
    let mut children = Vec::with_capacity(node.named_child_count());
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            if child.is_error() || child.kind() == "comment" {
                continue;
            }
            children.push(lower(child, src));
        }
    }
    children
}

fn lower_object(node: Node, src: &[u8]) -> SyntaxNode {
    let mut entries = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else { continue };
        match child.kind() {
            "pair" => {
                let Some(key) = child.child_by_field_name("key") else { continue };
                let key = match key.kind() {
                    "string" => string_content(key, src),
                    _ => text(key, src),
                };
                let value = match child.child_by_field_name("value") {
                    Some(value) => lower(value, src),
                    None => SyntaxNode::Null,
                };
                entries.push((key, value));
            }
            // `{ name }` keeps the identifier as its own value
            "shorthand_property_identifier" => {
                let name = text(child, src);
                entries.push((name.clone(), SyntaxNode::Ident(name)));
            }
            _ => {}
        }
    }
    SyntaxNode::Object { entries, location: location(node) }
}

fn lower_jsx_element(node: Node, src: &[u8]) -> SyntaxNode {
    let mut opening = None;
    let mut children = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else { continue };
        match child.kind() {
            "jsx_opening_element" => opening = Some(child),
            "jsx_closing_element" | "jsx_text" => {}
            _ => children.push(lower(child, src)),
        }
    }
    match opening {
        Some(opening) => lower_jsx_opening(opening, src, children),
        None => SyntaxNode::Group(children),
    }
}

/// Lowers a `jsx_opening_element` or `jsx_self_closing_element`; both put
/// the tag in the `name` field and attributes among their children.
fn lower_jsx_opening(node: Node, src: &[u8], children: Vec<SyntaxNode>) -> SyntaxNode {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src))
        .unwrap_or_default();

    let mut attributes = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else { continue };
        if child.kind() != "jsx_attribute" {
            continue;
        }
        let Some(attr_name) = child.named_child(0) else { continue };
        let attr_name = text(attr_name, src);
        // Value-less JSX attributes are boolean shorthand.
        let value = match child.named_child(1) {
            None => SyntaxNode::Bool(true),
            Some(value) if value.kind() == "jsx_expression" => match value.named_child(0) {
                Some(inner) => lower(inner, src),
                None => SyntaxNode::Null,
            },
            Some(value) => lower(value, src),
        };
        attributes.push((attr_name, value));
    }

    SyntaxNode::Element { name, attributes, children, location: location(node) }
}

fn lower_call(node: Node, src: &[u8], callee_field: &str) -> SyntaxNode {
    let callee = node
        .child_by_field_name(callee_field)
        .map(|n| text(n, src))
        .unwrap_or_default();
    let method = callee.rsplit('.').next().unwrap_or(&callee).to_string();

    let args = match node.child_by_field_name("arguments") {
        Some(arguments) => lower_children(arguments, src),
        None => Vec::new(),
    };

    SyntaxNode::Call { callee, method, args, location: location(node) }
}

fn lower_property(node: Node, src: &[u8]) -> SyntaxNode {
    // TypeScript grammars call the field `name`, the JavaScript grammar
    // calls it `property`.
    let name = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("property"))
        .map(|n| text(n, src))
        .unwrap_or_default();

    let type_annotation = node.child_by_field_name("type").map(|n| {
        text(n, src).trim_start_matches(':').trim().to_string()
    });

    let mut decorators = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else { continue };
        if child.kind() == "decorator" {
            decorators.push(lower(child, src));
        }
    }

    SyntaxNode::Property { name, type_annotation, decorators, location: location(node) }
}

/// Concatenated fragments of a string or template literal, without quotes.
fn string_content(node: Node, src: &[u8]) -> String {
    let mut content = String::new();
    let mut found = false;
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            if child.kind() == "string_fragment" {
                content.push_str(&text(child, src));
                found = true;
            }
        }
    }
    if found {
        return content;
    }
    // Empty literals have no fragments; fall back to trimming delimiters.
    text(node, src)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}
