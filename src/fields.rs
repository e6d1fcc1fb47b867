//! Closed field-type vocabulary for form-field patterns.
//!
//! Scanned projects describe fields with loose strings; the catalog checks
//! them against this fixed set when patterns are merged so that downstream
//! consumers never meet an unvetted type at render time.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Password,
    Number,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Enum,
    Array,
    TextArea,
}

impl FieldType {
    /// Maps a raw type string, including common aliases seen in scanned
    /// sources, onto the closed set.
    pub fn parse(raw: &str) -> Option<FieldType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" => Some(FieldType::Text),
            "email" => Some(FieldType::Email),
            "password" => Some(FieldType::Password),
            "number" | "int" | "integer" => Some(FieldType::Number),
            "decimal" | "float" | "double" => Some(FieldType::Decimal),
            "boolean" | "bool" | "switch" | "checkbox" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "time" => Some(FieldType::Time),
            "datetime" | "timestamp" => Some(FieldType::DateTime),
            "enum" | "select" => Some(FieldType::Enum),
            "array" | "list" | "tags" => Some(FieldType::Array),
            "textarea" | "multiline" => Some(FieldType::TextArea),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Number => "number",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Enum => "enum",
            FieldType::Array => "array",
            FieldType::TextArea => "textarea",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::parse(s).ok_or_else(|| format!("unrecognized field type '{}'", s))
    }
}

/// Maps a TypeScript type annotation onto a field type, used when fields
/// are recovered from annotated class properties instead of literals.
pub fn from_type_annotation(annotation: &str) -> Option<FieldType> {
    let annotation = annotation.trim();
    if annotation.ends_with("[]") || annotation.starts_with("Array<") {
        return Some(FieldType::Array);
    }
    match annotation {
        "string" => Some(FieldType::Text),
        "number" => Some(FieldType::Number),
        "boolean" => Some(FieldType::Boolean),
        "Date" => Some(FieldType::Date),
        _ => None,
    }
}
