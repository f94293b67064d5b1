//! Front matter schema validation.
//!
//! Validation walks the raw parsed value and collects *every* violation
//! instead of stopping at the first, so one build log shows everything wrong
//! with a document. Each violation carries a dotted path (`meta.title`,
//! `tags.2`, `series.part`) and a short message.
//!
//! | Field | Rule |
//! |---|---|
//! | `meta` | required object |
//! | `meta.title` | required string |
//! | `meta.description` | required string |
//! | `meta.dateCreated` | date string; required in [`SchemaMode::Published`] |
//! | `meta.image` | optional string |
//! | `tags` | optional array of strings |
//! | `series.name` | required string when `series` is present |
//! | `series.part` | required positive integer when `series` is present |
//! | `series.description` | optional string |
//!
//! Unknown keys are ignored and do not survive into [`FrontMatter`].

use crate::frontmatter::{FrontMatter, parse_date};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Which contract a document is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Data the serving layer reads: every required field present.
    Published,
    /// Data as written by the author. `meta.dateCreated` may be absent
    /// because extraction backfills it from version control.
    Authored,
}

/// A single schema complaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Error, Debug)]
#[error("{}", render_violations(.violations))]
pub struct SchemaError {
    pub violations: Vec<Violation>,
}

impl SchemaError {
    /// Whether any violation concerns `path` (e.g. `"meta.title"`).
    pub fn mentions(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a raw value and convert it into a typed [`FrontMatter`].
pub fn validate(raw: &Value, mode: SchemaMode) -> Result<FrontMatter, SchemaError> {
    let mut v = Validator::default();

    match raw.as_object() {
        Some(root) => v.root(root, mode),
        None => v.push("", format!("Expected object, received {}", kind(raw))),
    }

    if !v.violations.is_empty() {
        return Err(SchemaError {
            violations: v.violations,
        });
    }

    serde_json::from_value(raw.clone()).map_err(|e| SchemaError {
        violations: vec![Violation {
            path: String::new(),
            message: e.to_string(),
        }],
    })
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn root(&mut self, root: &Map<String, Value>, mode: SchemaMode) {
        match root.get("meta") {
            Some(Value::Object(meta)) => self.meta(meta, mode),
            Some(other) => self.push("meta", format!("Expected object, received {}", kind(other))),
            None => self.push("meta", "Required"),
        }

        match root.get("tags") {
            None => {}
            Some(Value::Array(tags)) => {
                for (i, tag) in tags.iter().enumerate() {
                    if !tag.is_string() {
                        self.push(
                            &format!("tags.{i}"),
                            format!("Expected string, received {}", kind(tag)),
                        );
                    }
                }
            }
            Some(other) => self.push("tags", format!("Expected array, received {}", kind(other))),
        }

        match root.get("series") {
            None => {}
            Some(Value::Object(series)) => self.series(series),
            Some(other) => {
                self.push("series", format!("Expected object, received {}", kind(other)))
            }
        }
    }

    fn meta(&mut self, meta: &Map<String, Value>, mode: SchemaMode) {
        self.required_string(meta, "meta", "title");
        self.required_string(meta, "meta", "description");
        self.optional_string(meta, "meta", "image");

        match meta.get("dateCreated") {
            None if mode == SchemaMode::Published => self.push("meta.dateCreated", "Required"),
            None => {}
            Some(Value::String(s)) if parse_date(s).is_some() => {}
            Some(Value::String(s)) => self.push("meta.dateCreated", format!("Invalid date `{s}`")),
            Some(other) => self.push(
                "meta.dateCreated",
                format!("Expected date, received {}", kind(other)),
            ),
        }
    }

    fn series(&mut self, series: &Map<String, Value>) {
        self.required_string(series, "series", "name");
        self.optional_string(series, "series", "description");

        match series.get("part") {
            None => self.push("series.part", "Required"),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(p) if p >= 1 && p <= u64::from(u32::MAX) => {}
                _ => self.push(
                    "series.part",
                    format!("Expected positive integer, received {n}"),
                ),
            },
            Some(other) => self.push(
                "series.part",
                format!("Expected positive integer, received {}", kind(other)),
            ),
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) {
        let path = format!("{parent}.{key}");
        match obj.get(key) {
            Some(Value::String(_)) => {}
            Some(other) => self.push(&path, format!("Expected string, received {}", kind(other))),
            None => self.push(&path, "Required"),
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) {
        match obj.get(key) {
            None | Some(Value::String(_)) => {}
            Some(other) => self.push(
                &format!("{parent}.{key}"),
                format!("Expected string, received {}", kind(other)),
            ),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
