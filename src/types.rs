//! Shared types used across pipeline stages.
//!
//! [`FrontMatterPayload`] is the on-disk contract between extraction and the
//! serving layer: it is written verbatim as `<category>/<id>.json` and read
//! back by [`crate::query`]. Its JSON shape must not drift.

use crate::frontmatter::FrontMatter;
use crate::naming;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// One content file discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceDocument {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Directory directly under the content root.
    pub category: String,
    /// File stem.
    pub id: String,
}

impl SourceDocument {
    pub fn slug(&self) -> String {
        naming::slug(&self.category, &self.id)
    }
}

/// Validated front matter keyed by its slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatterPayload {
    pub slug: String,
    pub frontmatter: FrontMatter,
}

impl FrontMatterPayload {
    /// Category half of the slug.
    pub fn category(&self) -> &str {
        naming::split_slug(&self.slug).map_or("", |(category, _)| category)
    }

    /// Document id half of the slug.
    pub fn document_id(&self) -> &str {
        naming::split_slug(&self.slug).map_or("", |(_, id)| id)
    }
}

/// A per-document failure. An empty list of these means full success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub file: PathBuf,
    pub message: String,
    /// Individual complaints, e.g. one line per schema violation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// The parsed front matter as the validator saw it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Failure {
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            details: Vec::new(),
            raw: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Pipeline stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Compile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => f.write_str("extract"),
            Stage::Compile => f.write_str("compile"),
        }
    }
}

/// Progress reported by workers as each document completes.
///
/// Sent over an mpsc channel to a printer thread; arrival order follows
/// completion order, not input order.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    Extracted { slug: String },
    Compiled { slug: String, module: PathBuf },
    Failed { stage: Stage, failure: Failure },
}
