//! Centralized naming conventions.
//!
//! Three kinds of names leave the pipeline and are relied on by the web tier:
//!
//! - **Slugs**: `<category>/<documentId>`, the public URL path and artifact key.
//! - **Heading anchors**: GitHub-style ids (`## Getting Started` → `getting-started`),
//!   deduplicated per document with `-1`, `-2`, … suffixes.
//! - **Export names**: the key under which a barrel module re-exports a
//!   document. Valid JavaScript identifiers are used bare; anything else
//!   (`my-post`) becomes a string export name (`"my-post"`).

use std::collections::HashMap;

/// Build the public slug for a document.
pub fn slug(category: &str, document_id: &str) -> String {
    format!("{category}/{document_id}")
}

/// Split a slug back into `(category, documentId)`.
///
/// Returns `None` unless the slug has exactly two non-empty segments.
pub fn split_slug(slug: &str) -> Option<(&str, &str)> {
    let (category, id) = slug.split_once('/')?;
    if category.is_empty() || id.is_empty() || id.contains('/') {
        return None;
    }
    Some((category, id))
}

/// Generates unique heading anchors within one document.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor for `text`, unique among everything this slugger has produced.
    pub fn slug(&mut self, text: &str) -> String {
        let base = anchor(text);
        let mut candidate = base.clone();
        while let Some(count) = self.seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{base}-{count}");
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }

    /// Register an id chosen explicitly by the author (`{#custom}`), so later
    /// generated anchors do not collide with it.
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }
}

/// GitHub-style anchor: lowercase, punctuation dropped, spaces become dashes.
fn anchor(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// The name under which a barrel module exports a document.
pub fn export_name(document_id: &str) -> String {
    if is_js_identifier(document_id) {
        document_id.to_string()
    } else {
        serde_json::to_string(document_id).unwrap_or_else(|_| format!("\"{document_id}\""))
    }
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Conservative ASCII check for a bare JavaScript identifier.
pub fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}
