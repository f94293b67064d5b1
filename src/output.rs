//! CLI output formatting for all pipeline stages.
//!
//! # Document-First Display
//!
//! Every line leads with the document's slug, the identity the web tier uses.
//! Source paths appear only as indented context, and only when something
//! went wrong and the reader needs to open the file.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! bar (2 documents)
//!     001 bar/a
//!     002 bar/b
//! foo (2 documents)
//!     001 foo/c
//!     002 foo/d
//! ```
//!
//! ## Per-document progress
//!
//! ```text
//! ✅ bar/a
//! ✅ bar/b → mdx/bar/b.mjs
//! ❌ posts/broken.mdx (extract)
//! ```
//!
//! ## Failure report (stderr)
//!
//! ```text
//! 1 document failed:
//! ❌ content/posts/broken.mdx
//!     Invalid front matter: meta.title: Required
//!     - meta.title: Required
//!     Raw front matter:
//!         {
//!           "meta": { ... }
//!         }
//! ```
//!
//! ## Gate
//!
//! ```text
//! ⚡ Skipping extract: Output files are up to date
//! 🔄 Running compile: No output files found
//! 🔄 Running extract: Previous run had failures
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout or stderr.
//! Format functions are pure: no I/O, no side effects.

use crate::compile::CompileReport;
use crate::emit::EmitSummary;
use crate::extract::ExtractionReport;
use crate::feeds::FeedSummary;
use crate::gate::GateDecision;
use crate::images::ImageSummary;
use crate::types::{DocumentEvent, Failure, SourceDocument};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Show `path` relative to `root` when possible.
fn display_path(path: &Path, root: Option<&Path>) -> String {
    root.and_then(|r| path.strip_prefix(r).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Scan
// ============================================================================

/// Documents grouped by category.
pub fn format_scan_output(documents: &[SourceDocument]) -> Vec<String> {
    let mut by_category: BTreeMap<&str, Vec<&SourceDocument>> = BTreeMap::new();
    for doc in documents {
        by_category.entry(&doc.category).or_default().push(doc);
    }

    let mut lines = Vec::new();
    for (category, docs) in by_category {
        lines.push(format!("{category} ({})", plural(docs.len(), "document")));
        for (i, doc) in docs.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), doc.slug()));
        }
    }
    if lines.is_empty() {
        lines.push("No documents found".to_string());
    }
    lines
}

pub fn print_scan_output(documents: &[SourceDocument]) {
    for line in format_scan_output(documents) {
        println!("{}", line);
    }
}

// ============================================================================
// Per-document events
// ============================================================================

/// One line per completed document.
pub fn format_document_event(event: &DocumentEvent, output_root: Option<&Path>) -> Vec<String> {
    match event {
        DocumentEvent::Extracted { slug } => vec![format!("✅ {slug}")],
        DocumentEvent::Compiled { slug, module } => {
            vec![format!("✅ {slug} → {}", display_path(module, output_root))]
        }
        DocumentEvent::Failed { stage, failure } => {
            vec![format!("❌ {} ({stage})", failure.file.display())]
        }
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Full report for a set of failures: message, individual violations and the
/// raw front matter the validator saw.
pub fn format_failure_report(failures: &[Failure], source_root: Option<&Path>) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("{} failed:", plural(failures.len(), "document"))];
    for failure in failures {
        lines.push(format!("❌ {}", display_path(&failure.file, source_root)));
        lines.push(format!("{}{}", indent(1), failure.message));
        for detail in &failure.details {
            lines.push(format!("{}- {detail}", indent(1)));
        }
        if let Some(raw) = &failure.raw {
            lines.push(format!("{}Raw front matter:", indent(1)));
            let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
            lines.extend(pretty.lines().map(|l| format!("{}{l}", indent(2))));
        }
    }
    lines
}

pub fn print_failure_report(failures: &[Failure], source_root: Option<&Path>) {
    for line in format_failure_report(failures, source_root) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Gate
// ============================================================================

pub fn format_gate(step: &str, decision: &GateDecision) -> String {
    if decision.needs_regen() {
        format!("🔄 Running {step}: {}", decision.reason)
    } else {
        format!("⚡ Skipping {step}: {}", decision.reason)
    }
}

pub fn print_gate(step: &str, decision: &GateDecision) {
    println!("{}", format_gate(step, decision));
}

// ============================================================================
// Summaries
// ============================================================================

pub fn format_extract_summary(report: &ExtractionReport, emitted: Option<&EmitSummary>) -> Vec<String> {
    let mut lines = vec![format!(
        "Extracted {}, {}",
        plural(report.payloads.len(), "document"),
        plural(report.failures.len(), "failure")
    )];
    if let Some(emitted) = emitted {
        lines.push(format!(
            "Wrote {}, {}, {}",
            plural(emitted.documents, "payload"),
            plural(emitted.barrels, "barrel"),
            plural(emitted.tags, "tag")
        ));
    }
    lines
}

pub fn format_compile_summary(report: &CompileReport) -> Vec<String> {
    vec![format!(
        "Compiled {}, {}",
        plural(report.modules.len(), "module"),
        plural(report.failures.len(), "failure")
    )]
}

pub fn format_feed_summary(summary: &FeedSummary, category: &str) -> Vec<String> {
    vec![format!(
        "Wrote rss.xml and sitemap.xml with {} from {category}",
        plural(summary.items, "item")
    )]
}

pub fn format_image_summary(summary: &ImageSummary, assets: &Path) -> Vec<String> {
    vec![format!(
        "Wrote images/index.js with {} from {}",
        plural(summary.images, "image"),
        assets.display()
    )]
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
