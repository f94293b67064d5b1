//! Front matter extraction.
//!
//! Turns scanned documents into validated [`FrontMatterPayload`]s. Each
//! document goes through the same steps:
//!
//! ```text
//! read ──► split fence ──► parse YAML ──► backfill dateCreated ──► normalize ──► validate
//!   │          │               │                  │                                 │
//!   fatal      fatal         failure           failure                           failure
//! ```
//!
//! "Fatal" errors ([`ExtractError`]) abort the batch: an unreadable file or a
//! document without a front matter block means the content tree itself is
//! malformed. "Failure" outcomes are per-document data problems. They are
//! collected while every other document is still processed, and the batch
//! reports them all together at the end (see [`ExtractionReport`]).
//!
//! ## Parallelism
//!
//! Documents are independent. They are processed on a local rayon pool whose
//! width comes from `processing.max_processes`; the history lookup spawns a
//! `git` process per undated document and dominates the cost. Results are
//! folded only after every worker settles, so there is no shared mutable
//! state between workers. Progress events stream to an optional channel as
//! documents complete. Documents that belong to a series report success only
//! after the collision check below, so no document is reported both ways.
//!
//! ## Series collisions
//!
//! After all documents are validated, any two documents claiming the same
//! part of one series in one category are both turned into failures and
//! dropped from the payloads.

use crate::frontmatter::{self, FrontMatterError};
use crate::history::History;
use crate::schema::{self, SchemaMode};
use crate::series;
use crate::types::{DocumentEvent, Failure, FrontMatterPayload, SourceDocument, Stage};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Structure {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("Cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything one extraction run produced.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Valid payloads, sorted by slug.
    pub payloads: Vec<FrontMatterPayload>,
    /// Per-document failures, sorted by file.
    pub failures: Vec<Failure>,
}

impl ExtractionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extract front matter from every document.
///
/// Returns `Err` only for fatal conditions. Validation failures are in the
/// report; callers decide the exit code from [`ExtractionReport::is_success`].
pub fn extract(
    documents: &[SourceDocument],
    history: &dyn History,
    threads: usize,
    events: Option<Sender<DocumentEvent>>,
) -> Result<ExtractionReport, ExtractError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let outcomes: Vec<Result<FrontMatterPayload, Failure>> = pool.install(|| {
        documents
            .par_iter()
            .map_with(events.clone(), |tx, doc| {
                let outcome = extract_document(doc, history)?;
                if let Some(tx) = tx {
                    let event = match &outcome {
                        Ok(payload) if payload.frontmatter.series.is_none() => {
                            Some(DocumentEvent::Extracted {
                                slug: payload.slug.clone(),
                            })
                        }
                        Ok(_) => None,
                        Err(failure) => Some(DocumentEvent::Failed {
                            stage: Stage::Extract,
                            failure: failure.clone(),
                        }),
                    };
                    if let Some(event) = event {
                        tx.send(event).ok();
                    }
                }
                Ok(outcome)
            })
            .collect::<Result<Vec<_>, ExtractError>>()
    })?;

    let mut report = ExtractionReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(payload) => report.payloads.push(payload),
            Err(failure) => report.failures.push(failure),
        }
    }

    reject_duplicate_parts(&mut report, documents, events.as_ref());
    if let Some(tx) = &events {
        for payload in report.payloads.iter().filter(|p| p.frontmatter.series.is_some()) {
            tx.send(DocumentEvent::Extracted {
                slug: payload.slug.clone(),
            })
            .ok();
        }
    }

    report.payloads.sort_by(|a, b| a.slug.cmp(&b.slug));
    report.failures.sort_by(|a, b| a.file.cmp(&b.file));
    tracing::debug!(
        ok = report.payloads.len(),
        failed = report.failures.len(),
        "extraction finished"
    );
    Ok(report)
}

/// Extract one document. The outer `Result` is fatal, the inner is per-document.
pub fn extract_document(
    doc: &SourceDocument,
    history: &dyn History,
) -> Result<Result<FrontMatterPayload, Failure>, ExtractError> {
    let text = fs::read_to_string(&doc.path).map_err(|source| ExtractError::Read {
        path: doc.path.clone(),
        source,
    })?;
    let (yaml, _body) = frontmatter::split(&text).map_err(|source| ExtractError::Structure {
        path: doc.path.clone(),
        source,
    })?;
    Ok(payload_from_yaml(doc, yaml, history))
}

fn payload_from_yaml(
    doc: &SourceDocument,
    yaml: &str,
    history: &dyn History,
) -> Result<FrontMatterPayload, Failure> {
    let mut raw = frontmatter::parse_raw(yaml).map_err(|e| Failure::new(&doc.path, e.to_string()))?;

    if frontmatter::lacks_date(&raw) {
        let stamps = history
            .timestamps(&doc.path)
            .map_err(|e| undated_failure(doc, &e.to_string(), &raw))?;
        tracing::debug!(
            slug = %doc.slug(),
            created = %stamps.created,
            last_edited = %stamps.last_edited,
            "backfilled dateCreated from history"
        );
        if let Some(Value::Object(meta)) = raw.get_mut("meta") {
            meta.insert(
                "dateCreated".to_string(),
                Value::String(frontmatter::format_date(&stamps.created)),
            );
        }
    }

    let raw = frontmatter::normalize(raw);
    match schema::validate(&raw, SchemaMode::Published) {
        Ok(frontmatter) => Ok(FrontMatterPayload {
            slug: doc.slug(),
            frontmatter,
        }),
        Err(e) => Err(Failure::new(&doc.path, format!("Invalid front matter: {e}"))
            .with_details(e.violations.iter().map(ToString::to_string).collect())
            .with_raw(raw)),
    }
}

/// Failure for a document whose date could not be backfilled. Any other
/// schema problems are reported alongside, so one run shows all of them.
fn undated_failure(doc: &SourceDocument, history_error: &str, raw: &Value) -> Failure {
    let normalized = frontmatter::normalize(raw.clone());
    match schema::validate(&normalized, SchemaMode::Authored) {
        Ok(_) => Failure::new(&doc.path, history_error).with_raw(raw.clone()),
        Err(e) => Failure::new(
            &doc.path,
            format!("{history_error}. Invalid front matter: {e}"),
        )
        .with_details(e.violations.iter().map(ToString::to_string).collect())
        .with_raw(raw.clone()),
    }
}

fn reject_duplicate_parts(
    report: &mut ExtractionReport,
    documents: &[SourceDocument],
    events: Option<&Sender<DocumentEvent>>,
) {
    let duplicates = series::find_duplicate_parts(&report.payloads);
    if duplicates.is_empty() {
        return;
    }

    let paths: HashMap<String, &PathBuf> = documents.iter().map(|d| (d.slug(), &d.path)).collect();
    let mut rejected: HashMap<String, Failure> = HashMap::new();
    for dup in &duplicates {
        for slug in &dup.slugs {
            let others: Vec<&str> = dup
                .slugs
                .iter()
                .filter(|s| *s != slug)
                .map(String::as_str)
                .collect();
            let file = paths.get(slug).map_or_else(|| PathBuf::from(slug), |p| (*p).clone());
            let message = format!(
                "series.part: duplicate part {} in series \"{}\" (also in {})",
                dup.part,
                dup.name,
                others.join(", ")
            );
            rejected.insert(slug.clone(), Failure::new(file, message));
        }
    }

    let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut report.payloads)
        .into_iter()
        .partition(|p| !rejected.contains_key(&p.slug));
    report.payloads = kept;

    for payload in dropped {
        if let Some(failure) = rejected.remove(&payload.slug) {
            let failure = match serde_json::to_value(&payload.frontmatter) {
                Ok(raw) => failure.with_raw(raw),
                Err(_) => failure,
            };
            if let Some(tx) = events {
                tx.send(DocumentEvent::Failed {
                    stage: Stage::Extract,
                    failure: failure.clone(),
                })
                .ok();
            }
            report.failures.push(failure);
        }
    }
}
