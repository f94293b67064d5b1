//! Front matter artifacts.
//!
//! Writes the outputs of a successful extraction under `<output>/frontmatter/`:
//!
//! - `<category>/<id>.json`: the pretty-printed [`FrontMatterPayload`]
//! - `<category>/index.js`: a barrel re-exporting every payload in the category
//! - `tags.json`: the [`TagIndex`]
//!
//! The directory is cleared first, so a document that disappeared from the
//! source tree disappears from the output too.

use crate::layout::{self, FRONTMATTER_BARREL, OutputLayout};
use crate::naming;
use crate::tags::{self, TagIndex};
use crate::types::FrontMatterPayload;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What was written.
#[derive(Debug, Default)]
pub struct EmitSummary {
    pub documents: usize,
    pub barrels: usize,
    pub tags: usize,
}

/// Write per-document JSON, barrels, and the tag index.
pub fn emit(payloads: &[FrontMatterPayload], layout: &OutputLayout) -> Result<EmitSummary, EmitError> {
    let dir = layout.frontmatter_dir();
    layout::reset_dir(&dir).map_err(|source| EmitError::Write {
        path: dir.clone(),
        source,
    })?;

    let mut by_category: BTreeMap<&str, Vec<&FrontMatterPayload>> = BTreeMap::new();
    for payload in payloads {
        by_category.entry(payload.category()).or_default().push(payload);
    }

    let mut summary = EmitSummary::default();
    for (category, mut members) in by_category {
        members.sort_by(|a, b| a.slug.cmp(&b.slug));
        let category_dir = dir.join(category);
        fs::create_dir_all(&category_dir).map_err(|source| EmitError::Write {
            path: category_dir.clone(),
            source,
        })?;

        for payload in &members {
            let path = layout.frontmatter_file(category, payload.document_id());
            write_json(&path, payload)?;
            summary.documents += 1;
        }

        let ids: Vec<&str> = members.iter().map(|p| p.document_id()).collect();
        write(&category_dir.join(FRONTMATTER_BARREL), barrel(&ids, "json"))?;
        summary.barrels += 1;
    }

    let index = tags::aggregate(payloads);
    summary.tags = index.len();
    write_tags(&index, layout)?;

    tracing::debug!(
        documents = summary.documents,
        barrels = summary.barrels,
        tags = summary.tags,
        "front matter artifacts written"
    );
    Ok(summary)
}

/// Barrel module text: one `export {default as X} from './<id>.<ext>';` per id.
pub fn barrel(ids: &[&str], extension: &str) -> String {
    ids.iter()
        .map(|id| {
            format!(
                "export {{default as {}}} from './{id}.{extension}';\n",
                naming::export_name(id)
            )
        })
        .collect()
}

fn write_tags(index: &TagIndex, layout: &OutputLayout) -> Result<(), EmitError> {
    write_json(&layout.tags_file(), index)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), EmitError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write(path, json)
}

fn write(path: &Path, contents: String) -> Result<(), EmitError> {
    fs::write(path, contents).map_err(|source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    })
}
