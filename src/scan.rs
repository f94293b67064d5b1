//! Content tree scanning.
//!
//! First step of both batch jobs. Walks the content root and returns every
//! content document with the `(category, documentId)` pair derived from its
//! position in the tree.
//!
//! ## Directory Structure
//!
//! The layout is exactly two levels deep:
//!
//! ```text
//! content/                     # Content root
//! ├── config.toml              # Pipeline configuration (optional)
//! ├── posts/                   # Category
//! │   ├── hello_world.mdx      # Document: (posts, hello_world)
//! │   └── rust_errors.md
//! └── drafts/
//!     └── half_baked.mdx
//! ```
//!
//! ## Validation
//!
//! Anything that breaks the layout is a structural error and aborts the scan
//! immediately rather than being skipped:
//! - a content file directly in the root
//! - a directory inside a category
//! - a category not listed in `categories` (when that list is non-empty)
//! - two files in one category with the same stem (`a.md` and `a.mdx`)
//!
//! Hidden entries (`.git`, `.DS_Store`) and `config.toml` are ignored. Other
//! files with non-content extensions (images next to posts) are skipped.

use crate::config::{CONFIG_FILE, PipelineConfig};
use crate::types::SourceDocument;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot walk content tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content root does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("Content file outside a category directory: {0}")]
    UncategorizedFile(PathBuf),
    #[error("Nested directory inside a category (layout must be <root>/<category>/<file>): {0}")]
    NestedDirectory(PathBuf),
    #[error("Unknown category `{category}` (allowed: {allowed}): {path}")]
    UnknownCategory {
        category: String,
        allowed: String,
        path: PathBuf,
    },
    #[error("Duplicate document id `{id}` in category `{category}`: {first} and {second}")]
    DuplicateId {
        category: String,
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Non UTF-8 file name: {0}")]
    NonUtf8Name(PathBuf),
}

/// Enumerate every content document under `root`, sorted by path.
///
/// Returned paths are absolute.
pub fn scan(root: &Path, config: &PipelineConfig) -> Result<Vec<SourceDocument>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let root = root.canonicalize()?;

    let mut documents = Vec::new();
    let mut seen: BTreeMap<(String, String), PathBuf> = BTreeMap::new();

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        match (entry.depth(), is_dir) {
            (1, true) => check_category(path, config)?,
            (1, false) => {
                if is_content(path, config) {
                    return Err(ScanError::UncategorizedFile(path.to_path_buf()));
                }
            }
            (_, true) => return Err(ScanError::NestedDirectory(path.to_path_buf())),
            (_, false) => {
                if !is_content(path, config) {
                    tracing::debug!(path = %path.display(), "skipping non-content file");
                    continue;
                }
                let doc = to_document(path)?;
                let key = (doc.category.clone(), doc.id.clone());
                if let Some(first) = seen.get(&key) {
                    return Err(ScanError::DuplicateId {
                        category: doc.category,
                        id: doc.id,
                        first: first.clone(),
                        second: doc.path,
                    });
                }
                seen.insert(key, doc.path.clone());
                documents.push(doc);
            }
        }
    }

    documents.sort();
    tracing::debug!(count = documents.len(), root = %root.display(), "scanned content");
    Ok(documents)
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.depth() == 1 && name == CONFIG_FILE)
}

fn is_content(path: &Path, config: &PipelineConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| config.is_content_extension(e))
}

fn check_category(path: &Path, config: &PipelineConfig) -> Result<(), ScanError> {
    let name = file_name(path)?;
    if config.categories.is_empty() || config.categories.iter().any(|c| c == name) {
        return Ok(());
    }
    Err(ScanError::UnknownCategory {
        category: name.to_string(),
        allowed: config.categories.join(", "),
        path: path.to_path_buf(),
    })
}

fn to_document(path: &Path) -> Result<SourceDocument, ScanError> {
    let non_utf8 = || ScanError::NonUtf8Name(path.to_path_buf());
    let category = path.parent().ok_or_else(non_utf8).and_then(file_name)?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(non_utf8)?;
    Ok(SourceDocument {
        path: path.to_path_buf(),
        category: category.to_string(),
        id: id.to_string(),
    })
}

fn file_name(path: &Path) -> Result<&str, ScanError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::NonUtf8Name(path.to_path_buf()))
}
