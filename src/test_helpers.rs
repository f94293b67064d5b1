//! Shared test utilities for the postforge test suite.
//!
//! Provides fixture setup, a tiny document builder, and lookup helpers that
//! panic with the list of available entries on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures("scenario1_bluesky");
//! let docs = scan(tmp.path(), &PipelineConfig::default()).unwrap();
//!
//! let a = find_document(&docs, "bar/a");
//! assert!(a.path.ends_with("bar/a.mdx"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::types::{Failure, FrontMatterPayload, SourceDocument};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/<name>/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures(name: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name);
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write a file below `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// A minimal valid document with the given title and extra YAML lines.
///
/// ```rust
/// let text = doc("Hello", "tags: [rust]\n", "# Body\n");
/// ```
pub fn doc(title: &str, extra_yaml: &str, body: &str) -> String {
    format!(
        "---\nmeta:\n  title: {title}\n  description: About {title}\n  dateCreated: 2022-11-28\n{extra_yaml}---\n{body}"
    )
}

/// Build a [`SourceDocument`] for a path below `root`.
pub fn source(root: &Path, category: &str, id: &str, ext: &str) -> SourceDocument {
    SourceDocument {
        path: root.join(category).join(format!("{id}.{ext}")),
        category: category.to_string(),
        id: id.to_string(),
    }
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a scanned document by slug. Panics if not found.
pub fn find_document<'a>(docs: &'a [SourceDocument], slug: &str) -> &'a SourceDocument {
    docs.iter().find(|d| d.slug() == slug).unwrap_or_else(|| {
        let slugs: Vec<String> = docs.iter().map(SourceDocument::slug).collect();
        panic!("document '{slug}' not found. Available: {slugs:?}")
    })
}

/// Find an extracted payload by slug. Panics if not found.
pub fn find_payload<'a>(payloads: &'a [FrontMatterPayload], slug: &str) -> &'a FrontMatterPayload {
    payloads.iter().find(|p| p.slug == slug).unwrap_or_else(|| {
        panic!(
            "payload '{slug}' not found. Available: {:?}",
            payload_slugs(payloads)
        )
    })
}

/// Find the failure reported for a file whose path ends with `suffix`.
pub fn find_failure<'a>(failures: &'a [Failure], suffix: &str) -> &'a Failure {
    failures
        .iter()
        .find(|f| f.file.ends_with(suffix))
        .unwrap_or_else(|| {
            let files: Vec<_> = failures.iter().map(|f| f.file.display().to_string()).collect();
            panic!("no failure for '{suffix}'. Failures: {files:?}")
        })
}

/// All payload slugs in order.
pub fn payload_slugs(payloads: &[FrontMatterPayload]) -> Vec<&str> {
    payloads.iter().map(|p| p.slug.as_str()).collect()
}
