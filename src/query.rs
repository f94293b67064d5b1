//! Read side of the front matter artifacts.
//!
//! [`ContentStore`] loads what [`crate::emit`] wrote and answers the questions
//! the serving layer asks: "list a category newest first" and "give me this
//! slug with its series neighbours". Every loaded record is validated again in
//! published mode, so a hand-edited or stale JSON file is an error here rather
//! than a broken page later.

use crate::layout::{MDX_DIR, MODULE_EXT};
use crate::naming;
use crate::schema::{self, SchemaError, SchemaMode};
use crate::series::{self, SeriesLinks};
use crate::types::FrontMatterPayload;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Front matter directory does not exist: {0}")]
    MissingDir(PathBuf),
    #[error("Cannot walk front matter directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: invalid front matter: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
    #[error("{path}: slug `{found}` does not match file location `{expected}`")]
    SlugMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
}

/// One document as the serving layer sees it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView<'a> {
    #[serde(flatten)]
    pub payload: &'a FrontMatterPayload,
    /// Compiled body module, relative to the output root.
    pub module: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesLinks>,
}

/// All published front matter, loaded from `<output>/frontmatter`.
#[derive(Debug, Default)]
pub struct ContentStore {
    payloads: Vec<FrontMatterPayload>,
}

impl ContentStore {
    /// Load every `<category>/<id>.json` below `dir`.
    pub fn load(dir: &Path) -> Result<Self, QueryError> {
        if !dir.is_dir() {
            return Err(QueryError::MissingDir(dir.to_path_buf()));
        }

        let mut payloads = Vec::new();
        for entry in WalkDir::new(dir).min_depth(2).max_depth(2).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            payloads.push(load_payload(path)?);
        }

        tracing::debug!(count = payloads.len(), dir = %dir.display(), "loaded content store");
        Ok(Self::from_payloads(payloads))
    }

    pub fn from_payloads(mut payloads: Vec<FrontMatterPayload>) -> Self {
        payloads.sort_by(|a, b| a.slug.cmp(&b.slug));
        Self { payloads }
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Every payload in `category`, newest `dateCreated` first, ties by slug.
    pub fn all_frontmatter(&self, category: &str) -> Vec<&FrontMatterPayload> {
        let mut listed: Vec<&FrontMatterPayload> = self
            .payloads
            .iter()
            .filter(|p| p.category() == category)
            .collect();
        listed.sort_by(|a, b| {
            b.frontmatter
                .meta
                .date_created
                .cmp(&a.frontmatter.meta.date_created)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        listed
    }

    /// Look up a document with its body module path and series links.
    pub fn get_by_slug(&self, slug: &str) -> Option<DocumentView<'_>> {
        let payload = self.payloads.iter().find(|p| p.slug == slug)?;
        let module = Path::new(MDX_DIR)
            .join(payload.category())
            .join(format!("{}.{MODULE_EXT}", payload.document_id()));
        Some(DocumentView {
            payload,
            module,
            series: series::link(payload, &self.payloads),
        })
    }
}

fn load_payload(path: &Path) -> Result<FrontMatterPayload, QueryError> {
    let text = fs::read_to_string(path).map_err(|source| QueryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| QueryError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let frontmatter = schema::validate(
        value.get("frontmatter").unwrap_or(&Value::Null),
        SchemaMode::Published,
    )
    .map_err(|source| QueryError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    let expected = expected_slug(path);
    let found = value.get("slug").and_then(Value::as_str).unwrap_or_default();
    if found != expected {
        return Err(QueryError::SlugMismatch {
            path: path.to_path_buf(),
            found: found.to_string(),
            expected,
        });
    }

    Ok(FrontMatterPayload {
        slug: expected,
        frontmatter,
    })
}

fn expected_slug(path: &Path) -> String {
    let id = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let category = path
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    naming::slug(&category, &id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit;
    use crate::frontmatter::{FrontMatter, Meta, Series, parse_date};
    use crate::layout::OutputLayout;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn payload(slug: &str, date: &str, series: Option<(&str, u32)>) -> FrontMatterPayload {
        FrontMatterPayload {
            slug: slug.into(),
            frontmatter: FrontMatter {
                meta: Meta {
                    title: format!("Title of {slug}"),
                    description: "D".into(),
                    date_created: parse_date(date),
                    image: None,
                },
                tags: vec!["untagged".into()],
                series: series.map(|(name, part)| Series {
                    name: name.into(),
                    part,
                    description: (part == 1).then(|| format!("About {name}")),
                }),
            },
        }
    }

    fn emitted(payloads: &[FrontMatterPayload]) -> TempDir {
        let out = TempDir::new().unwrap();
        emit::emit(payloads, &OutputLayout::new(out.path())).unwrap();
        out
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_reads_what_emit_wrote() {
        let payloads = vec![
            payload("posts/a", "2022-01-01", None),
            payload("drafts/b", "2022-02-01", None),
        ];
        let out = emitted(&payloads);
        let store = ContentStore::load(&out.path().join("frontmatter")).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_slug("posts/a").unwrap().payload, &payloads[0]);
    }

    #[test]
    fn load_rejects_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let err = ContentStore::load(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, QueryError::MissingDir(_)));
    }

    #[test]
    fn load_rejects_invalid_record() {
        let out = TempDir::new().unwrap();
        write_file(
            out.path(),
            "posts/a.json",
            r#"{"slug": "posts/a", "frontmatter": {"meta": {"title": "T", "description": "D"}, "tags": []}}"#,
        );
        let err = ContentStore::load(out.path()).unwrap_err();
        match err {
            QueryError::Invalid { source, .. } => assert!(source.mentions("meta.dateCreated")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_misplaced_record() {
        let out = emitted(&[payload("posts/a", "2022-01-01", None)]);
        let dir = out.path().join("frontmatter");
        fs::rename(dir.join("posts/a.json"), dir.join("posts/z.json")).unwrap();
        let err = ContentStore::load(&dir).unwrap_err();
        assert!(matches!(err, QueryError::SlugMismatch { .. }));
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn listing_is_newest_first_within_category() {
        let store = ContentStore::from_payloads(vec![
            payload("posts/old", "2020-01-01", None),
            payload("posts/new", "2023-01-01", None),
            payload("drafts/x", "2024-01-01", None),
            payload("posts/mid", "2021-06-01", None),
        ]);
        let slugs: Vec<&str> = store
            .all_frontmatter("posts")
            .iter()
            .map(|p| p.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["posts/new", "posts/mid", "posts/old"]);
    }

    #[test]
    fn same_date_ties_break_by_slug() {
        let store = ContentStore::from_payloads(vec![
            payload("posts/b", "2022-01-01", None),
            payload("posts/a", "2022-01-01", None),
        ]);
        let slugs: Vec<&str> = store
            .all_frontmatter("posts")
            .iter()
            .map(|p| p.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["posts/a", "posts/b"]);
    }

    #[test]
    fn unknown_category_lists_nothing() {
        let store = ContentStore::from_payloads(vec![payload("posts/a", "2022-01-01", None)]);
        assert!(store.all_frontmatter("drafts").is_empty());
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    #[test]
    fn get_by_slug_resolves_module_and_series() {
        let store = ContentStore::from_payloads(vec![
            payload("foo/c", "2022-11-28", Some(("foo_series", 1))),
            payload("foo/d", "2022-11-28", Some(("foo_series", 2))),
        ]);
        let view = store.get_by_slug("foo/c").unwrap();
        assert_eq!(view.module, Path::new("mdx/foo/c.mjs"));
        let series = view.series.unwrap();
        assert_eq!(series.description.as_deref(), Some("About foo_series"));
        assert_eq!(series.next.unwrap().slug, "foo/d");

        let last = store.get_by_slug("foo/d").unwrap().series.unwrap();
        assert!(last.next.is_none());
    }

    #[test]
    fn document_without_series_has_no_links() {
        let store = ContentStore::from_payloads(vec![payload("posts/a", "2022-01-01", None)]);
        assert!(store.get_by_slug("posts/a").unwrap().series.is_none());
        assert!(store.get_by_slug("posts/missing").is_none());
    }

    #[test]
    fn view_serializes_flat() {
        let store = ContentStore::from_payloads(vec![payload("posts/a", "2022-01-01", None)]);
        let json = serde_json::to_value(store.get_by_slug("posts/a").unwrap()).unwrap();
        assert_eq!(json["slug"], "posts/a");
        assert_eq!(json["module"], "mdx/posts/a.mjs");
        assert!(json.get("series").is_none());
    }
}
