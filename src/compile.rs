//! Body compilation.
//!
//! Turns each document's markdown body into an importable ES module:
//!
//! ```js
//! export const frontmatter = {"meta":{...},"tags":[...]};
//! export const tableOfContents = [{"depth":2,"id":"setup","text":"Setup"}];
//! const body = "<h2 id=\"setup\">Setup</h2>...";
//! export default function Content() {
//!   return body;
//! }
//! ```
//!
//! ## Transform chain
//!
//! Markdown is parsed with pulldown-cmark and the event stream is rewritten
//! before rendering:
//!
//! | Transform | Effect |
//! |---|---|
//! | heading anchors | every heading gets a GitHub-style `id` (explicit `{#id}` wins) |
//! | highlighting | fenced code becomes `<pre><code class="hljs language-X">` with token spans |
//! | table of contents | a `[[toc]]` line becomes `<nav class="toc">` and fills `tableOfContents` |
//!
//! ## Verification
//!
//! The embedded `frontmatter` is the typed projection of what the source
//! declares: unknown keys are dropped, exactly as extraction drops them.
//! After a module is written, that copy is read back out of the module text,
//! validated against the authored schema, and compared with the projection. This catches the compiler corrupting
//! metadata, which extraction alone cannot see. Problems are collected per
//! file and never stop sibling documents from compiling; the caller turns a
//! non-empty failure list into a non-zero exit.
//!
//! Unreadable sources, documents without a front matter fence, and write
//! errors are fatal ([`CompileError`]).

use crate::config::CompileConfig;
use crate::frontmatter::{self, FrontMatterError};
use crate::highlight;
use crate::layout::{self, MODULE_REGISTRY, OutputLayout};
use crate::naming::{self, Slugger};
use crate::schema::{self, SchemaMode};
use crate::types::{DocumentEvent, Failure, SourceDocument, Stage};
use maud::html;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html as md_html};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    Write {
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
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// The line that marks where a table of contents goes.
pub const TOC_MARKER: &str = "[[toc]]";
const TOC_PLACEHOLDER: &str = "<!--postforge:toc-->";
const FRONTMATTER_PREFIX: &str = "export const frontmatter = ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub depth: u8,
    pub id: String,
    pub text: String,
}

/// Rendered HTML plus the table of contents, if one was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// A module written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    pub slug: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct CompileReport {
    /// Every module written, sorted by slug. Includes modules whose
    /// verification failed.
    pub modules: Vec<CompiledModule>,
    /// Per-document failures, sorted by file.
    pub failures: Vec<Failure>,
}

impl CompileReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compile every document into `<layout>/mdx/<category>/<id>.mjs` and write a
/// registry module per category.
pub fn compile(
    documents: &[SourceDocument],
    layout: &OutputLayout,
    config: &CompileConfig,
    threads: usize,
    events: Option<Sender<DocumentEvent>>,
) -> Result<CompileReport, CompileError> {
    let mdx_dir = layout.mdx_dir();
    layout::reset_dir(&mdx_dir).map_err(|source| CompileError::Write {
        path: mdx_dir.clone(),
        source,
    })?;
    for category in categories(documents) {
        let dir = mdx_dir.join(category);
        fs::create_dir_all(&dir).map_err(|source| CompileError::Write { path: dir, source })?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let outcomes: Vec<(CompiledModule, Option<Failure>)> = pool.install(|| {
        documents
            .par_iter()
            .map_with(events, |tx, doc| {
                let outcome = compile_document(doc, layout, config)?;
                if let Some(tx) = tx {
                    let event = match &outcome.1 {
                        None => DocumentEvent::Compiled {
                            slug: outcome.0.slug.clone(),
                            module: outcome.0.path.clone(),
                        },
                        Some(failure) => DocumentEvent::Failed {
                            stage: Stage::Compile,
                            failure: failure.clone(),
                        },
                    };
                    tx.send(event).ok();
                }
                Ok(outcome)
            })
            .collect::<Result<Vec<_>, CompileError>>()
    })?;

    let mut report = CompileReport::default();
    for (module, failure) in outcomes {
        report.modules.push(module);
        report.failures.extend(failure);
    }
    report.modules.sort_by(|a, b| a.slug.cmp(&b.slug));
    report.failures.sort_by(|a, b| a.file.cmp(&b.file));

    write_registries(documents, layout)?;
    tracing::debug!(
        modules = report.modules.len(),
        failed = report.failures.len(),
        "compilation finished"
    );
    Ok(report)
}

fn categories(documents: &[SourceDocument]) -> Vec<&str> {
    let mut categories: Vec<&str> = documents.iter().map(|d| d.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}

/// Compile one document. The module is always written when the source is
/// structurally sound; the failure, if any, describes verification problems.
pub fn compile_document(
    doc: &SourceDocument,
    layout: &OutputLayout,
    config: &CompileConfig,
) -> Result<(CompiledModule, Option<Failure>), CompileError> {
    let text = fs::read_to_string(&doc.path).map_err(|source| CompileError::Read {
        path: doc.path.clone(),
        source,
    })?;
    let (yaml, body) = frontmatter::split(&text).map_err(|source| CompileError::Structure {
        path: doc.path.clone(),
        source,
    })?;

    // The embedded copy is the typed projection, the same shape extraction
    // emits. Documents that fail the schema still compile with their raw
    // value so the failure is reported, not fatal.
    let (declared, parse_failure) = match frontmatter::parse_raw(yaml) {
        Ok(raw) => project(&doc.path, frontmatter::normalize(raw))?,
        Err(e) => (Value::Null, Some(Failure::new(&doc.path, e.to_string()))),
    };

    let rendered = render_body(body, config);
    let module = module_source(&declared, &rendered)?;

    let path = layout.module_file(&doc.category, &doc.id);
    fs::write(&path, &module).map_err(|source| CompileError::Write {
        path: path.clone(),
        source,
    })?;

    let compiled = CompiledModule {
        slug: doc.slug(),
        path,
    };
    let failure = parse_failure.or_else(|| verify(&doc.path, &module, &declared).err());
    Ok((compiled, failure))
}

/// Project normalised front matter through [`FrontMatter`]: unknown keys are
/// dropped and dates take their canonical form.
///
/// [`FrontMatter`]: crate::frontmatter::FrontMatter
fn project(source: &Path, raw: Value) -> Result<(Value, Option<Failure>), CompileError> {
    match schema::validate(&raw, SchemaMode::Authored) {
        Ok(frontmatter) => Ok((serde_json::to_value(&frontmatter)?, None)),
        Err(e) => {
            let failure = Failure::new(source, format!("Error parsing front matter: {e}"))
                .with_details(e.violations.iter().map(ToString::to_string).collect())
                .with_raw(raw.clone());
            Ok((raw, Some(failure)))
        }
    }
}

/// Re-read the embedded front matter from module text and check it.
fn verify(source: &Path, module: &str, declared: &Value) -> Result<(), Failure> {
    let embedded = embedded_front_matter(module)
        .ok_or_else(|| Failure::new(source, "compiled module has no embedded front matter"))?;
    let embedded: Value = serde_json::from_str(embedded).map_err(|e| {
        Failure::new(source, format!("embedded front matter is not valid JSON: {e}"))
    })?;

    if let Err(e) = schema::validate(&embedded, SchemaMode::Authored) {
        return Err(
            Failure::new(source, format!("Error parsing front matter: {e}"))
                .with_details(e.violations.iter().map(ToString::to_string).collect())
                .with_raw(embedded),
        );
    }
    if &embedded != declared {
        return Err(Failure::new(
            source,
            "embedded front matter does not match the source document",
        )
        .with_raw(embedded));
    }
    Ok(())
}

/// The JSON text of `export const frontmatter = ...;` in a compiled module.
pub fn embedded_front_matter(module: &str) -> Option<&str> {
    module
        .lines()
        .find_map(|line| line.strip_prefix(FRONTMATTER_PREFIX))
        .map(|rest| rest.trim_end().trim_end_matches(';'))
}

/// Assemble the module text.
pub fn module_source(frontmatter: &Value, body: &RenderedBody) -> Result<String, serde_json::Error> {
    let frontmatter = serde_json::to_string(frontmatter)?;
    let toc = serde_json::to_string(&body.toc)?;
    let html = serde_json::to_string(&body.html)?;
    Ok(format!(
        "{FRONTMATTER_PREFIX}{frontmatter};\n\
         export const tableOfContents = {toc};\n\
         const body = {html};\n\
         export default function Content() {{\n  return body;\n}}\n"
    ))
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_SMART_PUNCTUATION
}

/// Replace `[[toc]]` lines outside code fences with a placeholder HTML
/// comment, which pulldown-cmark passes through as a raw HTML block.
fn mark_toc(markdown: &str) -> (String, bool) {
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<&str> = None;
    let mut found = false;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim();
        match fence {
            Some(open) if trimmed.starts_with(open) => fence = None,
            Some(_) => {}
            None if trimmed.starts_with("```") => fence = Some("```"),
            None if trimmed.starts_with("~~~") => fence = Some("~~~"),
            None if trimmed == TOC_MARKER => {
                found = true;
                out.push_str(TOC_PLACEHOLDER);
                out.push('\n');
                continue;
            }
            None => {}
        }
        out.push_str(line);
    }
    (out, found)
}

struct OpenHeading {
    index: usize,
    depth: u8,
    text: String,
}

/// Render a markdown body with heading anchors, highlighting and TOC.
pub fn render_body(markdown: &str, config: &CompileConfig) -> RenderedBody {
    let (source, wants_toc) = mark_toc(markdown);

    let mut events: Vec<Event> = Vec::new();
    let mut slugger = Slugger::new();
    let mut headings: Vec<TocEntry> = Vec::new();
    let mut heading: Option<OpenHeading> = None;
    let mut code: Option<(Option<String>, String)> = None;

    for event in Parser::new_ext(&source, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(OpenHeading {
                    index: events.len(),
                    depth: level as u8,
                    text: String::new(),
                });
                events.push(event);
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(open) = heading.take()
                    && let Some(Event::Start(Tag::Heading {
                        level,
                        id,
                        classes,
                        attrs,
                    })) = events.get(open.index).cloned()
                {
                    let anchor = match id {
                        Some(explicit) => {
                            slugger.reserve(&explicit);
                            explicit.to_string()
                        }
                        None => slugger.slug(&open.text),
                    };
                    events[open.index] = Event::Start(Tag::Heading {
                        level,
                        id: Some(CowStr::from(anchor.clone())),
                        classes,
                        attrs,
                    });
                    headings.push(TocEntry {
                        depth: open.depth,
                        id: anchor,
                        text: open.text.trim().to_string(),
                    });
                }
                events.push(event);
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|l| l.trim_matches(|c| c == '{' || c == '}').to_string())
                        .filter(|l| !l.is_empty()),
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, buf)) = code.take() {
                    let lang = lang.or_else(|| {
                        config
                            .detect_language
                            .then(|| highlight::detect_language(&buf))
                            .flatten()
                            .map(str::to_string)
                    });
                    let html = highlight::render_block_html(&buf, lang.as_deref(), config.highlight);
                    events.push(Event::Html(CowStr::from(html)));
                }
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, buf)) = code.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::Text(ref text) | Event::Code(ref text) if heading.is_some() => {
                if let Some(open) = heading.as_mut() {
                    open.text.push_str(text);
                }
                events.push(event);
            }
            other => events.push(other),
        }
    }

    let toc: Vec<TocEntry> = if wants_toc {
        headings
            .into_iter()
            .filter(|h| (2..=config.toc_max_depth).contains(&h.depth))
            .collect()
    } else {
        Vec::new()
    };

    if wants_toc {
        let nav = toc_html(&toc);
        for event in events.iter_mut() {
            if matches!(event, Event::Html(html) if html.trim() == TOC_PLACEHOLDER) {
                *event = Event::Html(CowStr::from(nav.clone()));
            }
        }
    }

    let mut html = String::new();
    md_html::push_html(&mut html, events.into_iter());
    RenderedBody { html, toc }
}

fn toc_html(entries: &[TocEntry]) -> String {
    html! {
        nav class="toc" {
            ol {
                @for entry in entries {
                    li class={ "toc-depth-" (entry.depth) } {
                        a href={ "#" (entry.id) } { (entry.text) }
                    }
                }
            }
        }
    }
    .into_string()
        + "\n"
}

/// Write `index.mjs` in each category: one re-export per compiled body.
fn write_registries(documents: &[SourceDocument], layout: &OutputLayout) -> Result<(), CompileError> {
    let mut by_category: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for doc in documents {
        by_category
            .entry(doc.category.as_str())
            .or_default()
            .push(doc.id.as_str());
    }
    for (category, mut ids) in by_category {
        ids.sort_unstable();
        let body: String = ids
            .iter()
            .map(|id| {
                format!(
                    "export {{default as {}}} from './{id}.{}';\n",
                    naming::export_name(id),
                    layout::MODULE_EXT
                )
            })
            .collect();
        let path = layout.mdx_dir().join(category).join(MODULE_REGISTRY);
        fs::write(&path, body).map_err(|source| CompileError::Write { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn render(markdown: &str) -> RenderedBody {
        render_body(markdown, &CompileConfig::default())
    }

    // =========================================================================
    // Transform chain
    // =========================================================================

    #[test]
    fn headings_get_github_style_ids() {
        let body = render("# Hello World\n\n## Getting `started`!\n");
        assert!(body.html.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(body.html.contains("<h2 id=\"getting-started\">"));
    }

    #[test]
    fn duplicate_headings_are_suffixed() {
        let body = render("## Example\n\n## Example\n");
        assert!(body.html.contains("id=\"example\""));
        assert!(body.html.contains("id=\"example-1\""));
    }

    #[test]
    fn explicit_heading_id_wins() {
        let body = render("## Setup {#install}\n\n## Install\n");
        assert!(body.html.contains("<h2 id=\"install\">Setup</h2>"));
        assert!(body.html.contains("<h2 id=\"install-1\">Install</h2>"));
    }

    #[test]
    fn fenced_code_is_highlighted() {
        let body = render("```rust\nfn main() {}\n```\n");
        assert!(body.html.contains("<pre><code class=\"hljs language-rust\">"));
        assert!(body.html.contains("<span class=\"hljs-keyword\">fn</span>"));
    }

    #[test]
    fn unlabelled_code_is_detected() {
        let body = render("```\n{\"a\": 1}\n```\n");
        assert!(body.html.contains("language-json"));
    }

    #[test]
    fn detection_can_be_disabled() {
        let config = CompileConfig {
            detect_language: false,
            ..Default::default()
        };
        let body = render_body("```\n{\"a\": 1}\n```\n", &config);
        assert!(body.html.contains("<code class=\"hljs\">"));
    }

    #[test]
    fn no_toc_without_marker() {
        let body = render("## One\n\n## Two\n");
        assert!(body.toc.is_empty());
        assert!(!body.html.contains("class=\"toc\""));
    }

    #[test]
    fn toc_marker_builds_nav_and_entries() {
        let body = render("[[toc]]\n\n# Title\n\n## Intro\n\n### Detail\n\n#### Too deep\n");
        assert_eq!(
            body.toc,
            vec![
                TocEntry {
                    depth: 2,
                    id: "intro".into(),
                    text: "Intro".into()
                },
                TocEntry {
                    depth: 3,
                    id: "detail".into(),
                    text: "Detail".into()
                },
            ]
        );
        assert!(body.html.contains("<nav class=\"toc\">"));
        assert!(body.html.contains("<a href=\"#intro\">Intro</a>"));
        assert!(!body.html.contains("[[toc]]"));
        assert!(!body.html.contains(TOC_PLACEHOLDER));
    }

    #[test]
    fn toc_marker_inside_code_fence_is_literal() {
        let body = render("```\n[[toc]]\n```\n\n## A\n");
        assert!(body.toc.is_empty());
        assert!(body.html.contains("[[toc]]"));
    }

    // =========================================================================
    // Module text
    // =========================================================================

    #[test]
    fn module_shape() {
        let body = RenderedBody {
            html: "<p>\"hi\"</p>\n".into(),
            toc: vec![],
        };
        let module = module_source(&serde_json::json!({"tags": ["a"]}), &body).unwrap();
        assert_eq!(
            module,
            "export const frontmatter = {\"tags\":[\"a\"]};\n\
             export const tableOfContents = [];\n\
             const body = \"<p>\\\"hi\\\"</p>\\n\";\n\
             export default function Content() {\n  return body;\n}\n"
        );
    }

    #[test]
    fn embedded_front_matter_reads_back() {
        let value = serde_json::json!({"meta": {"title": "a}; b"}});
        let module = module_source(
            &value,
            &RenderedBody {
                html: String::new(),
                toc: vec![],
            },
        )
        .unwrap();
        let embedded = embedded_front_matter(&module).unwrap();
        assert_eq!(serde_json::from_str::<Value>(embedded).unwrap(), value);
        assert!(embedded_front_matter("export default 1;").is_none());
    }

    // =========================================================================
    // Batch compile
    // =========================================================================

    #[test]
    fn compile_writes_modules_and_registry() {
        let content = setup_fixtures("scenario1_bluesky");
        let out = TempDir::new().unwrap();
        let layout = OutputLayout::new(out.path());
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();

        let report = compile(&docs, &layout, &CompileConfig::default(), 2, None).unwrap();
        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.modules.len(), 4);

        let module = fs::read_to_string(layout.module_file("bar", "a")).unwrap();
        assert!(module.contains("export default function Content()"));

        let registry = fs::read_to_string(out.path().join("mdx/foo/index.mjs")).unwrap();
        assert_eq!(
            registry,
            "export {default as c} from './c.mjs';\nexport {default as d} from './d.mjs';\n"
        );
    }

    #[test]
    fn failures_are_collected_and_siblings_still_compile() {
        let content = TempDir::new().unwrap();
        write_file(content.path(), "posts/good.mdx", &doc("Good", "", "# Hi\n"));
        write_file(
            content.path(),
            "posts/bad.mdx",
            "---\nmeta:\n  description: no title\n---\nBody\n",
        );
        let out = TempDir::new().unwrap();
        let layout = OutputLayout::new(out.path());
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();

        let report = compile(&docs, &layout, &CompileConfig::default(), 2, None).unwrap();
        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.failures.len(), 1);
        let failure = find_failure(&report.failures, "posts/bad.mdx");
        assert!(failure.message.contains("meta.title: Required"));
        assert!(layout.module_file("posts", "bad").exists());
        assert!(layout.module_file("posts", "good").exists());
    }

    #[test]
    fn undated_document_compiles_cleanly() {
        let content = TempDir::new().unwrap();
        write_file(
            content.path(),
            "posts/undated.mdx",
            "---\nmeta:\n  title: T\n  description: D\n---\nBody\n",
        );
        let out = TempDir::new().unwrap();
        let layout = OutputLayout::new(out.path());
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();
        let report = compile(&docs, &layout, &CompileConfig::default(), 1, None).unwrap();
        assert!(report.is_success(), "{:?}", report.failures);
    }

    #[test]
    fn verify_detects_mismatch() {
        let module = module_source(
            &serde_json::json!({"meta": {"title": "A", "description": "D"}, "tags": ["x"]}),
            &render(""),
        )
        .unwrap();
        let declared = serde_json::json!({"meta": {"title": "B", "description": "D"}, "tags": ["x"]});
        let failure = verify(Path::new("posts/a.mdx"), &module, &declared).unwrap_err();
        assert!(failure.message.contains("does not match"));
    }

    #[test]
    fn unknown_keys_are_not_embedded() {
        let content = TempDir::new().unwrap();
        write_file(
            content.path(),
            "posts/a.mdx",
            "---\nmeta:\n  title: A\n  description: D\n  dateCreated: 2022-11-28\n  twitter:title: Tw\nlayout: wide\n---\nBody\n",
        );
        let out = TempDir::new().unwrap();
        let layout = OutputLayout::new(out.path());
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();

        let report = compile(&docs, &layout, &CompileConfig::default(), 1, None).unwrap();
        assert!(report.is_success(), "{:?}", report.failures);

        let module = fs::read_to_string(layout.module_file("posts", "a")).unwrap();
        let embedded: Value = serde_json::from_str(embedded_front_matter(&module).unwrap()).unwrap();
        assert_eq!(
            embedded,
            serde_json::json!({
                "meta": {"title": "A", "description": "D", "dateCreated": "2022-11-28T00:00:00.000Z"},
                "tags": ["untagged"]
            })
        );
    }

    #[test]
    fn projection_drops_unknown_keys_and_keeps_raw_on_failure() {
        let (clean, failure) = project(
            Path::new("posts/a.mdx"),
            serde_json::json!({"meta": {"title": "A", "description": "D", "og": 1}, "tags": ["x"], "extra": true}),
        )
        .unwrap();
        assert!(failure.is_none());
        assert_eq!(clean, serde_json::json!({"meta": {"title": "A", "description": "D"}, "tags": ["x"]}));

        let raw = serde_json::json!({"meta": {"description": "D"}, "tags": ["x"]});
        let (embedded, failure) = project(Path::new("posts/b.mdx"), raw.clone()).unwrap();
        assert_eq!(embedded, raw);
        let failure = failure.unwrap();
        assert_eq!(failure.details, vec!["meta.title: Required"]);
        assert_eq!(failure.raw, Some(raw));
    }

    #[test]
    fn missing_front_matter_is_fatal() {
        let content = TempDir::new().unwrap();
        write_file(content.path(), "posts/bare.mdx", "# Nothing\n");
        let out = TempDir::new().unwrap();
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();
        let result = compile(
            &docs,
            &OutputLayout::new(out.path()),
            &CompileConfig::default(),
            1,
            None,
        );
        assert!(matches!(result, Err(CompileError::Structure { .. })));
    }

    #[test]
    fn stale_modules_are_removed() {
        let content = setup_fixtures("scenario1_bluesky");
        let out = TempDir::new().unwrap();
        let layout = OutputLayout::new(out.path());
        write_file(out.path(), "mdx/old/gone.mjs", "export default 1;");
        let docs = crate::scan::scan(content.path(), &Default::default()).unwrap();
        compile(&docs, &layout, &CompileConfig::default(), 1, None).unwrap();
        assert!(!out.path().join("mdx/old").exists());
    }
}
