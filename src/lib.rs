//! # Postforge
//!
//! Build-time content pipeline for a markdown blog. Authors write documents
//! with a YAML front matter block; postforge turns them into artifacts a web
//! tier can import statically, with no database and no runtime parsing.
//!
//! # Architecture: Independent Stages
//!
//! ```text
//! content/<category>/<id>.mdx
//!        │
//!        ├─ extract ──►  generated/frontmatter/   (per-document JSON, barrels, tags.json)
//!        ├─ compile ──►  generated/mdx/           (body modules, registries)
//!        └─ feeds   ──►  generated/feeds/         (rss.xml, sitemap.xml)
//!
//! assets/*.{png,jpg,webp,gif}
//!        └─ images  ──►  generated/images/        (index.js with dimensions)
//! ```
//!
//! Extract and compile both start from the content tree and do not depend on
//! each other. Feeds read back what extract wrote, through the same
//! [`query::ContentStore`] the serving layer uses. The filesystem layout in
//! [`layout`] is the only contract between postforge and its consumers.
//!
//! Every stage rewrites its whole output subtree, so a run from an empty
//! output directory and an incremental run give identical trees. The
//! [`gate`] only decides whether a stage runs at all.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Enumerates `<root>/<category>/<id>.<ext>`; rejects any other shape |
//! | [`frontmatter`] | Fence splitting, YAML parsing, normalisation, typed front matter |
//! | [`schema`] | Collect-all validation with field paths, published and authored modes |
//! | [`history`] | `git log` timestamps used to backfill `meta.dateCreated` |
//! | [`extract`] | Parallel front matter extraction with per-document failures |
//! | [`tags`] | Folds payloads into the tag index |
//! | [`series`] | Series grouping, next-part links, duplicate-part detection |
//! | [`emit`] | Writes per-document JSON, barrel modules and `tags.json` |
//! | [`compile`] | Markdown to ES module: anchors, highlighting, table of contents |
//! | [`highlight`] | Small keyword highlighter and language detector |
//! | [`feeds`] | RSS 2.0 and sitemap XML |
//! | [`images`] | Image asset barrel with pixel dimensions |
//! | [`query`] | Loads emitted JSON; listings and slug lookups |
//! | [`gate`] | Timestamp-based incremental build check |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`layout`] | Output paths |
//! | [`naming`] | Slugs, heading anchors, JavaScript export names |
//! | [`types`] | Shared types: documents, payloads, failures, progress events |
//! | [`output`] | CLI output formatting |
//!
//! # Failure Policy
//!
//! Two kinds of problems are kept apart. A malformed content tree (wrong
//! nesting, a document without a front matter fence) or an I/O error is a
//! module error and stops the stage. A document whose front matter is wrong
//! is a [`types::Failure`]: the stage keeps going, reports every failure at
//! the end, and the process exits non-zero.

pub mod compile;
pub mod config;
pub mod emit;
pub mod extract;
pub mod feeds;
pub mod frontmatter;
pub mod gate;
pub mod highlight;
pub mod history;
pub mod images;
pub mod layout;
pub mod naming;
pub mod output;
pub mod query;
pub mod scan;
pub mod schema;
pub mod series;
pub mod tags;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
