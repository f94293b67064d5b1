//! Pipeline configuration.
//!
//! Loaded from an optional `config.toml` in the content root. Stock defaults
//! are serialised to a TOML table, the user file is merged on top key by key,
//! and the result is deserialised and validated:
//!
//! ```text
//! stock defaults ──► merge_toml(user config.toml) ──► PipelineConfig ──► validate()
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! extensions = ["mdx", "md"]   # Content file extensions
//! categories = []              # Allowed category directories (empty = any)
//!
//! [site]
//! title = "Blog"
//! description = ""
//! language = "en"
//! url = "https://example.com"
//! # image = "/og.png"
//!
//! [feeds]
//! category = "posts"           # The published category fed into RSS/sitemap
//!
//! [compile]
//! highlight = true             # Annotate fenced code blocks
//! detect_language = true       # Guess a language for unlabelled blocks
//! toc_max_depth = 3            # Deepest heading level listed in a TOC
//!
//! [images]
//! extensions = ["webp", "png", "jpg", "jpeg", "gif"]  # Listed in the image barrel
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! history_timeout_secs = 30    # Per-file git history lookup timeout
//! ```
//!
//! Config files are sparse: override only the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the content root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// File extensions (without the dot) that mark a content document.
    pub extensions: Vec<String>,
    /// Allowed category directory names. Empty accepts any directory.
    pub categories: Vec<String>,
    /// Channel metadata for feeds.
    pub site: SiteMeta,
    pub feeds: FeedsConfig,
    pub compile: CompileConfig,
    pub images: ImagesConfig,
    pub processing: ProcessingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mdx".to_string(), "md".to_string()],
            categories: Vec::new(),
            site: SiteMeta::default(),
            feeds: FeedsConfig::default(),
            compile: CompileConfig::default(),
            images: ImagesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(ConfigError::Validation(format!(
                "extensions must be bare names like \"mdx\", got {bad:?}"
            )));
        }
        if let Some(bad) = self
            .categories
            .iter()
            .find(|c| c.is_empty() || c.contains(['/', '\\']))
        {
            return Err(ConfigError::Validation(format!(
                "categories must be plain directory names, got {bad:?}"
            )));
        }
        if !self.categories.is_empty() && !self.categories.contains(&self.feeds.category) {
            return Err(ConfigError::Validation(format!(
                "feeds.category {:?} is not one of the configured categories",
                self.feeds.category
            )));
        }
        if !(self.site.url.starts_with("http://") || self.site.url.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "site.url must be an absolute http(s) URL".into(),
            ));
        }
        if !(1..=6).contains(&self.compile.toc_max_depth) {
            return Err(ConfigError::Validation(
                "compile.toc_max_depth must be 1-6".into(),
            ));
        }
        if self.images.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "images.extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .images
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(ConfigError::Validation(format!(
                "images.extensions must be bare names like \"png\", got {bad:?}"
            )));
        }
        if self.processing.history_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "processing.history_timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Whether `ext` (case-insensitive, no dot) marks a content document.
    pub fn is_content_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Site-wide metadata written into feed channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    /// Language tag for the RSS channel, e.g. `en` or `en-gb`.
    pub language: String,
    /// Absolute base URL. Document links are `<url>/<category>/<id>`.
    pub url: String,
    /// Channel image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            description: String::new(),
            language: "en".to_string(),
            url: "https://example.com".to_string(),
            image: None,
        }
    }
}

impl SiteMeta {
    /// Absolute URL for a slug, tolerant of a trailing slash on the base.
    pub fn link(&self, slug: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedsConfig {
    /// Category whose documents appear in RSS and the sitemap.
    pub category: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            category: "posts".to_string(),
        }
    }
}

/// Body compiler switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub highlight: bool,
    pub detect_language: bool,
    pub toc_max_depth: u8,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            highlight: true,
            detect_language: true,
            toc_max_depth: 3,
        }
    }
}

/// Which files in the asset directory count as images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub extensions: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: ["webp", "png", "jpg", "jpeg", "gif"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ImagesConfig {
    pub fn is_image_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
    /// Seconds a single `git log` call may run before it is killed.
    pub history_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            history_timeout_secs: 30,
        }
    }
}

impl ProcessingConfig {
    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs)
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the content root, falling back to defaults.
pub fn load_config(root: &Path) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(root = %root.display(), ?config, "loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# postforge configuration
# =======================
# Place this file in the content root. All settings are optional; values
# shown below are the defaults. Unknown keys cause an error.

# File extensions (without the dot) treated as content documents.
extensions = ["mdx", "md"]

# Allowed category directories directly under the content root.
# Empty accepts any directory name.
categories = []

# ---------------------------------------------------------------------------
# Site metadata (RSS channel, absolute links)
# ---------------------------------------------------------------------------
[site]
title = "Blog"
description = ""
language = "en"
# Absolute base URL; document links are <url>/<category>/<id>.
url = "https://example.com"
# image = "https://example.com/og.png"

# ---------------------------------------------------------------------------
# Feeds
# ---------------------------------------------------------------------------
[feeds]
# Only documents in this category appear in rss.xml and sitemap.xml.
category = "posts"

# ---------------------------------------------------------------------------
# Body compilation
# ---------------------------------------------------------------------------
[compile]
# Wrap tokens in fenced code blocks with hljs-* spans.
highlight = true
# Guess a language for code blocks without an info string.
detect_language = true
# Deepest heading level (2-6) listed in a [[toc]] table of contents.
toc_max_depth = 3

# ---------------------------------------------------------------------------
# Image assets
# ---------------------------------------------------------------------------
[images]
# Files in the asset directory (--assets) listed in images/index.js.
extensions = ["webp", "png", "jpg", "jpeg", "gif"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4

# Seconds a single git history lookup may take before it is killed.
history_timeout_secs = 30
"##
}
