//! On-disk artifact layout.
//!
//! Everything the serving layer imports lives under one output root:
//!
//! ```text
//! generated/
//! ├── frontmatter/
//! │   ├── tags.json               # tag → [slug]
//! │   └── posts/
//! │       ├── hello_world.json    # {slug, frontmatter}
//! │       └── index.js            # barrel: export {default as hello_world} from './hello_world.json';
//! ├── mdx/
//! │   └── posts/
//! │       ├── hello_world.mjs     # compiled body module
//! │       └── index.mjs           # registry: export {default as hello_world} from './hello_world.mjs';
//! ├── feeds/
//! │   ├── rss.xml
//! │   └── sitemap.xml
//! └── images/
//!     └── index.js                # {src, width, height} per image asset
//! ```
//!
//! These paths are a contract with import statements in the web tier.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const FRONTMATTER_DIR: &str = "frontmatter";
pub const MDX_DIR: &str = "mdx";
pub const FEEDS_DIR: &str = "feeds";
pub const IMAGES_DIR: &str = "images";
pub const TAGS_FILE: &str = "tags.json";
pub const FRONTMATTER_BARREL: &str = "index.js";
pub const MODULE_REGISTRY: &str = "index.mjs";
pub const IMAGE_BARREL: &str = "index.js";
pub const MODULE_EXT: &str = "mjs";
pub const RSS_FILE: &str = "rss.xml";
pub const SITEMAP_FILE: &str = "sitemap.xml";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frontmatter_dir(&self) -> PathBuf {
        self.root.join(FRONTMATTER_DIR)
    }

    pub fn mdx_dir(&self) -> PathBuf {
        self.root.join(MDX_DIR)
    }

    pub fn feeds_dir(&self) -> PathBuf {
        self.root.join(FEEDS_DIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn image_barrel(&self) -> PathBuf {
        self.images_dir().join(IMAGE_BARREL)
    }

    pub fn tags_file(&self) -> PathBuf {
        self.frontmatter_dir().join(TAGS_FILE)
    }

    pub fn frontmatter_file(&self, category: &str, id: &str) -> PathBuf {
        self.frontmatter_dir()
            .join(category)
            .join(format!("{id}.json"))
    }

    pub fn module_file(&self, category: &str, id: &str) -> PathBuf {
        self.mdx_dir()
            .join(category)
            .join(format!("{id}.{MODULE_EXT}"))
    }

    pub fn rss_file(&self) -> PathBuf {
        self.feeds_dir().join(RSS_FILE)
    }

    pub fn sitemap_file(&self) -> PathBuf {
        self.feeds_dir().join(SITEMAP_FILE)
    }
}

/// Empty `dir`, creating it if needed.
///
/// Stages own their subtree outright, so stale artifacts from documents that
/// were deleted or renamed never survive a run.
pub fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        tracing::debug!(dir = %dir.display(), "clearing output directory");
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_layout() {
        let layout = OutputLayout::new("/out");
        assert_eq!(
            layout.frontmatter_file("posts", "a"),
            Path::new("/out/frontmatter/posts/a.json")
        );
        assert_eq!(
            layout.module_file("posts", "a"),
            Path::new("/out/mdx/posts/a.mjs")
        );
        assert_eq!(layout.tags_file(), Path::new("/out/frontmatter/tags.json"));
        assert_eq!(layout.rss_file(), Path::new("/out/feeds/rss.xml"));
        assert_eq!(layout.sitemap_file(), Path::new("/out/feeds/sitemap.xml"));
        assert_eq!(layout.image_barrel(), Path::new("/out/images/index.js"));
    }

    #[test]
    fn reset_dir_removes_stale_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("frontmatter");
        fs::create_dir_all(dir.join("posts")).unwrap();
        fs::write(dir.join("posts/stale.json"), "{}").unwrap();

        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn reset_dir_creates_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b");
        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
