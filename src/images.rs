//! Image asset barrel.
//!
//! `meta.image` names an image asset by its file stem. The web tier resolves
//! that name through a generated module listing every asset with its pixel
//! dimensions, so pages can reserve layout space before the image loads:
//!
//! ```js
//! import src0 from '../../assets/pipeline_diagram.png';
//! import src1 from '../../assets/sheep.webp';
//!
//! const image0 = {src: src0, width: 1200, height: 630};
//! const image1 = {src: src1, width: 640, height: 480};
//!
//! export {image0 as pipeline_diagram, image1 as sheep};
//! ```
//!
//! The asset directory is flat: only files directly inside it are listed.
//! Dimensions come from the image header via [`image::image_dimensions`];
//! nothing is decoded or resized. Import specifiers are relative to the
//! barrel, so the bundler resolves the asset files themselves.

use crate::config::ImagesConfig;
use crate::layout::{self, OutputLayout};
use crate::naming;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot walk asset directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to read dimensions of {path}: {source}")]
    Dimensions {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Duplicate image name `{name}`: {first} and {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Non UTF-8 file name: {0}")]
    NonUtf8Name(PathBuf),
}

/// One listed asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// File stem; the value `meta.image` refers to.
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
pub struct ImageSummary {
    pub images: usize,
}

/// Every image directly inside `dir`, sorted by name.
///
/// A missing directory lists nothing.
pub fn collect(dir: &Path, config: &ImagesConfig) -> Result<Vec<ImageAsset>, ImageError> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "no asset directory");
        return Ok(Vec::new());
    }

    let mut by_name: BTreeMap<String, ImageAsset> = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.is_image_extension(e));
        if !entry.file_type().is_file() || !is_image {
            continue;
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ImageError::NonUtf8Name(path.to_path_buf()))?
            .to_string();
        let (width, height) =
            image::image_dimensions(path).map_err(|source| ImageError::Dimensions {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(first) = by_name.get(&name) {
            return Err(ImageError::DuplicateName {
                name,
                first: first.path.clone(),
                second: path.to_path_buf(),
            });
        }
        by_name.insert(
            name.clone(),
            ImageAsset {
                name,
                path: path.to_path_buf(),
                width,
                height,
            },
        );
    }
    Ok(by_name.into_values().collect())
}

/// Write `<output>/images/index.js` for the assets in `assets_dir`.
pub fn write_image_barrel(
    assets_dir: &Path,
    layout: &OutputLayout,
    config: &ImagesConfig,
) -> Result<ImageSummary, ImageError> {
    let assets = collect(assets_dir, config)?;

    let dir = layout.images_dir();
    layout::reset_dir(&dir)?;
    let barrel_dir = dir.canonicalize()?;
    let mut specifiers = Vec::with_capacity(assets.len());
    for asset in &assets {
        specifiers.push(import_specifier(&barrel_dir, &asset.path.canonicalize()?));
    }

    fs::write(layout.image_barrel(), barrel_source(&assets, &specifiers))?;
    tracing::debug!(images = assets.len(), "image barrel written");
    Ok(ImageSummary {
        images: assets.len(),
    })
}

/// Module text for `assets`, importing each from the matching specifier.
pub fn barrel_source(assets: &[ImageAsset], specifiers: &[String]) -> String {
    if assets.is_empty() {
        return "export {};\n".to_string();
    }

    let mut out = String::new();
    for (i, specifier) in specifiers.iter().enumerate() {
        out.push_str(&format!("import src{i} from '{specifier}';\n"));
    }
    out.push('\n');
    for (i, asset) in assets.iter().enumerate() {
        out.push_str(&format!(
            "const image{i} = {{src: src{i}, width: {}, height: {}}};\n",
            asset.width, asset.height
        ));
    }
    let exports: Vec<String> = assets
        .iter()
        .enumerate()
        .map(|(i, asset)| format!("image{i} as {}", naming::export_name(&asset.name)))
        .collect();
    out.push_str(&format!("\nexport {{{}}};\n", exports.join(", ")));
    out
}

/// Relative ES import specifier from `from_dir` to `target`.
///
/// Both paths must be canonical.
fn import_specifier(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}
