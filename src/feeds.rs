//! RSS 2.0 and sitemap generation.
//!
//! Both feeds cover the published category only (`feeds.category`) and take
//! their absolute URLs from `[site].url`. Items follow the listing order of
//! [`ContentStore::all_frontmatter`], newest first.
//!
//! XML is produced through quick-xml's event writer, which escapes text
//! content.

use crate::config::{PipelineConfig, SiteMeta};
use crate::layout::{self, OutputLayout};
use crate::query::ContentStore;
use crate::types::FrontMatterPayload;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const RSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("XML error: {0}")]
    Xml(String),
    #[error("XML output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

type XmlWriter = Writer<Vec<u8>>;

/// Number of items written to each feed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub items: usize,
}

/// Write `rss.xml` and `sitemap.xml` under `<output>/feeds/`.
pub fn write_feeds(
    store: &ContentStore,
    config: &PipelineConfig,
    layout: &OutputLayout,
) -> Result<FeedSummary, FeedError> {
    let items = store.all_frontmatter(&config.feeds.category);
    if items.is_empty() {
        tracing::warn!(category = %config.feeds.category, "no documents in the published category");
    }

    let dir = layout.feeds_dir();
    layout::reset_dir(&dir).map_err(|source| FeedError::Write {
        path: dir.clone(),
        source,
    })?;

    let rss = rss(&config.site, &items)?;
    write(layout.rss_file(), rss)?;
    let sitemap = sitemap(&config.site, &items)?;
    write(layout.sitemap_file(), sitemap)?;

    Ok(FeedSummary { items: items.len() })
}

fn write(path: PathBuf, contents: String) -> Result<(), FeedError> {
    fs::write(&path, contents).map_err(|source| FeedError::Write { path, source })
}

/// RSS 2.0 document for `items`.
pub fn rss(site: &SiteMeta, items: &[&FrontMatterPayload]) -> Result<String, FeedError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    declaration(&mut w)?;
    start(&mut w, BytesStart::new("rss").with_attributes([("version", "2.0")]))?;
    start(&mut w, BytesStart::new("channel"))?;

    text_element(&mut w, "title", &site.title)?;
    text_element(&mut w, "description", &site.description)?;
    text_element(&mut w, "language", &site.language)?;
    text_element(&mut w, "link", &site.url)?;
    if let Some(image) = &site.image {
        start(&mut w, BytesStart::new("image"))?;
        text_element(&mut w, "url", image)?;
        text_element(&mut w, "title", &site.title)?;
        text_element(&mut w, "link", &site.url)?;
        end(&mut w, "image")?;
    }

    for item in items {
        let link = site.link(&item.slug);
        let meta = &item.frontmatter.meta;
        start(&mut w, BytesStart::new("item"))?;
        text_element(&mut w, "title", &meta.title)?;
        text_element(&mut w, "description", &meta.description)?;
        text_element(&mut w, "link", &link)?;
        text_element(&mut w, "guid", &link)?;
        if let Some(date) = &meta.date_created {
            text_element(&mut w, "pubDate", &rss_date(date))?;
        }
        end(&mut w, "item")?;
    }

    end(&mut w, "channel")?;
    end(&mut w, "rss")?;
    finish(w)
}

/// Sitemap (sitemaps.org 0.9) for `items`.
pub fn sitemap(site: &SiteMeta, items: &[&FrontMatterPayload]) -> Result<String, FeedError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    declaration(&mut w)?;
    start(&mut w, BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]))?;
    for item in items {
        start(&mut w, BytesStart::new("url"))?;
        text_element(&mut w, "loc", &site.link(&item.slug))?;
        if let Some(date) = &item.frontmatter.meta.date_created {
            text_element(&mut w, "lastmod", &crate::frontmatter::format_date(date))?;
        }
        end(&mut w, "url")?;
    }
    end(&mut w, "urlset")?;
    finish(w)
}

/// RFC 822 date in UTC, e.g. `Mon, 28 Nov 2022 00:00:00 GMT`.
pub fn rss_date(date: &DateTime<Utc>) -> String {
    date.format(RSS_DATE_FORMAT).to_string()
}

fn declaration(w: &mut XmlWriter) -> Result<(), FeedError> {
    event(w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
}

fn start(w: &mut XmlWriter, tag: BytesStart) -> Result<(), FeedError> {
    event(w, Event::Start(tag))
}

fn end(w: &mut XmlWriter, name: &str) -> Result<(), FeedError> {
    event(w, Event::End(BytesEnd::new(name)))
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> Result<(), FeedError> {
    start(w, BytesStart::new(name))?;
    event(w, Event::Text(BytesText::new(text)))?;
    end(w, name)
}

fn event(w: &mut XmlWriter, event: Event) -> Result<(), FeedError> {
    w.write_event(event).map_err(|e| FeedError::Xml(e.to_string()))
}

fn finish(w: XmlWriter) -> Result<String, FeedError> {
    let mut xml = String::from_utf8(w.into_inner())?;
    xml.push('\n');
    Ok(xml)
}
