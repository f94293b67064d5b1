//! Front matter: the YAML block at the top of every content document.
//!
//! A document looks like this:
//!
//! ```text
//! ---
//! meta:
//!   title: Writing a build pipeline
//!   description: Notes on turning a pile of scripts into a compiler
//!   dateCreated: 2022-11-28
//!   image: pipeline_diagram
//! tags:
//!   - rust
//!   - tooling
//! series:
//!   name: pipelines
//!   part: 1
//!   description: A three part series on build tooling
//! ---
//!
//! # Body starts here
//! ```
//!
//! This module owns the typed representation ([`FrontMatter`]), fence
//! splitting, raw YAML parsing and the normalisation both pipeline stages
//! apply before validation. Validation itself lives in [`crate::schema`].
//!
//! ## Dates
//!
//! `meta.dateCreated` is accepted as an RFC 3339 timestamp or a bare
//! `YYYY-MM-DD` date (midnight UTC) and is always written back out as
//! ISO-8601 UTC with millisecond precision (`2022-11-28T00:00:00.000Z`).
//! Downstream code parses that exact shape, so it must not drift.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The fence line that opens and closes the front matter block.
const FENCE: &str = "---";

/// Tag assigned to documents that declare no tags.
pub const UNTAGGED: &str = "untagged";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing front matter: document must start with a `---` fenced block")]
    MissingStartFence,
    #[error("missing front matter: no closing `---` line")]
    MissingEndFence,
    #[error("front matter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Validated per-document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub meta: Meta,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub title: String,
    pub description: String,
    /// Always present once a document has been through extraction; only the
    /// compiler's re-validation sees documents without it.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso_date")]
    pub date_created: Option<DateTime<Utc>>,
    /// Name of an image asset, resolved by the web tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// 1-indexed position within the series.
    pub part: u32,
    /// Only carried by the first part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FrontMatter {
    /// Tags this document contributes to, falling back to [`UNTAGGED`].
    pub fn effective_tags(&self) -> Vec<&str> {
        if self.tags.is_empty() {
            vec![UNTAGGED]
        } else {
            self.tags.iter().map(String::as_str).collect()
        }
    }
}

/// Split a document into its raw YAML block and its body.
///
/// The block must open on the very first line (an optional UTF-8 BOM is
/// tolerated) and ends at the next line consisting solely of `---`.
pub fn split(input: &str) -> Result<(&str, &str), FrontMatterError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');

    let first = lines.next().ok_or(FrontMatterError::MissingStartFence)?;
    if first.trim_end() != FENCE {
        return Err(FrontMatterError::MissingStartFence);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            let yaml = &input[yaml_start..offset];
            let body = &input[offset + line.len()..];
            return Ok((yaml, body));
        }
        offset += line.len();
    }
    Err(FrontMatterError::MissingEndFence)
}

/// Parse a raw YAML block into a JSON-compatible value.
///
/// An empty block parses to `null`, which the schema then rejects.
pub fn parse_raw(yaml: &str) -> Result<Value, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Apply the defaults shared by extraction and compilation.
///
/// - absent `tags` becomes `["untagged"]`
/// - a parseable `meta.dateCreated` string is rewritten in canonical form
///
/// Anything that is not an object is left untouched for the schema to report.
pub fn normalize(mut raw: Value) -> Value {
    if let Value::Object(root) = &mut raw {
        root.entry("tags")
            .or_insert_with(|| Value::Array(vec![Value::String(UNTAGGED.to_string())]));

        if let Some(Value::Object(meta)) = root.get_mut("meta")
            && let Some(Value::String(date)) = meta.get_mut("dateCreated")
            && let Some(parsed) = parse_date(date)
        {
            *date = format_date(&parsed);
        }
    }
    raw
}

/// Whether `meta.dateCreated` is missing from a raw value.
pub fn lacks_date(raw: &Value) -> bool {
    raw.get("meta")
        .and_then(Value::as_object)
        .is_some_and(|meta| !meta.contains_key("dateCreated"))
}

/// Parse a front matter date: RFC 3339, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical serialised form of a date.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod iso_date {
    use super::{format_date, parse_date};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&format_date(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date `{s}`"))),
            None => Ok(None),
        }
    }
}
