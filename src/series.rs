//! Series linking.
//!
//! A series is an author-declared ordered group of documents sharing a
//! `series.name` within one category. Groups are derived on demand, never
//! persisted.
//!
//! "Next in series" for a document at part `P` is the entry at **array index
//! `P`** of the group sorted by part, so part 1 finds part 2 at index 1 and the
//! final part finds nothing. With gapped parts (1, 3, 4) this follows array
//! position, not part arithmetic: index 1 holds part 3.
//!
//! Duplicate `(name, part)` pairs make that lookup ambiguous, so
//! [`find_duplicate_parts`] lets extraction reject them up front.

use crate::types::FrontMatterPayload;
use serde::Serialize;
use std::collections::BTreeMap;

/// One entry of a series listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesEntry {
    pub slug: String,
    pub title: String,
    pub part: u32,
}

/// Series information attached to a document at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesLinks {
    pub name: String,
    /// Taken from the first part, the only one that carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// This document's part.
    pub part: u32,
    /// All parts, ascending.
    pub parts: Vec<SeriesEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<SeriesEntry>,
}

/// Every payload in `target`'s category with the same series name, sorted by part.
///
/// Returns an empty group when `target` is not part of a series.
pub fn series_group<'a>(
    target: &FrontMatterPayload,
    all: &'a [FrontMatterPayload],
) -> Vec<&'a FrontMatterPayload> {
    let Some(series) = &target.frontmatter.series else {
        return Vec::new();
    };
    let category = target.category();
    let mut group: Vec<&FrontMatterPayload> = all
        .iter()
        .filter(|p| p.category() == category)
        .filter(|p| {
            p.frontmatter
                .series
                .as_ref()
                .is_some_and(|s| s.name == series.name)
        })
        .collect();
    group.sort_by_key(|p| (part_of(p), p.slug.clone()));
    group
}

/// The document following part `part` in a sorted group, if any.
pub fn next_in_series<'a>(
    group: &[&'a FrontMatterPayload],
    part: u32,
) -> Option<&'a FrontMatterPayload> {
    usize::try_from(part).ok().and_then(|i| group.get(i)).copied()
}

/// Build the series links for `target`, or `None` when it declares no series.
pub fn link(target: &FrontMatterPayload, all: &[FrontMatterPayload]) -> Option<SeriesLinks> {
    let series = target.frontmatter.series.as_ref()?;
    let group = series_group(target, all);

    let description = group
        .iter()
        .find(|p| part_of(p) == 1)
        .and_then(|p| p.frontmatter.series.as_ref())
        .and_then(|s| s.description.clone());

    Some(SeriesLinks {
        name: series.name.clone(),
        description,
        part: series.part,
        parts: group.iter().map(|p| entry(p)).collect(),
        next: next_in_series(&group, series.part).map(entry),
    })
}

fn entry(payload: &FrontMatterPayload) -> SeriesEntry {
    SeriesEntry {
        slug: payload.slug.clone(),
        title: payload.frontmatter.meta.title.clone(),
        part: part_of(payload),
    }
}

fn part_of(payload: &FrontMatterPayload) -> u32 {
    payload.frontmatter.series.as_ref().map_or(0, |s| s.part)
}

/// Two or more documents claiming the same part of one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePart {
    pub category: String,
    pub name: String,
    pub part: u32,
    /// Sorted.
    pub slugs: Vec<String>,
}

/// Find every `(category, series.name, series.part)` claimed more than once.
pub fn find_duplicate_parts(payloads: &[FrontMatterPayload]) -> Vec<DuplicatePart> {
    let mut claims: BTreeMap<(String, String, u32), Vec<String>> = BTreeMap::new();
    for payload in payloads {
        if let Some(series) = &payload.frontmatter.series {
            claims
                .entry((
                    payload.category().to_string(),
                    series.name.clone(),
                    series.part,
                ))
                .or_default()
                .push(payload.slug.clone());
        }
    }
    claims
        .into_iter()
        .filter(|(_, slugs)| slugs.len() > 1)
        .map(|((category, name, part), mut slugs)| {
            slugs.sort();
            DuplicatePart {
                category,
                name,
                part,
                slugs,
            }
        })
        .collect()
}
