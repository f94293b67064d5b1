//! Tag aggregation.
//!
//! Folds validated payloads into a [`TagIndex`]: tag → slugs carrying it.
//! Documents without tags land in the [`UNTAGGED`](crate::frontmatter::UNTAGGED)
//! bucket. The fold runs once, after every worker has finished, so there is
//! no shared accumulator.
//!
//! Buckets and their contents are sorted so `tags.json` is byte-stable
//! between runs.

use crate::types::FrontMatterPayload;
use std::collections::BTreeMap;

pub type TagIndex = BTreeMap<String, Vec<String>>;

pub fn aggregate<'a>(payloads: impl IntoIterator<Item = &'a FrontMatterPayload>) -> TagIndex {
    let mut index = TagIndex::new();
    for payload in payloads {
        for tag in payload.frontmatter.effective_tags() {
            index
                .entry(tag.to_string())
                .or_default()
                .push(payload.slug.clone());
        }
    }
    for slugs in index.values_mut() {
        slugs.sort();
        slugs.dedup();
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::{FrontMatter, Meta};

    fn payload(slug: &str, tags: &[&str]) -> FrontMatterPayload {
        FrontMatterPayload {
            slug: slug.into(),
            frontmatter: FrontMatter {
                meta: Meta {
                    title: "T".into(),
                    description: "D".into(),
                    date_created: None,
                    image: None,
                },
                tags: tags.iter().map(|t| t.to_string()).collect(),
                series: None,
            },
        }
    }

    #[test]
    fn document_appears_in_every_declared_bucket() {
        let index = aggregate(&[payload("bar/a", &["a", "b"])]);
        assert_eq!(index["a"], vec!["bar/a"]);
        assert_eq!(index["b"], vec!["bar/a"]);
        assert!(!index.contains_key("untagged"));
    }

    #[test]
    fn untagged_documents_use_sentinel_bucket() {
        let index = aggregate(&[payload("foo/c", &[])]);
        assert_eq!(index.len(), 1);
        assert_eq!(index["untagged"], vec!["foo/c"]);
    }

    #[test]
    fn buckets_are_sorted_regardless_of_input_order() {
        let index = aggregate(&[
            payload("bar/b", &["foo"]),
            payload("foo/d", &[]),
            payload("bar/a", &["foo", "bar"]),
            payload("foo/c", &["untagged"]),
        ]);
        let expected: TagIndex = [
            ("bar".to_string(), vec!["bar/a".to_string()]),
            (
                "foo".to_string(),
                vec!["bar/a".to_string(), "bar/b".to_string()],
            ),
            (
                "untagged".to_string(),
                vec!["foo/c".to_string(), "foo/d".to_string()],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(index, expected);
    }

    #[test]
    fn repeated_tag_on_one_document_counts_once() {
        let index = aggregate(&[payload("bar/a", &["x", "x"])]);
        assert_eq!(index["x"], vec!["bar/a"]);
    }

    #[test]
    fn empty_input_gives_empty_index() {
        assert!(aggregate(&[]).is_empty());
    }
}
