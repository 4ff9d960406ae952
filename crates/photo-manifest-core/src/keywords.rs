use crate::metadata::value::{MetaValue, MetadataMap};
use std::collections::BTreeSet;

/// Windows `XPKeywords`, one `;`-separated string.
const WINDOWS_KEYS: &[&str] = &["IFD0:XPKeywords", "EXIF:XPKeywords", "XPKeywords"];
const IPTC_KEYS: &[&str] = &["IPTC:Keywords", "Keywords"];
const SUBJECT_KEYS: &[&str] = &["XMP-dc:Subject", "XMP:dc.subject", "Subject"];
/// Lightroom hierarchy paths such as `Places|Campus|Library`.
const HIERARCHY_KEYS: &[&str] = &[
    "XMP-lr:HierarchicalSubject",
    "XMP:lr.hierarchicalSubject",
    "HierarchicalSubject",
];

/// Merged keyword set from every keyword field the reader knows, trimmed,
/// deduplicated and sorted.
pub fn extract_keywords(meta: &MetadataMap) -> Vec<String> {
    let mut keywords = BTreeSet::new();

    for value in values(meta, WINDOWS_KEYS) {
        for text in texts(value) {
            keywords.extend(split(&text, ';'));
        }
    }
    for value in values(meta, IPTC_KEYS).chain(values(meta, SUBJECT_KEYS)) {
        for text in texts(value) {
            let text = text.trim();
            if !text.is_empty() {
                keywords.insert(text.to_string());
            }
        }
    }
    for value in values(meta, HIERARCHY_KEYS) {
        for text in texts(value) {
            keywords.extend(split(&text, '|'));
        }
    }

    keywords.into_iter().collect()
}

fn values<'a>(
    meta: &'a MetadataMap,
    keys: &'a [&'a str],
) -> impl Iterator<Item = &'a MetaValue> + 'a {
    keys.iter().filter_map(move |k| meta.get(*k))
}

fn texts(value: &MetaValue) -> Vec<String> {
    match value {
        MetaValue::Scalar(s) => vec![s.to_string()],
        MetaValue::List(items) => items.iter().flat_map(texts).collect(),
        MetaValue::Structure(_) => Vec::new(),
    }
}

fn split(text: &str, separator: char) -> impl Iterator<Item = String> + '_ {
    text.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
