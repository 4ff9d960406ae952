//! Condense a maximal metadata mapping into the fixed catalog schema.
//!
//! Each output field has an ordered list of candidate source keys (exiftool's
//! group-prefixed names first, then the built-in scraper's) and a shape adapter.
//! The first candidate whose value the adapter accepts wins.

use crate::metadata::value::{MetaValue, MetadataMap};

const TITLE_KEYS: &[&str] = &[
    "XMP-dc:Description",
    "IFD0:ImageDescription",
    "Description",
    "ImageDescription",
    "XMP:dc.description",
    "EXIF:ImageDescription",
];
const BEGIN_KEYS: &[&str] = &[
    "EXIF:CreateDate",
    "CreateDate",
    "XMP-xmp:CreateDate",
    "ExifIFD:CreateDate",
    "XMP:xmp.CreateDate",
    "EXIF:DateTimeDigitized",
];
const CREATOR_KEYS: &[&str] = &["IPTC:By-line", "IFD0:Artist", "Creator", "Artist", "EXIF:Artist"];
const PERSON_KEYS: &[&str] = &["XMP-iptcExt:PersonInImage", "XMP:Iptc4xmpExt.PersonInImage"];
const SUPPLIER_KEYS: &[&str] = &["XMP-plus:ImageSupplier", "XMP:plus.ImageSupplier"];
const SUPPLIER_NAME: &str = "ImageSupplierName";
const LOCATION_KEYS: &[&str] = &["XMP-iptcCore:Location", "XMP:Iptc4xmpCore.Location"];
const HEADLINE_KEYS: &[&str] = &[
    "XMP-photoshop:Headline",
    "XMP:photoshop.Headline",
    "IPTC:Headline",
];

/// Location sub-fields joined into a single note, in this order.
const LOCATION_PARTS: &[&str] = &["Sublocation", "City", "ProvinceState", "CountryName"];

pub const CONDENSED_FIELDS: [&str; 7] = [
    "title",
    "begin",
    "people_agent_header_1",
    "people_agent_header_2",
    "subject_1_term",
    "n_odd",
    "n_abstract",
];

#[derive(Debug, Clone, Copy)]
enum Shape {
    Plain,
    /// Single-line text with collapsed spacing.
    Text,
    /// A list of names joined with spaces.
    People,
    /// A child field of a structure, or of each structure in a list.
    Nested(&'static str),
    Location,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CondensedRecord {
    pub title: Option<MetaValue>,
    pub begin: Option<MetaValue>,
    pub people_agent_header_1: Option<MetaValue>,
    pub people_agent_header_2: Option<MetaValue>,
    pub subject_1_term: Option<MetaValue>,
    pub n_odd: Option<MetaValue>,
    pub n_abstract: Option<MetaValue>,
}

impl CondensedRecord {
    /// Field names and values in catalog column order.
    pub fn fields(&self) -> [(&'static str, Option<&MetaValue>); 7] {
        [
            (CONDENSED_FIELDS[0], self.title.as_ref()),
            (CONDENSED_FIELDS[1], self.begin.as_ref()),
            (CONDENSED_FIELDS[2], self.people_agent_header_1.as_ref()),
            (CONDENSED_FIELDS[3], self.people_agent_header_2.as_ref()),
            (CONDENSED_FIELDS[4], self.subject_1_term.as_ref()),
            (CONDENSED_FIELDS[5], self.n_odd.as_ref()),
            (CONDENSED_FIELDS[6], self.n_abstract.as_ref()),
        ]
    }

    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .and_then(|(_, value)| value)
    }
}

pub fn condense_metadata(meta: &MetadataMap) -> CondensedRecord {
    CondensedRecord {
        title: extract(meta, TITLE_KEYS, Shape::Text),
        begin: extract(meta, BEGIN_KEYS, Shape::Plain),
        people_agent_header_1: extract(meta, CREATOR_KEYS, Shape::Plain),
        people_agent_header_2: extract(meta, PERSON_KEYS, Shape::People),
        subject_1_term: extract(meta, SUPPLIER_KEYS, Shape::Nested(SUPPLIER_NAME)),
        n_odd: extract(meta, LOCATION_KEYS, Shape::Location),
        n_abstract: extract(meta, HEADLINE_KEYS, Shape::Plain),
    }
}

fn extract(meta: &MetadataMap, keys: &[&str], shape: Shape) -> Option<MetaValue> {
    keys.iter()
        .filter_map(|k| meta.get(*k))
        .find_map(|value| adapt(shape, value))
}

fn adapt(shape: Shape, value: &MetaValue) -> Option<MetaValue> {
    match shape {
        Shape::Plain => Some(value.clone()),
        Shape::Text => Some(match value.as_text() {
            Some(text) => MetaValue::text(clean_text(text)),
            None => value.clone(),
        }),
        Shape::People => join_people(value),
        Shape::Nested(child) => extract_nested(value, child),
        Shape::Location => Some(location(value)),
    }
}

/// Drop trailing spaces, turn newlines into spaces, and collapse runs of spaces.
pub fn clean_text(text: &str) -> String {
    let text = text.trim_end_matches(' ').replace("\r\n", "\n").replace('\n', " ");
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}

fn join_people(value: &MetaValue) -> Option<MetaValue> {
    match value.as_list() {
        Some([]) => None,
        Some(people) => {
            let names: Vec<String> = people.iter().map(|p| p.to_string()).collect();
            Some(MetaValue::text(names.join(" ")))
        }
        None => Some(value.clone()),
    }
}

fn extract_nested(parent: &MetaValue, child: &str) -> Option<MetaValue> {
    match parent {
        MetaValue::Structure(fields) => fields.get(child).cloned(),
        MetaValue::List(items) if items.iter().all(|v| v.as_text().is_some()) => {
            Some(parent.clone())
        }
        MetaValue::List(items) if items.iter().all(|v| v.as_structure().is_some()) => {
            let mut values: Vec<MetaValue> = items
                .iter()
                .filter_map(|v| v.as_structure().and_then(|s| s.get(child)).cloned())
                .collect();
            match values.len() {
                0 => None,
                1 => values.pop(),
                _ => Some(MetaValue::List(values)),
            }
        }
        other => Some(other.clone()),
    }
}

fn location(value: &MetaValue) -> MetaValue {
    let Some(fields) = value.as_structure() else {
        return value.clone();
    };
    let pieces: Vec<String> = LOCATION_PARTS
        .iter()
        .filter_map(|k| fields.get(*k))
        .filter(|v| v.is_scalar() && v.is_present())
        .map(|v| v.to_string())
        .collect();
    if pieces.is_empty() {
        value.clone()
    } else {
        MetaValue::text(pieces.join(", "))
    }
}
