//! Catalog fields computed from the file and the condensed metadata.

use crate::condense::CondensedRecord;
use crate::config::AppConfig;
use crate::metadata::value::MetaValue;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const EXTENT_TYPE: &str = "MB";

const STATIC_FIELDS: [(&str, &str); 6] = [
    ("restrictions_flag", "Yes"),
    (
        "processing_note",
        "This picture was held in VandyVision, the digital asset management system called PhotoShelter.",
    ),
    ("portion", "1"),
    ("type_2", "Item"),
    ("p_acqinfo", "Yes"),
    ("n_acqinfo", "PhotoShelter https://www.photoshelter.com"),
];

/// Fields added when the named condensed field carries a value.
const CONDITIONAL_FIELDS: [(&str, [(&str, &str); 2]); 5] = [
    ("begin", [("dates_label", "creation"), ("date_type", "single")]),
    (
        "people_agent_header_1",
        [("people_agent_role_1", "creator"), ("people_agent_relator_1", "photographer")],
    ),
    (
        "people_agent_header_2",
        [("people_agent_role_2", "subject"), ("people_agent_relator_2", "associated name")],
    ),
    ("n_odd", [("p_odd", "Yes"), ("l_odd", "location")]),
    (
        "subject_1_term",
        [("subject_1_type", "topical"), ("subject_1_source", "local sources")],
    ),
];

#[derive(Debug, Clone)]
pub struct AugmentOptions {
    pub hierarchy: String,
    /// Bytes per kilobyte: 1024 or 1000.
    pub mb_base: u32,
    pub round_digits: u32,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            hierarchy: "2".to_string(),
            mb_base: 1024,
            round_digits: 3,
        }
    }
}

impl From<&AppConfig> for AugmentOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            hierarchy: config.hierarchy.clone(),
            mb_base: config.mb_base,
            round_digits: config.round_digits,
        }
    }
}

/// One catalog row: named fields in column order. Absent values stay in the
/// row as `None` so their columns still exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AugmentedRecord {
    fields: Vec<(&'static str, Option<MetaValue>)>,
}

impl AugmentedRecord {
    pub fn fields(&self) -> &[(&'static str, Option<MetaValue>)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| *field == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(field, _)| *field)
    }

    fn push(&mut self, name: &'static str, value: Option<MetaValue>) {
        self.fields.push((name, value));
    }
}

pub fn augment_condensed_metadata(
    path: &Path,
    condensed: &CondensedRecord,
    options: &AugmentOptions,
) -> AugmentedRecord {
    let mut record = AugmentedRecord::default();
    for (name, value) in condensed.fields() {
        record.push(name, value.cloned());
    }

    record.push("hierarchy", Some(MetaValue::text(options.hierarchy.as_str())));
    let number = match fs::metadata(path) {
        Ok(meta) => Some(MetaValue::float(size_in_mb(
            meta.len(),
            options.mb_base,
            options.round_digits,
        ))),
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            None
        }
    };
    record.push("number", number);
    record.push("extent_type", Some(MetaValue::text(EXTENT_TYPE)));

    for (name, value) in STATIC_FIELDS {
        record.push(name, Some(MetaValue::text(value)));
    }

    for (trigger, pair) in CONDITIONAL_FIELDS {
        if condensed.get(trigger).map_or(false, MetaValue::is_present) {
            for (name, value) in pair {
                record.push(name, Some(MetaValue::text(value)));
            }
        }
    }

    record
}

/// `bytes / base^2`, rounded to `digits` decimal places.
pub fn size_in_mb(bytes: u64, base: u32, digits: u32) -> f64 {
    let base = if base == 0 { 1024.0 } else { base as f64 };
    let mb = bytes as f64 / (base * base);
    let scale = 10f64.powi(digits.min(15) as i32);
    (mb * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_size_in_mb() {
        assert_eq!(size_in_mb(1_048_576, 1024, 3), 1.0);
        assert_eq!(size_in_mb(1_000_000, 1000, 3), 1.0);
        assert_eq!(size_in_mb(1_500_000, 1024, 3), 1.431);
        assert_eq!(size_in_mb(0, 1024, 3), 0.0);
    }

    #[test]
    fn test_static_and_computed_fields() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, vec![0u8; 2 * 1024 * 1024]).unwrap();

        let record = augment_condensed_metadata(
            &path,
            &CondensedRecord::default(),
            &AugmentOptions::default(),
        );
        assert_eq!(record.get("hierarchy"), Some(&MetaValue::text("2")));
        assert_eq!(record.get("number"), Some(&MetaValue::float(2.0)));
        assert_eq!(record.get("extent_type"), Some(&MetaValue::text("MB")));
        assert_eq!(record.get("type_2"), Some(&MetaValue::text("Item")));
        assert_eq!(
            record.get("n_acqinfo"),
            Some(&MetaValue::text("PhotoShelter https://www.photoshelter.com"))
        );
        assert!(record.contains("title"));
        assert_eq!(record.get("title"), None);
        assert!(!record.contains("dates_label"));
        assert!(!record.contains("p_odd"));
    }

    #[test]
    fn test_missing_file_keeps_extent_type() {
        let tmp = tempdir().unwrap();
        let record = augment_condensed_metadata(
            &tmp.path().join("gone.jpg"),
            &CondensedRecord::default(),
            &AugmentOptions::default(),
        );
        assert!(record.contains("number"));
        assert_eq!(record.get("number"), None);
        assert_eq!(record.get("extent_type"), Some(&MetaValue::text("MB")));
    }

    #[test]
    fn test_conditional_pairs_follow_triggers() {
        let condensed = CondensedRecord {
            begin: Some(MetaValue::text("2021:10:12 18:03:11")),
            people_agent_header_2: Some(MetaValue::text("Alice Bob Carol")),
            n_odd: Some(MetaValue::text("   ")),
            subject_1_term: Some(MetaValue::List(Vec::new())),
            ..CondensedRecord::default()
        };
        let before = condensed.clone();
        let record =
            augment_condensed_metadata(Path::new("missing.jpg"), &condensed, &AugmentOptions::default());

        assert_eq!(condensed, before);
        assert_eq!(record.get("dates_label"), Some(&MetaValue::text("creation")));
        assert_eq!(record.get("date_type"), Some(&MetaValue::text("single")));
        assert_eq!(record.get("people_agent_role_2"), Some(&MetaValue::text("subject")));
        assert_eq!(
            record.get("people_agent_relator_2"),
            Some(&MetaValue::text("associated name"))
        );
        assert!(!record.contains("people_agent_role_1"));
        assert!(!record.contains("p_odd"));
        assert!(!record.contains("subject_1_type"));
    }

    #[test]
    fn test_field_order() {
        let condensed = CondensedRecord {
            n_odd: Some(MetaValue::text("Nashville")),
            begin: Some(MetaValue::text("2021")),
            ..CondensedRecord::default()
        };
        let record =
            augment_condensed_metadata(Path::new("missing.jpg"), &condensed, &AugmentOptions::default());
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(&keys[..7], &crate::condense::CONDENSED_FIELDS[..]);
        assert_eq!(
            &keys[7..],
            &[
                "hierarchy",
                "number",
                "extent_type",
                "restrictions_flag",
                "processing_note",
                "portion",
                "type_2",
                "p_acqinfo",
                "n_acqinfo",
                "dates_label",
                "date_type",
                "p_odd",
                "l_odd",
            ]
        );
    }
}
