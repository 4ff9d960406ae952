use std::fs;
use std::path::Path;
use tempfile::tempdir;

use photo_manifest_core::condense::CondensedRecord;
use photo_manifest_core::{
    append_records_to_csv, augment_condensed_metadata, AugmentOptions, AugmentedRecord,
    CsvWriteOptions, MetaValue,
};

fn record(title: &str, begin: Option<&str>) -> AugmentedRecord {
    let condensed = CondensedRecord {
        title: Some(MetaValue::text(title)),
        begin: begin.map(MetaValue::text),
        people_agent_header_2: Some(MetaValue::list_of_text(["Alice", "Bob"])),
        ..CondensedRecord::default()
    };
    augment_condensed_metadata(Path::new("missing.jpg"), &condensed, &AugmentOptions::default())
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "output must start with a BOM");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(&bytes[3..]);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn test_headers_inferred_without_template() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out.csv");

    let summary = append_records_to_csv(
        &tmp.path().join("missing.csv"),
        &output,
        &[record("Sunset", Some("2021:10:12 18:03:11")), record("Lawn", None)],
        &CsvWriteOptions::default(),
    )
    .unwrap();

    assert_eq!(summary.existing_rows, 0);
    assert_eq!(summary.new_rows, 2);
    assert_eq!(summary.headers[0], "title");
    assert!(summary.headers.contains(&"dates_label".to_string()));

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], summary.headers);
    let col = |name: &str| summary.headers.iter().position(|h| h == name).unwrap();
    assert_eq!(rows[1][col("title")], "Sunset");
    assert_eq!(rows[1][col("people_agent_header_2")], "Alice; Bob");
    assert_eq!(rows[1][col("dates_label")], "creation");
    assert_eq!(rows[2][col("dates_label")], "");
    assert_eq!(rows[2][col("number")], "");
    assert_eq!(rows[2][col("extent_type")], "MB");

    let raw = fs::read(&output).unwrap();
    assert!(raw.windows(2).any(|w| w == b"\r\n"));
}

#[test]
fn test_template_columns_and_rows_are_kept() {
    let tmp = tempdir().unwrap();
    let template = tmp.path().join("template.csv");
    fs::write(
        &template,
        b"\xEF\xBB\xBFcollection,title\r\nArchive 1,Old photo\r\nshort\r\n",
    )
    .unwrap();
    let output = tmp.path().join("nested").join("out.csv");

    let summary = append_records_to_csv(
        &template,
        &output,
        &[record("New photo", None)],
        &CsvWriteOptions::default(),
    )
    .unwrap();

    assert_eq!(&summary.headers[..2], &["collection", "title"]);
    assert_eq!(summary.existing_rows, 2);
    assert_eq!(summary.new_rows, 1);

    let rows = read_rows(&output);
    let width = summary.headers.len();
    assert!(rows.iter().all(|r| r.len() == width));
    assert_eq!(&rows[1][..2], &["Archive 1", "Old photo"]);
    assert_eq!(&rows[2][..2], &["short", ""]);
    assert_eq!(&rows[3][..2], &["", "New photo"]);
}

#[test]
fn test_rerun_keeps_column_order() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out.csv");
    let options = CsvWriteOptions::default();

    let first = append_records_to_csv(
        &tmp.path().join("none.csv"),
        &output,
        &[record("One", None)],
        &options,
    )
    .unwrap();
    let second = append_records_to_csv(
        &output,
        &output,
        &[record("Two", Some("2020:01:01 00:00:00"))],
        &options,
    )
    .unwrap();

    assert_eq!(&second.headers[..first.headers.len()], &first.headers[..]);
    assert_eq!(second.existing_rows, 1);
    assert_eq!(second.new_rows, 1);

    let third = append_records_to_csv(&output, &output, &[record("Three", None)], &options).unwrap();
    assert_eq!(third.headers, second.headers);

    let rows = read_rows(&output);
    let title = third.headers.iter().position(|h| h == "title").unwrap();
    let titles: Vec<&str> = rows[1..].iter().map(|r| r[title].as_str()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
}

#[test]
fn test_scalar_values_round_trip() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out.csv");
    let tricky = "Quad, \"north\" side\nsecond line";

    append_records_to_csv(
        &tmp.path().join("none.csv"),
        &output,
        &[record(tricky, Some("2019:05:04 12:00:00"))],
        &CsvWriteOptions::default(),
    )
    .unwrap();

    let rows = read_rows(&output);
    let title = rows[0].iter().position(|h| h == "title").unwrap();
    let begin = rows[0].iter().position(|h| h == "begin").unwrap();
    assert_eq!(rows[1][title], tricky);
    assert_eq!(rows[1][begin], "2019:05:04 12:00:00");
}

#[test]
fn test_without_missing_columns_or_existing_rows() {
    let tmp = tempdir().unwrap();
    let template = tmp.path().join("template.csv");
    fs::write(&template, "title,notes\nOld,keep me\n").unwrap();
    let output = tmp.path().join("out.csv");

    let summary = append_records_to_csv(
        &template,
        &output,
        &[record("Fresh", Some("2021:01:01 00:00:00"))],
        &CsvWriteOptions {
            add_missing_columns: false,
            keep_existing_rows: false,
        },
    )
    .unwrap();

    assert_eq!(summary.headers, vec!["title", "notes"]);
    assert_eq!(summary.existing_rows, 0);
    let rows = read_rows(&output);
    assert_eq!(rows, vec![vec!["title", "notes"], vec!["Fresh", ""]]);
}

#[test]
fn test_no_columns_writes_empty_header_line() {
    let tmp = tempdir().unwrap();
    let output = tmp.path().join("out.csv");

    let summary = append_records_to_csv(
        &tmp.path().join("none.csv"),
        &output,
        &[],
        &CsvWriteOptions::default(),
    )
    .unwrap();

    assert!(summary.headers.is_empty());
    assert_eq!(summary.new_rows, 0);
    assert_eq!(fs::read(&output).unwrap(), b"\xEF\xBB\xBF\r\n");

    let rerun = append_records_to_csv(&output, &output, &[], &CsvWriteOptions::default()).unwrap();
    assert!(rerun.headers.is_empty());
    assert_eq!(rerun.existing_rows, 0);
}
