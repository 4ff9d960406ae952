//! Merge augmented records into a CSV catalog by column name.

use crate::augment::AugmentedRecord;
use crate::config::AppConfig;
use crate::error::Error;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    /// Append columns for record keys the existing header lacks.
    pub add_missing_columns: bool,
    /// Copy the input's rows ahead of the new ones.
    pub keep_existing_rows: bool,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            add_missing_columns: true,
            keep_existing_rows: true,
        }
    }
}

impl From<&AppConfig> for CsvWriteOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            add_missing_columns: config.add_missing_columns,
            keep_existing_rows: config.keep_existing_rows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvWriteSummary {
    pub headers: Vec<String>,
    pub existing_rows: usize,
    pub new_rows: usize,
}

struct ExistingCsv {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Read `input` (if it exists and is non-empty), merge `records` into it by
/// column name, and write the result to `output` as UTF-8 with a BOM.
/// `input` and `output` may be the same file.
pub fn append_records_to_csv(
    input: &Path,
    output: &Path,
    records: &[AugmentedRecord],
    options: &CsvWriteOptions,
) -> Result<CsvWriteSummary, Error> {
    let existing = read_existing_csv(input)?;
    let headers = merge_headers(&existing.headers, records, options.add_missing_columns);
    debug!(
        "{} columns ({} from {})",
        headers.len(),
        existing.headers.len(),
        input.display()
    );

    let existing_rows: Vec<Vec<String>> = if options.keep_existing_rows {
        existing
            .rows
            .into_iter()
            .map(|row| pad_row(&existing.headers, row, &headers))
            .collect()
    } else {
        Vec::new()
    };
    let new_rows: Vec<Vec<String>> = records.iter().map(|r| record_row(r, &headers)).collect();

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = BufWriter::new(File::create(output)?);
    file.write_all(UTF8_BOM)?;
    if headers.is_empty() {
        // csv writes `""` for an empty record; an empty header is a bare line.
        file.write_all(b"\r\n")?;
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);
    if !headers.is_empty() {
        writer.write_record(&headers)?;
    }
    for row in existing_rows.iter().chain(new_rows.iter()) {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(
        "Wrote {} rows ({} existing, {} new) to {}",
        existing_rows.len() + new_rows.len(),
        existing_rows.len(),
        new_rows.len(),
        output.display()
    );

    Ok(CsvWriteSummary {
        headers,
        existing_rows: existing_rows.len(),
        new_rows: new_rows.len(),
    })
}

fn read_existing_csv(path: &Path) -> Result<ExistingCsv, Error> {
    let mut existing = ExistingCsv {
        headers: Vec::new(),
        rows: Vec::new(),
    };
    if !path.is_file() {
        return Ok(existing);
    }

    let raw = fs::read(path)?;
    let bytes = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw[..]);
    if bytes.is_empty() {
        return Ok(existing);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.byte_records();
    match records.next() {
        Some(header) => existing.headers = decode_record(&header?),
        None => return Ok(existing),
    }
    for record in records {
        existing.rows.push(decode_record(&record?));
    }
    Ok(existing)
}

fn decode_record(record: &csv::ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Existing headers in order, then record keys in first-seen order. Record keys
/// are always used when there is no existing header.
fn merge_headers(
    existing: &[String],
    records: &[AugmentedRecord],
    add_missing_columns: bool,
) -> Vec<String> {
    let mut headers = existing.to_vec();
    if add_missing_columns || headers.is_empty() {
        let mut seen: HashSet<String> = headers.iter().cloned().collect();
        for key in records.iter().flat_map(AugmentedRecord::keys) {
            if seen.insert(key.to_string()) {
                headers.push(key.to_string());
            }
        }
    }
    headers
}

/// Map a row read under `old_headers` onto `headers`. Missing cells are empty;
/// cells past the end of the old header are dropped.
fn pad_row(old_headers: &[String], row: Vec<String>, headers: &[String]) -> Vec<String> {
    let mut by_name: HashMap<&str, String> = HashMap::new();
    for (name, cell) in old_headers.iter().zip(row) {
        by_name.entry(name.as_str()).or_insert(cell);
    }
    headers
        .iter()
        .map(|h| by_name.remove(h.as_str()).unwrap_or_default())
        .collect()
}

fn record_row(record: &AugmentedRecord, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| record.get(h).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_pad_row_reorders_and_fills() {
        let old = headers(&["b", "a"]);
        let row = vec!["2".to_string(), "1".to_string(), "extra".to_string()];
        assert_eq!(
            pad_row(&old, row, &headers(&["a", "b", "c"])),
            vec!["1", "2", ""]
        );
        assert_eq!(
            pad_row(&old, vec!["only".to_string()], &headers(&["a", "b"])),
            vec!["", "only"]
        );
    }

    #[test]
    fn test_merge_headers_without_new_columns() {
        let existing = headers(&["title", "custom"]);
        assert_eq!(merge_headers(&existing, &[], false), existing);
        assert!(merge_headers(&[], &[], false).is_empty());
    }
}
