//! ExifTool-backed extraction.
//!
//! One process is spawned per batch of files. Output is read with
//! `-j -G:1 -a -u -struct` so keys come back group-prefixed (`EXIF:CreateDate`,
//! `XMP-xmp:Rating`, `IPTC:Keywords`) and structured tags arrive nested.

use super::source::ReadScope;
use super::value::{MetaValue, MetadataMap};
use crate::error::Error;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub const DEFAULT_PROGRAM: &str = "exiftool";
pub const DEFAULT_BATCH_SIZE: usize = 256;
const SOURCE_FILE_KEY: &str = "SourceFile";

/// Tags requested when only ratings are needed.
const RATING_TAGS: &[&str] = &[
    "-XMP-xmp:Rating",
    "-XMP-microsoft:RatingPercent",
    "-IFD0:Rating",
    "-IFD0:RatingPercent",
];

#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    numeric: bool,
    keep_source_file: bool,
    batch_size: usize,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            numeric: true,
            keep_source_file: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// `-n`: raw numeric values instead of print conversions ("1/125").
    pub fn with_numeric(mut self, numeric: bool) -> Self {
        self.numeric = numeric;
        self
    }

    pub fn with_keep_source_file(mut self, keep: bool) -> Self {
        self.keep_source_file = keep;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Version string reported by `exiftool -ver`, or `None` if it can't be run.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("-ver")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn is_available(&self) -> bool {
        self.version().is_some()
    }

    fn args(&self, scope: ReadScope) -> Vec<&'static str> {
        let mut args = vec!["-j"];
        if self.numeric {
            args.push("-n");
        }
        args.push("-G:1");
        match scope {
            ReadScope::Ratings => args.extend_from_slice(RATING_TAGS),
            ReadScope::Full => {
                args.extend_from_slice(&["-a", "-u", "-struct", "-api", "largefilesupport=1"])
            }
        }
        args
    }

    /// Read metadata for `paths`, one map per input path in input order.
    /// Files exiftool skipped come back as empty maps.
    pub fn read(&self, paths: &[PathBuf], scope: ReadScope) -> Result<Vec<MetadataMap>, Error> {
        let mut out = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(self.batch_size) {
            out.extend(self.read_chunk(chunk, scope)?);
        }
        Ok(out)
    }

    fn read_chunk(&self, paths: &[PathBuf], scope: ReadScope) -> Result<Vec<MetadataMap>, Error> {
        debug!(
            "Running {} on {} files ({:?})",
            self.program.display(),
            paths.len(),
            scope
        );
        let output = Command::new(&self.program)
            .args(self.args(scope))
            .args(paths)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    Error::ExifToolMissing(self.program.display().to_string())
                }
                _ => Error::ExifTool(format!(
                    "Failed to execute {}: {}",
                    self.program.display(),
                    e
                )),
            })?;

        // exiftool exits non-zero when any file in the batch fails, but still
        // reports the others.
        if !output.status.success() {
            debug!("exiftool exited with {}", output.status);
        }

        let rows = match parse_output(&output.stdout) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "Unreadable exiftool output for a batch of {} files: {}",
                    paths.len(),
                    e
                );
                Vec::new()
            }
        };
        Ok(match_rows(paths, rows, self.keep_source_file))
    }
}

/// Parse exiftool's `-j` output: a JSON array with one object per file.
pub fn parse_output(stdout: &[u8]) -> Result<Vec<Map<String, Value>>, serde_json::Error> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let rows: Vec<Value> = serde_json::from_slice(stdout)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

/// Line rows up with the input paths via their `SourceFile` key.
pub fn match_rows(
    paths: &[PathBuf],
    rows: Vec<Map<String, Value>>,
    keep_source_file: bool,
) -> Vec<MetadataMap> {
    let index: HashMap<String, usize> = paths
        .iter()
        .enumerate()
        .map(|(i, p)| (normalize_source(&p.to_string_lossy()), i))
        .collect();

    let mut out = vec![MetadataMap::new(); paths.len()];
    for row in rows {
        let Some(source) = row.get(SOURCE_FILE_KEY).and_then(Value::as_str) else {
            debug!("exiftool row without {}", SOURCE_FILE_KEY);
            continue;
        };
        let Some(&i) = index.get(&normalize_source(source)) else {
            debug!("exiftool returned unknown {} '{}'", SOURCE_FILE_KEY, source);
            continue;
        };
        out[i] = row
            .into_iter()
            .filter(|(k, _)| keep_source_file || k != SOURCE_FILE_KEY)
            .filter_map(|(k, v)| MetaValue::from_json(v).map(|v| (k, v)))
            .collect();
    }
    out
}

fn normalize_source(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_empty() {
        assert!(parse_output(b"  \n").unwrap().is_empty());
        assert!(parse_output(b"not json").is_err());
    }

    #[test]
    fn test_match_rows_by_source_file() {
        let paths = vec![
            PathBuf::from("photos/a.jpg"),
            PathBuf::from("photos/b.jpg"),
            PathBuf::from("photos/c.jpg"),
        ];
        let stdout = br#"[
            {"SourceFile": "photos/c.jpg", "XMP-xmp:Rating": 4, "XMP-dc:Subject": ["x", "y"]},
            {"SourceFile": "photos/a.jpg", "IFD0:Artist": "Jane", "XMP-xmp:Label": null}
        ]"#;
        let rows = parse_output(stdout).unwrap();
        let maps = match_rows(&paths, rows, false);

        assert_eq!(maps.len(), 3);
        assert_eq!(maps[0]["IFD0:Artist"], MetaValue::text("Jane"));
        assert!(!maps[0].contains_key("XMP-xmp:Label"));
        assert!(!maps[0].contains_key(SOURCE_FILE_KEY));
        assert!(maps[1].is_empty());
        assert_eq!(maps[2]["XMP-xmp:Rating"], MetaValue::integer(4));
    }

    #[test]
    fn test_match_rows_keeps_source_file_when_asked() {
        let paths = vec![PathBuf::from(r"C:\photos\a.jpg")];
        let rows = parse_output(br#"[{"SourceFile": "C:/photos/a.jpg"}]"#).unwrap();
        let maps = match_rows(&paths, rows, true);
        assert_eq!(maps[0][SOURCE_FILE_KEY], MetaValue::text("C:/photos/a.jpg"));
    }

    #[test]
    fn test_args_for_scope() {
        let tool = ExifTool::new("exiftool").with_numeric(false);
        let full = tool.args(ReadScope::Full);
        assert!(full.contains(&"-struct"));
        assert!(!full.contains(&"-n"));

        let ratings = ExifTool::new("exiftool").args(ReadScope::Ratings);
        assert!(ratings.contains(&"-n"));
        assert!(ratings.contains(&"-XMP-microsoft:RatingPercent"));
        assert!(!ratings.contains(&"-XMP-microsoft:Rating"));
    }

    #[test]
    fn test_missing_program() {
        let tool = ExifTool::new("/nonexistent/exiftool-binary");
        assert!(!tool.is_available());
        let err = tool
            .read(&[PathBuf::from("a.jpg")], ReadScope::Full)
            .unwrap_err();
        assert!(matches!(err, Error::ExifToolMissing(_)));
    }
}
