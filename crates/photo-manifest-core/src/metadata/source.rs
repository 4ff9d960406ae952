use super::exiftool::{self, ExifTool};
use super::scraper::Scraper;
use super::value::MetadataMap;
use crate::config::AppConfig;
use crate::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How much metadata a read should gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Only the rating fields.
    Ratings,
    /// The maximal mapping.
    Full,
}

/// Anything that can turn a batch of files into metadata maps.
///
/// Implementations return exactly one map per input path, in input order. A file
/// that cannot be read yields an empty map rather than an error; `Err` is kept
/// for failures that affect the whole batch.
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;

    fn read_batch(&self, paths: &[PathBuf], scope: ReadScope) -> Result<Vec<MetadataMap>, Error>;

    fn read_one(&self, path: &Path, scope: ReadScope) -> Result<MetadataMap, Error> {
        let mut maps = self.read_batch(&[path.to_path_buf()], scope)?;
        Ok(maps.pop().unwrap_or_default())
    }
}

impl MetadataSource for ExifTool {
    fn name(&self) -> &str {
        "exiftool"
    }

    fn read_batch(&self, paths: &[PathBuf], scope: ReadScope) -> Result<Vec<MetadataMap>, Error> {
        self.read(paths, scope)
    }
}

impl MetadataSource for Scraper {
    fn name(&self) -> &str {
        "scraper"
    }

    fn read_batch(&self, paths: &[PathBuf], _scope: ReadScope) -> Result<Vec<MetadataMap>, Error> {
        Ok(self.read_all(paths))
    }
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub prefer_exiftool: bool,
    pub require_exiftool: bool,
    pub exiftool_path: String,
    pub exiftool_batch_size: usize,
    pub numeric: bool,
    pub keep_source_file: bool,
    pub look_for_sidecar: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            prefer_exiftool: true,
            require_exiftool: false,
            exiftool_path: exiftool::DEFAULT_PROGRAM.to_string(),
            exiftool_batch_size: exiftool::DEFAULT_BATCH_SIZE,
            numeric: true,
            keep_source_file: false,
            look_for_sidecar: true,
        }
    }
}

impl From<&AppConfig> for ReaderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            prefer_exiftool: config.prefer_exiftool,
            require_exiftool: config.require_exiftool,
            exiftool_path: config.exiftool_path.clone(),
            exiftool_batch_size: config.exiftool_batch_size,
            numeric: config.numeric,
            keep_source_file: config.keep_source_file,
            look_for_sidecar: config.look_for_sidecar,
        }
    }
}

/// The metadata reader used by the pipeline: exiftool when it's installed,
/// the built-in scraper otherwise.
pub struct MetadataReader {
    exiftool: Option<ExifTool>,
    scraper: Scraper,
}

impl MetadataReader {
    pub fn new(options: &ReaderOptions) -> Result<Self, Error> {
        let scraper = Scraper::new(options.look_for_sidecar);

        if !options.prefer_exiftool && !options.require_exiftool {
            info!("Using built-in metadata scraper");
            return Ok(Self::scraper_only(options.look_for_sidecar));
        }

        let tool = ExifTool::new(&options.exiftool_path)
            .with_numeric(options.numeric)
            .with_keep_source_file(options.keep_source_file)
            .with_batch_size(options.exiftool_batch_size);

        match tool.version() {
            Some(version) => {
                info!("Using exiftool {} ({})", version, tool.program().display());
                Ok(Self {
                    exiftool: Some(tool),
                    scraper,
                })
            }
            None if options.require_exiftool => {
                Err(Error::ExifToolMissing(options.exiftool_path.clone()))
            }
            None => {
                warn!(
                    "{} not found in PATH; falling back to built-in metadata scraper",
                    options.exiftool_path
                );
                Ok(Self {
                    exiftool: None,
                    scraper,
                })
            }
        }
    }

    pub fn scraper_only(look_for_sidecar: bool) -> Self {
        Self {
            exiftool: None,
            scraper: Scraper::new(look_for_sidecar),
        }
    }

    pub fn uses_exiftool(&self) -> bool {
        self.exiftool.is_some()
    }
}

impl MetadataSource for MetadataReader {
    fn name(&self) -> &str {
        match &self.exiftool {
            Some(tool) => tool.name(),
            None => self.scraper.name(),
        }
    }

    fn read_batch(&self, paths: &[PathBuf], scope: ReadScope) -> Result<Vec<MetadataMap>, Error> {
        match &self.exiftool {
            Some(tool) => tool.read_batch(paths, scope),
            None => self.scraper.read_batch(paths, scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_exiftool_missing_is_fatal() {
        let options = ReaderOptions {
            require_exiftool: true,
            exiftool_path: "/nonexistent/exiftool-binary".to_string(),
            ..ReaderOptions::default()
        };
        assert!(matches!(
            MetadataReader::new(&options),
            Err(Error::ExifToolMissing(_))
        ));
    }

    #[test]
    fn test_missing_exiftool_falls_back() {
        let options = ReaderOptions {
            exiftool_path: "/nonexistent/exiftool-binary".to_string(),
            ..ReaderOptions::default()
        };
        let reader = MetadataReader::new(&options).unwrap();
        assert!(!reader.uses_exiftool());
        assert_eq!(reader.name(), "scraper");
    }

    #[test]
    fn test_read_one_on_missing_file() {
        let reader = MetadataReader::scraper_only(false);
        let map = reader
            .read_one(Path::new("/nonexistent/photo.jpg"), ReadScope::Full)
            .unwrap();
        assert!(map.is_empty());
    }
}
