use crate::augment::{augment_condensed_metadata, AugmentOptions, AugmentedRecord};
use crate::catalog::{append_records_to_csv, CsvWriteOptions, CsvWriteSummary};
use crate::condense::condense_metadata;
use crate::config::AppConfig;
use crate::error::Error;
use crate::filter::{filter_images_by_rating, FilterOptions};
use crate::metadata::source::{MetadataReader, MetadataSource, ReadScope, ReaderOptions};
use crate::metadata::value::MetadataMap;
use crate::progress::ProgressReporter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct ManifestEngine {
    config: AppConfig,
    source: Option<Box<dyn MetadataSource>>,
}

#[derive(Debug)]
pub struct ManifestResult {
    pub filter_duration: Duration,
    pub metadata_duration: Duration,
    pub csv_write_duration: Duration,
    pub total_files_scanned: usize,
    pub rated_files: usize,
    pub unrated_files: usize,
    pub selected_files: usize,
    pub cutoff_stars: Option<u8>,
    pub rows_written: usize,
    pub output_csv: PathBuf,
    pub csv: CsvWriteSummary,
}

impl ManifestEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    /// Use `source` instead of building a reader from the configuration.
    pub fn with_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full manifest pipeline:
    /// 1. Scan the image directory and keep files at or above the rating cutoff
    /// 2. Read full metadata for the selection in batches
    /// 3. Condense and augment each file into a catalog row
    /// 4. Merge the rows into the template CSV and write the output CSV
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<ManifestResult, Error> {
        let built;
        let source: &dyn MetadataSource = match &self.source {
            Some(source) => source.as_ref(),
            None => {
                built = MetadataReader::new(&ReaderOptions::from(&self.config))?;
                &built
            }
        };
        info!("Reading metadata with {}", source.name());

        // Phase 1: Filter
        let image_dir = Path::new(&self.config.image_directory);
        info!("Selecting images under {}...", image_dir.display());
        let filter_start = Instant::now();
        let filtered =
            filter_images_by_rating(image_dir, &FilterOptions::from(&self.config), source, reporter)?;
        let filter_duration = filter_start.elapsed();
        debug!(
            "Filter completed in {:.2}s, {} of {} files selected",
            filter_duration.as_secs_f64(),
            filtered.stats.selected,
            filtered.stats.total_scanned,
        );

        // Phase 2: Metadata
        info!("Reading metadata for {} files...", filtered.selected.len());
        let metadata_start = Instant::now();
        let records = self.build_records(&filtered.selected, source, reporter)?;
        let metadata_duration = metadata_start.elapsed();
        debug!(
            "Metadata completed in {:.2}s",
            metadata_duration.as_secs_f64()
        );

        // Phase 3: CSV
        let template = Path::new(&self.config.template_csv);
        let output = PathBuf::from(&self.config.output_csv);
        info!("Writing {}...", output.display());
        reporter.on_csv_write_start();
        let csv_start = Instant::now();
        let csv = append_records_to_csv(
            template,
            &output,
            &records,
            &CsvWriteOptions::from(&self.config),
        )?;
        let csv_write_duration = csv_start.elapsed();
        let rows_written = csv.existing_rows + csv.new_rows;
        reporter.on_csv_write_complete(rows_written, csv_write_duration.as_secs_f64());

        Ok(ManifestResult {
            filter_duration,
            metadata_duration,
            csv_write_duration,
            total_files_scanned: filtered.stats.total_scanned,
            rated_files: filtered.stats.rated,
            unrated_files: filtered.stats.unrated,
            selected_files: filtered.stats.selected,
            cutoff_stars: filtered.cutoff_stars,
            rows_written,
            output_csv: output,
            csv,
        })
    }

    /// Read, condense and augment `paths` into catalog rows, in input order.
    pub fn build_records(
        &self,
        paths: &[PathBuf],
        source: &dyn MetadataSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<AugmentedRecord>, Error> {
        let options = AugmentOptions::from(&self.config);
        let batch_size = self.config.exiftool_batch_size.max(1);
        let start = Instant::now();
        reporter.on_metadata_start(paths.len());

        let mut records = Vec::with_capacity(paths.len());
        for batch in paths.chunks(batch_size) {
            let mut maps = source.read_batch(batch, ReadScope::Full)?;
            maps.resize_with(batch.len(), MetadataMap::new);
            for (path, meta) in batch.iter().zip(&maps) {
                records.push(build_record(path, meta, &options));
            }
            reporter.on_metadata_progress(records.len(), paths.len());
        }

        reporter.on_metadata_complete(records.len(), start.elapsed().as_secs_f64());
        Ok(records)
    }
}

/// Condense one file's metadata and add the computed catalog fields.
pub fn build_record(path: &Path, meta: &MetadataMap, options: &AugmentOptions) -> AugmentedRecord {
    augment_condensed_metadata(path, &condense_metadata(meta), options)
}
