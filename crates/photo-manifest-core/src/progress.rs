/// Trait for reporting manifest progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_ratings_start(&self, _total_files: usize) {}
    fn on_ratings_complete(&self, _rated: usize, _unrated: usize, _duration_secs: f64) {}
    fn on_metadata_start(&self, _total_files: usize) {}
    fn on_metadata_progress(&self, _files_read: usize, _total_files: usize) {}
    fn on_metadata_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_csv_write_start(&self) {}
    fn on_csv_write_complete(&self, _rows: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
