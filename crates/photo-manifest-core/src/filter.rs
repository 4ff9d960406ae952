//! Rating-percentile selection over a folder of photos.

use crate::config::{AppConfig, DEFAULT_EXTENSIONS};
use crate::error::Error;
use crate::metadata::source::{MetadataSource, ReadScope};
use crate::progress::ProgressReporter;
use crate::rating::RatingRecord;
use crate::scanner;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Target percentile in [0, 1]; 0.5 is the median, 0.8 keeps roughly the top fifth.
    pub percentile: f64,
    pub include_unrated: bool,
    pub recursive: bool,
    /// Empty means the default photo extension set.
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            percentile: 0.5,
            include_unrated: true,
            recursive: true,
            extensions: Vec::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl From<&AppConfig> for FilterOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            percentile: config.percentile,
            include_unrated: config.include_unrated,
            recursive: config.recursive,
            extensions: config.extensions.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total_scanned: usize,
    pub rated: usize,
    pub unrated: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    /// Files meeting the cutoff (plus unrated files when requested), sorted by
    /// lowercase path.
    pub selected: Vec<PathBuf>,
    /// `None` when no file in the folder is rated.
    pub cutoff_stars: Option<u8>,
    pub rated: Vec<RatingRecord>,
    pub unrated: Vec<RatingRecord>,
    pub stats: FilterStats,
}

/// Nearest-rank percentile: the element at 1-indexed rank `ceil(q * n)` of the
/// sorted values, rank clamped to at least 1. `q` is clamped into [0, 1].
pub fn percentile_nearest_rank(values: &[u8], q: f64) -> Option<u8> {
    if values.is_empty() {
        return None;
    }
    let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let rank = ((q * n as f64).ceil() as usize).clamp(1, n);
    Some(sorted[rank - 1])
}

/// Read one rating record per file. Files the source could not read are unrated.
pub fn read_ratings(
    source: &dyn MetadataSource,
    files: &[PathBuf],
) -> Result<Vec<RatingRecord>, Error> {
    let maps = source.read_batch(files, ReadScope::Ratings)?;
    Ok(files
        .iter()
        .enumerate()
        .map(|(i, path)| match maps.get(i) {
            Some(meta) => RatingRecord::from_metadata(path.clone(), meta),
            None => RatingRecord::unrated(path.clone()),
        })
        .collect())
}

/// Scan `folder`, read ratings, and keep every rated file at or above the
/// percentile cutoff, plus unrated files when `include_unrated` is set.
pub fn filter_images_by_rating(
    folder: &Path,
    options: &FilterOptions,
    source: &dyn MetadataSource,
    reporter: &dyn ProgressReporter,
) -> Result<FilterResult, Error> {
    let extensions: Vec<String> = if options.extensions.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    } else {
        options.extensions.clone()
    };

    reporter.on_scan_start();
    let scan_start = Instant::now();
    let files = scanner::collect_files(
        folder,
        options.recursive,
        &extensions,
        &options.ignore_patterns,
    )?;
    reporter.on_scan_complete(files.len(), scan_start.elapsed().as_secs_f64());
    info!("{} candidate files under {}", files.len(), folder.display());

    if files.is_empty() {
        return Ok(FilterResult::default());
    }

    reporter.on_ratings_start(files.len());
    let ratings_start = Instant::now();
    let records = read_ratings(source, &files)?;

    let (mut rated, mut unrated): (Vec<RatingRecord>, Vec<RatingRecord>) =
        records.into_iter().partition(RatingRecord::is_rated);
    sort_records(&mut rated);
    sort_records(&mut unrated);
    reporter.on_ratings_complete(
        rated.len(),
        unrated.len(),
        ratings_start.elapsed().as_secs_f64(),
    );

    let stars: Vec<u8> = rated.iter().filter_map(|r| r.stars).collect();
    let cutoff = percentile_nearest_rank(&stars, options.percentile);
    debug!(
        "Percentile {} over {} rated files gives cutoff {:?}",
        options.percentile,
        stars.len(),
        cutoff
    );

    let mut selected: Vec<PathBuf> = Vec::new();
    if let Some(cutoff) = cutoff {
        selected.extend(
            rated
                .iter()
                .filter(|r| r.stars.map_or(false, |s| s >= cutoff))
                .map(|r| r.path.clone()),
        );
    }
    if options.include_unrated {
        selected.extend(unrated.iter().map(|r| r.path.clone()));
    }

    let mut seen = HashSet::new();
    selected.retain(|p| seen.insert(p.clone()));
    sort_paths(&mut selected);

    let stats = FilterStats {
        total_scanned: files.len(),
        rated: rated.len(),
        unrated: unrated.len(),
        selected: selected.len(),
    };
    info!(
        "Cutoff {:?} stars: {} rated, {} unrated, {} selected",
        cutoff, stats.rated, stats.unrated, stats.selected
    );

    Ok(FilterResult {
        selected,
        cutoff_stars: cutoff,
        rated,
        unrated,
        stats,
    })
}

fn sort_key(path: &Path) -> (String, String) {
    let raw = path.to_string_lossy().into_owned();
    (raw.to_lowercase(), raw)
}

fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| sort_key(p));
}

fn sort_records(records: &mut [RatingRecord]) {
    records.sort_by_cached_key(|r| sort_key(&r.path));
}
