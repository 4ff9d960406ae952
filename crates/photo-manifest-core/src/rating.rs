//! Star-rating normalization.
//!
//! Ratings show up as a 0..5 value (`xmp:Rating`, the Windows EXIF `Rating` tag) or
//! as a Windows percent (`MicrosoftPhoto:Rating` in XMP, which exiftool calls
//! `XMP-microsoft:RatingPercent`, commonly 1/25/50/75/99). Both are folded into a
//! single 0..5 star count.

use crate::metadata::value::MetadataMap;
use crate::metadata::xmp::{self, PacketSource};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MAX_STARS: u8 = 5;

/// Percent values Windows writes for one through five stars.
const PERCENT_CUTS: [i64; 5] = [1, 25, 50, 75, 99];

const XMP_RATING_KEYS: &[&str] = &["XMP-xmp:Rating", "XMP:Rating", "Rating", "XMP:xmp.Rating"];
const MS_RATING_KEYS: &[&str] = &["IFD0:Rating", "EXIF:Rating"];
/// `MicrosoftPhoto:Rating` holds a percent despite its name.
const MS_PERCENT_KEYS: &[&str] = &[
    "XMP-microsoft:RatingPercent",
    "MicrosoftPhoto:Rating",
    "XMP:MicrosoftPhoto.Rating",
    "MicrosoftPhoto:RatingPercent",
    "XMP:MicrosoftPhoto.RatingPercent",
    "IFD0:RatingPercent",
    "EXIF:RatingPercent",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub path: PathBuf,
    /// 0..=5, or `None` when the file carries no usable rating.
    pub stars: Option<u8>,
    pub xmp_rating: Option<i64>,
    pub ms_rating: Option<i64>,
    pub ms_rating_percent: Option<i64>,
}

impl RatingRecord {
    pub fn unrated(path: PathBuf) -> Self {
        Self {
            path,
            stars: None,
            xmp_rating: None,
            ms_rating: None,
            ms_rating_percent: None,
        }
    }

    pub fn from_metadata(path: PathBuf, meta: &MetadataMap) -> Self {
        let xmp_rating = first_int(meta, XMP_RATING_KEYS);
        let ms_rating = first_int(meta, MS_RATING_KEYS);
        let ms_rating_percent = first_int(meta, MS_PERCENT_KEYS);
        Self {
            path,
            stars: normalize_stars(xmp_rating, ms_rating, ms_rating_percent),
            xmp_rating,
            ms_rating,
            ms_rating_percent,
        }
    }

    /// Rating from a raw XMP packet. A packet that fails to parse yields an
    /// unrated record.
    pub fn from_xmp_packet(path: PathBuf, packet: &[u8]) -> Self {
        match xmp::flatten_packet(packet) {
            Ok(meta) => Self::from_metadata(path, &meta),
            Err(e) => {
                debug!("Malformed XMP for {}: {}", path.display(), e);
                Self::unrated(path)
            }
        }
    }

    pub fn is_rated(&self) -> bool {
        self.stars.is_some()
    }
}

/// Map a Windows rating percent onto 0..5 stars.
///
/// `<= 0` is zero stars and `>= 99` five; anything between goes to the nearest of
/// 1/25/50/75/99, the lower star count winning an exact tie.
pub fn stars_from_percent(percent: i64) -> u8 {
    if percent <= 0 {
        return 0;
    }
    if percent >= 99 {
        return MAX_STARS;
    }
    let mut best = 0;
    for (i, cut) in PERCENT_CUTS.iter().enumerate() {
        if (cut - percent).abs() < (PERCENT_CUTS[best] - percent).abs() {
            best = i;
        }
    }
    best as u8 + 1
}

/// Explicit 0..5 ratings win (XMP first, then Microsoft), clamped into range;
/// otherwise the percent is converted.
pub fn normalize_stars(
    xmp_rating: Option<i64>,
    ms_rating: Option<i64>,
    ms_rating_percent: Option<i64>,
) -> Option<u8> {
    match xmp_rating.or(ms_rating) {
        Some(rating) => Some(rating.clamp(0, MAX_STARS as i64) as u8),
        None => ms_rating_percent.map(stars_from_percent),
    }
}

fn first_int(meta: &MetadataMap, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|k| meta.get(*k))
        .find_map(|v| v.as_int())
}

/// A rating read straight from a file's XMP packet, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsRating {
    pub record: RatingRecord,
    pub source: Option<PacketSource>,
}

/// Read the rating Windows Explorer shows for `path`: the embedded XMP packet,
/// or the `.xmp` sidecar when nothing is embedded and `look_for_sidecar` is set.
pub fn read_windows_rating(path: &Path, look_for_sidecar: bool) -> WindowsRating {
    match xmp::load_packet(path, look_for_sidecar) {
        Some((packet, source)) => WindowsRating {
            record: RatingRecord::from_xmp_packet(path.to_path_buf(), &packet),
            source: Some(source),
        },
        None => WindowsRating {
            record: RatingRecord::unrated(path.to_path_buf()),
            source: None,
        },
    }
}
