//! Built-in best-effort metadata scrape, used when exiftool is not available.
//!
//! Gathers basic file facts, JFIF/ICC/comment segments, EXIF (via `kamadak-exif`),
//! IPTC from the Photoshop APP13 block, and the XMP packet (embedded, else sidecar).
//! Every stage is optional: whatever cannot be read is left out of the map.

use super::value::{MetaValue, MetadataMap};
use super::{iptc, jpeg, xmp};
use exif::{Context, In, Tag, Value};
use rayon::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// IFD0 tags written by Windows Explorer that the EXIF tables don't name.
const WINDOWS_TAGS: &[(u16, &str)] = &[
    (0x4746, "Rating"),
    (0x4749, "RatingPercent"),
    (0x9C9B, "XPTitle"),
    (0x9C9C, "XPComment"),
    (0x9C9D, "XPAuthor"),
    (0x9C9E, "XPKeywords"),
    (0x9C9F, "XPSubject"),
];

const MAKER_NOTE: u16 = 0x927C;
const MAX_INLINE_BINARY: usize = 64;

#[derive(Debug, Clone)]
pub struct Scraper {
    look_for_sidecar: bool,
}

impl Scraper {
    pub fn new(look_for_sidecar: bool) -> Self {
        Self { look_for_sidecar }
    }

    pub fn read(&self, path: &Path) -> MetadataMap {
        let mut out = MetadataMap::new();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return out;
            }
        };

        file_facts(path, &bytes, &mut out);

        if let Some(segments) = jpeg::scan(&bytes) {
            jpeg_facts(&segments, &mut out);
            if let Some(block) = segments.photoshop {
                out.extend(iptc::read_photoshop_block(block));
            }
        }

        exif_fields(path, &bytes, &mut out);

        let packet = match xmp::embedded_packet(&bytes) {
            Some(packet) => Some(packet.to_vec()),
            None if self.look_for_sidecar => xmp::read_sidecar(path),
            None => None,
        };
        if let Some(packet) = packet {
            match xmp::flatten_packet(&packet) {
                Ok(map) => out.extend(map),
                Err(e) => debug!("XMP present in {} but parsing failed: {}", path.display(), e),
            }
        }

        out
    }

    /// Scrape files in parallel; results keep the order of `paths`.
    pub fn read_all(&self, paths: &[PathBuf]) -> Vec<MetadataMap> {
        paths.par_iter().map(|p| self.read(p)).collect()
    }
}

fn file_facts(path: &Path, bytes: &[u8], out: &mut MetadataMap) {
    if let Some(name) = path.file_name() {
        out.insert(
            "File:FileName".to_string(),
            MetaValue::text(name.to_string_lossy()),
        );
    }
    out.insert("File:FileSize".to_string(), MetaValue::integer(bytes.len() as i64));
    if let Some(kind) = file_type(path, bytes) {
        out.insert("File:FileType".to_string(), MetaValue::text(kind));
    }
}

fn file_type(path: &Path, bytes: &[u8]) -> Option<String> {
    let kind = if bytes.starts_with(&[0xFF, 0xD8]) {
        "JPEG"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "PNG"
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        "TIFF"
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"heic" | b"heix" | b"mif1") {
        "HEIC"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "WEBP"
    } else {
        return path
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase());
    };
    Some(kind.to_string())
}

fn jpeg_facts(segments: &jpeg::JpegSegments, out: &mut MetadataMap) {
    if let Some(jfif) = &segments.jfif {
        out.insert(
            "JFIF:JFIFVersion".to_string(),
            MetaValue::text(format!("{}.{:02}", jfif.version.0, jfif.version.1)),
        );
        out.insert(
            "JFIF:ResolutionUnit".to_string(),
            MetaValue::integer(jfif.density_unit as i64),
        );
        out.insert("JFIF:XResolution".to_string(), MetaValue::integer(jfif.x_density as i64));
        out.insert("JFIF:YResolution".to_string(), MetaValue::integer(jfif.y_density as i64));
    }
    if segments.icc_profile_len > 0 {
        out.insert(
            "ICC:ProfileLength".to_string(),
            MetaValue::integer(segments.icc_profile_len as i64),
        );
    }
    if let Some((width, height)) = segments.dimensions {
        out.insert("File:ImageWidth".to_string(), MetaValue::integer(width as i64));
        out.insert("File:ImageHeight".to_string(), MetaValue::integer(height as i64));
    }
    let comments: Vec<String> = segments
        .comments
        .iter()
        .map(|c| String::from_utf8_lossy(c).trim_end_matches('\0').to_string())
        .collect();
    match comments.len() {
        0 => {}
        1 => {
            out.insert("File:Comment".to_string(), MetaValue::text(comments[0].clone()));
        }
        _ => {
            out.insert("File:Comment".to_string(), MetaValue::list_of_text(comments));
        }
    }
}

fn exif_fields(path: &Path, bytes: &[u8], out: &mut MetadataMap) {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF in {}: {}", path.display(), e);
            return;
        }
    };

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY || field.tag.number() == MAKER_NOTE {
            continue;
        }
        let group = match field.tag.context() {
            Context::Gps => "GPS",
            Context::Interop => "Interop",
            _ => "EXIF",
        };
        let name = tag_name(field.tag);
        let value = if name.starts_with("XP") {
            windows_text(&field.value)
        } else {
            field_value(field)
        };
        if let Some(value) = value {
            out.insert(format!("{}:{}", group, name), value);
        }
    }
}

fn tag_name(tag: Tag) -> String {
    if tag.context() == Context::Tiff {
        if let Some((_, name)) = WINDOWS_TAGS.iter().find(|(n, _)| *n == tag.number()) {
            return name.to_string();
        }
    }
    if tag.description().is_some() {
        tag.to_string()
    } else {
        format!("Tag0x{:04X}", tag.number())
    }
}

/// XP* fields are UTF-16LE text stored as BYTE arrays.
fn windows_text(value: &Value) -> Option<MetaValue> {
    let bytes = match value {
        Value::Byte(bytes) | Value::Undefined(bytes, _) => bytes,
        _ => return None,
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text: String = char::decode_utf16(units)
        .filter_map(Result::ok)
        .collect();
    let text = text.trim_end_matches('\0');
    if text.is_empty() {
        None
    } else {
        Some(MetaValue::text(text))
    }
}

fn field_value(field: &exif::Field) -> Option<MetaValue> {
    match &field.value {
        Value::Ascii(parts) => {
            let text: Vec<String> = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
                .filter(|p| !p.is_empty())
                .collect();
            Some(MetaValue::text(text.join(" ").trim_end()))
        }
        Value::Short(v) => integers(v.iter().map(|&x| x as i64)),
        Value::Long(v) => integers(v.iter().map(|&x| x as i64)),
        Value::SShort(v) => integers(v.iter().map(|&x| x as i64)),
        Value::SLong(v) => integers(v.iter().map(|&x| x as i64)),
        Value::Byte(v) if v.len() <= MAX_INLINE_BINARY => integers(v.iter().map(|&x| x as i64)),
        Value::Rational(v) => floats(v.iter().map(|r| r.to_f64())),
        Value::SRational(v) => floats(v.iter().map(|r| r.to_f64())),
        Value::Float(v) => floats(v.iter().map(|&x| x as f64)),
        Value::Double(v) => floats(v.iter().copied()),
        Value::Byte(data) | Value::Undefined(data, _) if data.len() > MAX_INLINE_BINARY => Some(
            MetaValue::text(format!("(Binary data {} bytes)", data.len())),
        ),
        _ => Some(MetaValue::text(field.display_value().to_string())),
    }
}

fn integers(values: impl Iterator<Item = i64>) -> Option<MetaValue> {
    let mut values: Vec<i64> = values.collect();
    match values.len() {
        0 => None,
        1 => values.pop().map(MetaValue::integer),
        _ => Some(MetaValue::List(values.into_iter().map(MetaValue::integer).collect())),
    }
}

fn floats(values: impl Iterator<Item = f64>) -> Option<MetaValue> {
    let mut values: Vec<f64> = values.collect();
    match values.len() {
        0 => None,
        1 => values.pop().map(MetaValue::float),
        _ => Some(MetaValue::List(values.into_iter().map(MetaValue::float).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::iptc::tests::{dataset, photoshop_block};
    use crate::metadata::jpeg::tests::{build_jpeg, segment, xmp_segment};
    use crate::metadata::xmp::tests::SAMPLE_PACKET;
    use tempfile::tempdir;

    #[test]
    fn test_scrape_jpeg_segments() {
        let mut app13 = b"Photoshop 3.0\0".to_vec();
        app13.extend(photoshop_block(&dataset(2, 80, "Jane Photographer")));
        let bytes = build_jpeg(&[
            xmp_segment(SAMPLE_PACKET),
            segment(0xED, &app13),
            segment(0xFE, b"hello"),
        ]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("lawn.jpg");
        fs::write(&path, &bytes).unwrap();

        let map = Scraper::new(true).read(&path);
        assert_eq!(map["File:FileName"], MetaValue::text("lawn.jpg"));
        assert_eq!(map["File:FileType"], MetaValue::text("JPEG"));
        assert_eq!(map["File:FileSize"], MetaValue::integer(bytes.len() as i64));
        assert_eq!(map["File:Comment"], MetaValue::text("hello"));
        assert_eq!(map["IPTC:By-line"], MetaValue::text("Jane Photographer"));
        assert_eq!(map["XMP:xmp.Rating"], MetaValue::text("3"));
    }

    #[test]
    fn test_scrape_uses_sidecar_when_no_embedded_packet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.nef");
        fs::write(&path, b"MM\0*not really a tiff").unwrap();
        fs::write(dir.path().join("raw.xmp"), SAMPLE_PACKET).unwrap();

        let with_sidecar = Scraper::new(true).read(&path);
        assert_eq!(with_sidecar["XMP:xmp.Rating"], MetaValue::text("3"));
        assert_eq!(with_sidecar["File:FileType"], MetaValue::text("TIFF"));

        let without_sidecar = Scraper::new(false).read(&path);
        assert!(!without_sidecar.contains_key("XMP:xmp.Rating"));
    }

    #[test]
    fn test_scrape_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let map = Scraper::new(true).read(&dir.path().join("gone.jpg"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_windows_text_decodes_utf16() {
        let bytes: Vec<u8> = "Sunset\0"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(
            windows_text(&Value::Byte(bytes)),
            Some(MetaValue::text("Sunset"))
        );
    }
}
