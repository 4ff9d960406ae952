//! Minimal JPEG marker walk. Collects the metadata-bearing segments up to the
//! start of scan; pixel data is never touched.

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";
const JFIF_HEADER: &[u8] = b"JFIF\0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jfif {
    pub version: (u8, u8),
    pub density_unit: u8,
    pub x_density: u16,
    pub y_density: u16,
}

#[derive(Debug, Default)]
pub struct JpegSegments<'a> {
    pub jfif: Option<Jfif>,
    pub xmp: Option<&'a [u8]>,
    /// Body of the APP13 Photoshop segment, after its header.
    pub photoshop: Option<&'a [u8]>,
    pub comments: Vec<&'a [u8]>,
    pub icc_profile_len: usize,
    /// (width, height) from the first SOF marker.
    pub dimensions: Option<(u16, u16)>,
}

/// Returns `None` when `bytes` is not a JPEG stream.
pub fn scan(bytes: &[u8]) -> Option<JpegSegments<'_>> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut segments = JpegSegments::default();
    let mut pos = 2;

    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        // Fill bytes
        while pos + 1 < bytes.len() && bytes[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= bytes.len() {
            break;
        }
        let marker = bytes[pos + 1];
        pos += 2;

        match marker {
            0xD9 | 0xDA => break,
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }

        if pos + 2 > bytes.len() {
            break;
        }
        let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        if len < 2 || pos + len > bytes.len() {
            break;
        }
        let body = &bytes[pos + 2..pos + len];
        pos += len;

        match marker {
            0xE0 if body.starts_with(JFIF_HEADER) && body.len() >= 12 => {
                segments.jfif = Some(Jfif {
                    version: (body[5], body[6]),
                    density_unit: body[7],
                    x_density: u16::from_be_bytes([body[8], body[9]]),
                    y_density: u16::from_be_bytes([body[10], body[11]]),
                });
            }
            0xE1 if body.starts_with(XMP_HEADER) && segments.xmp.is_none() => {
                segments.xmp = Some(&body[XMP_HEADER.len()..]);
            }
            0xE2 if body.starts_with(ICC_HEADER) => {
                // Chunk sequence number and count precede the profile data.
                segments.icc_profile_len += body.len().saturating_sub(ICC_HEADER.len() + 2);
            }
            0xED if body.starts_with(PHOTOSHOP_HEADER) => {
                segments.photoshop = Some(&body[PHOTOSHOP_HEADER.len()..]);
            }
            0xFE => segments.comments.push(body),
            0xC0..=0xCF if marker != 0xC4 && marker != 0xC8 && marker != 0xCC => {
                if segments.dimensions.is_none() && body.len() >= 5 {
                    let height = u16::from_be_bytes([body[1], body[2]]);
                    let width = u16::from_be_bytes([body[3], body[4]]);
                    segments.dimensions = Some((width, height));
                }
            }
            _ => {}
        }
    }

    Some(segments)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn segment(marker: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    /// A marker-only JPEG with the given segments; enough for metadata readers.
    pub(crate) fn build_jpeg(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        for s in segments {
            out.extend_from_slice(s);
        }
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    pub(crate) fn xmp_segment(packet: &str) -> Vec<u8> {
        let mut body = XMP_HEADER.to_vec();
        body.extend_from_slice(packet.as_bytes());
        segment(0xE1, &body)
    }

    #[test]
    fn test_scan_rejects_non_jpeg() {
        assert!(scan(b"\x89PNG\r\n\x1a\n").is_none());
    }

    #[test]
    fn test_scan_collects_segments() {
        let jfif = segment(0xE0, b"JFIF\0\x01\x02\x01\x00\x48\x00\x48\x00\x00");
        let comment = segment(0xFE, b"shot on film");
        let sof = segment(0xC0, &[8, 0x01, 0xE0, 0x02, 0x80, 3]);
        let bytes = build_jpeg(&[jfif, xmp_segment("<x:xmpmeta/>"), comment, sof]);

        let segments = scan(&bytes).unwrap();
        let jfif = segments.jfif.unwrap();
        assert_eq!(jfif.version, (1, 2));
        assert_eq!(jfif.x_density, 72);
        assert_eq!(segments.xmp, Some(&b"<x:xmpmeta/>"[..]));
        assert_eq!(segments.comments, vec![&b"shot on film"[..]]);
        assert_eq!(segments.dimensions, Some((640, 480)));
    }

    #[test]
    fn test_scan_stops_on_truncated_segment() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x40];
        bytes.extend_from_slice(b"short");
        let segments = scan(&bytes).unwrap();
        assert!(segments.xmp.is_none());
    }
}
