//! IPTC-IIM records from a Photoshop image resource block (APP13).

use super::value::{MetaValue, MetadataMap};

const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;
const TAG_MARKER: u8 = 0x1C;

/// Dataset names for the application record (2) that downstream lookups use.
const DATASET_NAMES: &[(u8, &str)] = &[
    (5, "ObjectName"),
    (25, "Keywords"),
    (55, "DateCreated"),
    (60, "TimeCreated"),
    (80, "By-line"),
    (85, "By-lineTitle"),
    (90, "City"),
    (92, "Sub-location"),
    (95, "Province-State"),
    (101, "Country-PrimaryLocationName"),
    (105, "Headline"),
    (110, "Credit"),
    (115, "Source"),
    (116, "CopyrightNotice"),
    (120, "Caption-Abstract"),
    (122, "Writer-Editor"),
];

/// Find the IPTC-NAA resource inside a Photoshop resource block.
pub fn iptc_resource(block: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 12 <= block.len() {
        if &block[pos..pos + 4] != RESOURCE_SIGNATURE {
            return None;
        }
        let id = u16::from_be_bytes([block[pos + 4], block[pos + 5]]);
        pos += 6;

        // Pascal name, padded to an even length including the length byte.
        let name_len = block[pos] as usize;
        let mut name_total = 1 + name_len;
        if name_total % 2 == 1 {
            name_total += 1;
        }
        pos += name_total;
        if pos + 4 > block.len() {
            return None;
        }

        let size = u32::from_be_bytes([block[pos], block[pos + 1], block[pos + 2], block[pos + 3]])
            as usize;
        pos += 4;
        if pos + size > block.len() {
            return None;
        }
        if id == IPTC_RESOURCE_ID {
            return Some(&block[pos..pos + size]);
        }
        pos += size + (size % 2);
    }
    None
}

/// Parse IIM datasets into `(record, dataset, data)` triples, in file order.
pub fn parse_datasets(data: &[u8]) -> Vec<(u8, u8, &[u8])> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 5 <= data.len() {
        if data[pos] != TAG_MARKER {
            break;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
        pos += 5;
        // Extended datasets (high bit set) carry a length-of-length; not used for text fields.
        if len & 0x8000 != 0 {
            break;
        }
        let len = len as usize;
        if pos + len > data.len() {
            break;
        }
        out.push((record, dataset, &data[pos..pos + len]));
        pos += len;
    }
    out
}

/// Decode the datasets of a Photoshop block into `IPTC:*` keys. Repeated
/// datasets become lists.
pub fn read_photoshop_block(block: &[u8]) -> MetadataMap {
    let mut out = MetadataMap::new();
    let Some(resource) = iptc_resource(block) else {
        return out;
    };

    for (record, dataset, raw) in parse_datasets(resource) {
        // Record version fields are binary.
        if dataset == 0 {
            continue;
        }
        let key = match DATASET_NAMES.iter().find(|(ds, _)| record == 2 && *ds == dataset) {
            Some((_, name)) => format!("IPTC:{}", name),
            None => format!("IPTC:{},{}", record, dataset),
        };
        let value = MetaValue::text(String::from_utf8_lossy(raw).trim_end_matches('\0'));

        match out.remove(&key) {
            None => {
                out.insert(key, value);
            }
            Some(MetaValue::List(mut items)) => {
                items.push(value);
                out.insert(key, MetaValue::List(items));
            }
            Some(previous) => {
                out.insert(key, MetaValue::List(vec![previous, value]));
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn dataset(record: u8, ds: u8, text: &str) -> Vec<u8> {
        let mut out = vec![TAG_MARKER, record, ds];
        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
        out
    }

    pub(crate) fn photoshop_block(iim: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        // An unrelated resource first, with an odd-sized payload.
        out.extend_from_slice(RESOURCE_SIGNATURE);
        out.extend_from_slice(&0x03EDu16.to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&3u32.to_be_bytes());
        out.extend_from_slice(&[1, 2, 3, 0]);

        out.extend_from_slice(RESOURCE_SIGNATURE);
        out.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(iim.len() as u32).to_be_bytes());
        out.extend_from_slice(iim);
        if iim.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_read_photoshop_block() {
        let mut iim = dataset(2, 0, "\0\x04");
        iim.extend(dataset(2, 80, "Jane Photographer"));
        iim.extend(dataset(2, 25, "campus"));
        iim.extend(dataset(2, 25, "spring"));
        iim.extend(dataset(2, 200, "custom"));

        let map = read_photoshop_block(&photoshop_block(&iim));
        assert_eq!(map["IPTC:By-line"], MetaValue::text("Jane Photographer"));
        assert_eq!(map["IPTC:Keywords"], MetaValue::list_of_text(["campus", "spring"]));
        assert_eq!(map["IPTC:2,200"], MetaValue::text("custom"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_garbage_block_is_empty() {
        assert!(read_photoshop_block(b"not a resource block at all").is_empty());
    }
}
