//! XMP packet lookup and flattening.
//!
//! A packet is taken from the file's container (JPEG APP1, or a raw scan for the
//! `<x:xmpmeta>` wrapper in TIFF/PNG/raw files) or from a same-named `.xmp` sidecar.
//! Flattening turns every top-level property of each `rdf:Description` into one
//! `XMP:<prefix>.<name>` key, keeping Bag/Seq containers as lists and structs as
//! structures keyed by local name.

use super::jpeg;
use super::value::{MetaValue, MetadataMap};
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

pub const SIDECAR_EXTENSION: &str = "xmp";

const KNOWN_PREFIXES: &[(&str, &str)] = &[
    ("http://purl.org/dc/elements/1.1/", "dc"),
    ("http://ns.adobe.com/xap/1.0/", "xmp"),
    ("http://ns.adobe.com/xap/1.0/mm/", "xmpMM"),
    ("http://ns.adobe.com/xap/1.0/sType/ResourceEvent#", "stEvt"),
    ("http://ns.adobe.com/lightroom/1.0/", "lr"),
    ("http://ns.microsoft.com/photo/1.2/", "MicrosoftPhoto"),
    ("http://ns.adobe.com/camera-raw-settings/1.0/", "crs"),
    ("http://ns.adobe.com/photoshop/1.0/", "photoshop"),
    ("http://ns.adobe.com/exif/1.0/", "exif"),
    ("http://ns.adobe.com/tiff/1.0/", "tiff"),
    ("http://iptc.org/std/Iptc4xmpCore/1.0/xmlns/", "Iptc4xmpCore"),
    ("http://iptc.org/std/Iptc4xmpExt/2008-02-29/", "Iptc4xmpExt"),
    ("http://ns.useplus.org/ldf/xmp/1.0/", "plus"),
];

/// Where a packet was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSource {
    Embedded,
    Sidecar,
}

/// Locate the embedded XMP packet in a file's bytes.
pub fn embedded_packet(bytes: &[u8]) -> Option<&[u8]> {
    if let Some(segments) = jpeg::scan(bytes) {
        if let Some(xmp) = segments.xmp {
            return Some(xmp);
        }
    }
    find_packet(bytes)
}

/// Scan raw bytes for an `<x:xmpmeta>` (or bare `<rdf:RDF>`) element.
pub fn find_packet(bytes: &[u8]) -> Option<&[u8]> {
    for (open, close) in [
        (&b"<x:xmpmeta"[..], &b"</x:xmpmeta>"[..]),
        (&b"<rdf:RDF"[..], &b"</rdf:RDF>"[..]),
    ] {
        if let Some(start) = find_bytes(bytes, open) {
            if let Some(len) = find_bytes(&bytes[start..], close) {
                return Some(&bytes[start..start + len + close.len()]);
            }
        }
    }
    None
}

pub fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension(SIDECAR_EXTENSION)
}

/// Read the packet for `path`, falling back to its sidecar when the file has no
/// embedded packet. Unreadable files and sidecars are treated as absent.
pub fn load_packet(path: &Path, look_for_sidecar: bool) -> Option<(Vec<u8>, PacketSource)> {
    match fs::read(path) {
        Ok(bytes) => {
            if let Some(packet) = embedded_packet(&bytes) {
                return Some((packet.to_vec(), PacketSource::Embedded));
            }
        }
        Err(e) => debug!("Cannot read {}: {}", path.display(), e),
    }

    if look_for_sidecar {
        return read_sidecar(path).map(|packet| (packet, PacketSource::Sidecar));
    }
    None
}

pub fn read_sidecar(path: &Path) -> Option<Vec<u8>> {
    let sidecar = sidecar_path(path);
    if !sidecar.is_file() {
        return None;
    }
    match fs::read(&sidecar) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!("Cannot read sidecar {}: {}", sidecar.display(), e);
            None
        }
    }
}

/// Flatten a packet into `XMP:<prefix>.<property>` keys.
pub fn flatten_packet(packet: &[u8]) -> Result<MetadataMap, roxmltree::Error> {
    let text = String::from_utf8_lossy(packet);
    let text = text
        .trim_start_matches('\u{feff}')
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    let doc = Document::parse(text)?;

    let mut out = MetadataMap::new();
    let Some(rdf) = doc.descendants().find(|n| is_rdf(n, "RDF")) else {
        return Ok(out);
    };

    let mut prefixes = PrefixTable::default();
    for desc in rdf.children().filter(|n| is_rdf(n, "Description")) {
        for attr in desc.attributes() {
            let Some(ns) = attr.namespace() else { continue };
            if ns == RDF_NS || ns == XML_NS {
                continue;
            }
            let key = prefixes.key(desc, ns, attr.name());
            out.insert(key, MetaValue::text(attr.value().trim()));
        }

        for prop in desc.children().filter(Node::is_element) {
            let Some(ns) = prop.tag_name().namespace() else { continue };
            let key = prefixes.key(prop, ns, prop.tag_name().name());

            if let Some(alt) = first_element(prop).filter(|n| is_rdf(n, "Alt")) {
                let entries = alt_entries(alt);
                let default = default_index(&entries);
                for (i, (lang, value)) in entries.into_iter().enumerate() {
                    match (Some(i) == default, lang) {
                        (true, _) => {
                            out.insert(key.clone(), value);
                        }
                        (false, Some(lang)) => {
                            out.insert(format!("{}-{}", key, lang), value);
                        }
                        (false, None) => {}
                    }
                }
                continue;
            }

            if let Some(value) = property_value(prop) {
                out.insert(key, value);
            }
        }
    }

    Ok(out)
}

#[derive(Default)]
struct PrefixTable {
    generated: HashMap<String, String>,
}

impl PrefixTable {
    fn key(&mut self, node: Node, ns: &str, local: &str) -> String {
        format!("XMP:{}.{}", self.prefix(node, ns), local)
    }

    fn prefix(&mut self, node: Node, ns: &str) -> String {
        if let Some((_, p)) = KNOWN_PREFIXES.iter().find(|(uri, _)| *uri == ns) {
            return p.to_string();
        }
        if let Some(p) = node.lookup_prefix(ns).filter(|p| !p.is_empty()) {
            return p.to_string();
        }
        let next = self.generated.len() + 1;
        self.generated
            .entry(ns.to_string())
            .or_insert_with(|| format!("ns{}", next))
            .clone()
    }
}

fn is_rdf(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(RDF_NS)
        && node.tag_name().name() == local
}

fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(Node::is_element)
}

fn property_value(node: Node) -> Option<MetaValue> {
    if let Some(resource) = node.attribute((RDF_NS, "resource")) {
        return Some(MetaValue::text(resource.trim()));
    }
    if node.attribute((RDF_NS, "parseType")) == Some("Resource") {
        return structure_value(node);
    }

    if let Some(child) = first_element(node) {
        if is_rdf(&child, "Bag") || is_rdf(&child, "Seq") {
            let items = child
                .children()
                .filter(|n| is_rdf(n, "li"))
                .filter_map(property_value)
                .collect();
            return Some(MetaValue::List(items));
        }
        if is_rdf(&child, "Alt") {
            let entries = alt_entries(child);
            return default_index(&entries).map(|i| entries[i].1.clone());
        }
        if is_rdf(&child, "Description") {
            return structure_value(child);
        }
        return structure_value(node);
    }

    if qualified_attributes(node).next().is_some() {
        return structure_value(node);
    }

    let text = node.text().unwrap_or("").trim();
    if text.is_empty() {
        None
    } else {
        Some(MetaValue::text(text))
    }
}

fn qualified_attributes<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Attribute<'a, 'input>> {
    node.attributes()
        .filter(|a| matches!(a.namespace(), Some(ns) if ns != RDF_NS && ns != XML_NS))
}

fn structure_value(node: Node) -> Option<MetaValue> {
    let mut fields = BTreeMap::new();
    for attr in qualified_attributes(node) {
        fields.insert(attr.name().to_string(), MetaValue::text(attr.value().trim()));
    }
    for child in node.children().filter(Node::is_element) {
        if let Some(value) = property_value(child) {
            fields.insert(child.tag_name().name().to_string(), value);
        }
    }
    if fields.is_empty() {
        None
    } else {
        Some(MetaValue::Structure(fields))
    }
}

fn alt_entries(alt: Node) -> Vec<(Option<String>, MetaValue)> {
    alt.children()
        .filter(|n| is_rdf(n, "li"))
        .filter_map(|li| {
            let lang = li.attribute((XML_NS, "lang")).map(str::to_string);
            property_value(li).map(|v| (lang, v))
        })
        .collect()
}

fn default_index(entries: &[(Option<String>, MetaValue)]) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }
    Some(
        entries
            .iter()
            .position(|(lang, _)| lang.as_deref() == Some("x-default"))
            .unwrap_or(0),
    )
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
