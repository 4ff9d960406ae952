pub mod exiftool;
pub mod iptc;
pub mod jpeg;
pub mod scraper;
pub mod source;
pub mod value;
pub mod xmp;

pub use exiftool::ExifTool;
pub use scraper::Scraper;
pub use source::{MetadataReader, MetadataSource, ReadScope, ReaderOptions};
pub use value::{MetaValue, MetadataMap, Scalar};
