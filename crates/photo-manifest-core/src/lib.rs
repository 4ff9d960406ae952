pub mod augment;
pub mod catalog;
pub mod condense;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod keywords;
pub mod metadata;
pub mod progress;
pub mod rating;
pub mod scanner;

pub use augment::{augment_condensed_metadata, AugmentOptions, AugmentedRecord};
pub use catalog::{append_records_to_csv, CsvWriteOptions, CsvWriteSummary};
pub use condense::{condense_metadata, CondensedRecord};
pub use config::AppConfig;
pub use engine::{ManifestEngine, ManifestResult};
pub use error::Error;
pub use filter::{filter_images_by_rating, FilterOptions, FilterResult, FilterStats};
pub use keywords::extract_keywords;
pub use metadata::{MetaValue, MetadataMap, MetadataReader, MetadataSource, ReadScope};
pub use progress::{ProgressReporter, SilentReporter};
pub use rating::{read_windows_rating, RatingRecord};
