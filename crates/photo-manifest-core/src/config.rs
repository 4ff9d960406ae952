use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "png", "heic", "cr2", "nef", "arw", "dng",
];

const ENV_PREFIX: &str = "PHOTO_MANIFEST";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub image_directory: String,
    pub template_csv: String,
    pub output_csv: String,

    /// Nearest-rank percentile in [0, 1] used as the star cutoff.
    pub percentile: f64,
    pub include_unrated: bool,
    pub recursive: bool,
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,

    pub hierarchy: String,
    /// Bytes per kilobyte when computing the MB size: 1024 or 1000.
    pub mb_base: u32,
    pub round_digits: u32,

    pub prefer_exiftool: bool,
    pub require_exiftool: bool,
    pub exiftool_path: String,
    pub exiftool_batch_size: usize,
    pub numeric: bool,
    pub keep_source_file: bool,
    pub look_for_sidecar: bool,

    pub add_missing_columns: bool,
    pub keep_existing_rows: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_directory: "photos".to_string(),
            template_csv: "template.csv".to_string(),
            output_csv: "output.csv".to_string(),
            percentile: 0.5,
            include_unrated: true,
            recursive: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_patterns: Vec::new(),
            hierarchy: "2".to_string(),
            mb_base: 1024,
            round_digits: 3,
            prefer_exiftool: true,
            require_exiftool: false,
            exiftool_path: "exiftool".to_string(),
            exiftool_batch_size: 256,
            numeric: true,
            keep_source_file: false,
            look_for_sidecar: true,
            add_missing_columns: true,
            keep_existing_rows: true,
        }
    }
}

/// Load `Config.toml` from the working directory if present, overlaid with
/// `PHOTO_MANIFEST_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from(None)
}

/// Like [`load_configuration`], but reads the given file (which must exist)
/// instead of `Config.toml`.
pub fn load_configuration_from(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
