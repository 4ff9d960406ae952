use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "photo-manifest")]
#[command(about = "Build a catalog CSV from the best-rated photos in a folder", long_about = None)]
pub struct Cli {
    /// Configuration file to load instead of ./Config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Select photos by rating and write their metadata to the output CSV
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,
        /// CSV whose columns and rows the output starts from
        #[arg(long)]
        template: Option<PathBuf>,
        /// CSV to write
        #[arg(long)]
        output: Option<PathBuf>,
        /// Value of the hierarchy column
        #[arg(long)]
        hierarchy: Option<String>,
    },
    /// Print the rating cutoff and the files that meet it
    Select {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Print the star rating of one file
    Rating {
        file: PathBuf,
        /// Read only the XMP packet (embedded or sidecar), as Windows does
        #[arg(long)]
        xmp_only: bool,
        /// Ignore .xmp sidecar files
        #[arg(long)]
        no_sidecar: bool,
    },
    /// Print every metadata field of one file
    Dump {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the merged keyword list of one file
    Keywords { file: PathBuf },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Folder to scan
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Rating percentile in [0, 1] used as the cutoff
    #[arg(long)]
    pub percentile: Option<f64>,
    /// Leave out files without a rating
    #[arg(long)]
    pub exclude_unrated: bool,
    /// Only scan the top level of the folder
    #[arg(long)]
    pub no_recursive: bool,
    /// Use the built-in reader even when exiftool is installed
    #[arg(long)]
    pub no_exiftool: bool,
}
