mod commands;
mod logging;
mod progress;

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, SelectionArgs};
use dotenv::dotenv;
use photo_manifest_core::metadata::{ExifTool, ReaderOptions};
use photo_manifest_core::rating::RatingRecord;
use photo_manifest_core::{
    extract_keywords, filter_images_by_rating, read_windows_rating, AppConfig, FilterOptions,
    ManifestEngine, MetadataReader, MetadataSource, ReadScope,
};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let mut config =
        match photo_manifest_core::config::load_configuration_from(args.config.as_deref()) {
            Ok(config) => config,
            Err(err) => {
                error!("Error loading configuration: {}", err);
                process::exit(1);
            }
        };

    let outcome = match args.command {
        Some(Commands::Generate {
            selection,
            template,
            output,
            hierarchy,
        }) => {
            apply_selection(&mut config, &selection);
            if let Some(template) = template {
                config.template_csv = template.to_string_lossy().into_owned();
            }
            if let Some(output) = output {
                config.output_csv = output.to_string_lossy().into_owned();
            }
            if let Some(hierarchy) = hierarchy {
                config.hierarchy = hierarchy;
            }
            run_generate(config)
        }
        Some(Commands::Select { selection }) => {
            apply_selection(&mut config, &selection);
            run_select(&config)
        }
        Some(Commands::Rating {
            file,
            xmp_only,
            no_sidecar,
        }) => {
            if no_sidecar {
                config.look_for_sidecar = false;
            }
            run_rating(&config, &file, xmp_only)
        }
        Some(Commands::Dump { file, json }) => run_dump(&config, &file, json),
        Some(Commands::Keywords { file }) => run_keywords(&config, &file),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            let status = if ExifTool::new(&config.exiftool_path).is_available() {
                "available".green()
            } else {
                "not found".red()
            };
            println!("exiftool ({}): {}", config.exiftool_path, status);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn apply_selection(config: &mut AppConfig, args: &SelectionArgs) {
    if let Some(dir) = &args.dir {
        config.image_directory = dir.to_string_lossy().into_owned();
    }
    if let Some(percentile) = args.percentile {
        config.percentile = percentile;
    }
    if args.exclude_unrated {
        config.include_unrated = false;
    }
    if args.no_recursive {
        config.recursive = false;
    }
    if args.no_exiftool {
        config.prefer_exiftool = false;
        config.require_exiftool = false;
    }
}

fn open_reader(config: &AppConfig) -> Result<MetadataReader> {
    MetadataReader::new(&ReaderOptions::from(config)).context("Cannot set up metadata reader")
}

fn run_generate(config: AppConfig) -> Result<()> {
    let engine = ManifestEngine::new(config);
    let reporter = CliReporter::new();
    let result = engine.run(&reporter)?;

    println!();
    info!(
        "Filter: {}, Metadata: {}, CSV: {}",
        format!("{:.2}s", result.filter_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.metadata_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.csv_write_duration.as_secs_f64()).green(),
    );
    info!(
        "{} scanned, {} rated, {} unrated, {} selected (cutoff {})",
        format!("{}", result.total_files_scanned).cyan(),
        format!("{}", result.rated_files).cyan(),
        format!("{}", result.unrated_files).cyan(),
        format!("{}", result.selected_files).cyan(),
        format_cutoff(result.cutoff_stars).yellow(),
    );
    info!(
        "{} rows ({} new) and {} columns written to {}",
        format!("{}", result.rows_written).green(),
        format!("{}", result.csv.new_rows).green(),
        result.csv.headers.len(),
        result.output_csv.display(),
    );

    Ok(())
}

fn run_select(config: &AppConfig) -> Result<()> {
    let reader = open_reader(config)?;
    let reporter = CliReporter::new();
    let result = filter_images_by_rating(
        Path::new(&config.image_directory),
        &FilterOptions::from(config),
        &reader,
        &reporter,
    )?;

    println!(
        "Cutoff: {}  scanned {}, rated {}, unrated {}, selected {}",
        format_cutoff(result.cutoff_stars).yellow(),
        result.stats.total_scanned,
        result.stats.rated,
        result.stats.unrated,
        format!("{}", result.stats.selected).green(),
    );
    for path in &result.selected {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_rating(config: &AppConfig, file: &Path, xmp_only: bool) -> Result<()> {
    let (record, source) = if xmp_only {
        let rating = read_windows_rating(file, config.look_for_sidecar);
        let source = match rating.source {
            Some(source) => format!("{:?} XMP", source),
            None => "no XMP packet".to_string(),
        };
        (rating.record, source)
    } else {
        let reader = open_reader(config)?;
        let meta = reader.read_one(file, ReadScope::Ratings)?;
        (
            RatingRecord::from_metadata(file.to_path_buf(), &meta),
            reader.name().to_string(),
        )
    };

    let stars = match record.stars {
        Some(stars) => format!("{} stars", stars).yellow(),
        None => "unrated".dimmed(),
    };
    println!("{}: {} ({})", file.display(), stars, source);
    println!(
        "  xmp:Rating={:?} Windows Rating={:?} RatingPercent={:?}",
        record.xmp_rating, record.ms_rating, record.ms_rating_percent
    );
    Ok(())
}

fn run_dump(config: &AppConfig, file: &Path, json: bool) -> Result<()> {
    let reader = open_reader(config)?;
    let meta = reader.read_one(file, ReadScope::Full)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }
    if !reader.uses_exiftool() {
        println!("{}", "exiftool unavailable, showing built-in reader fields".dimmed());
    }
    if meta.is_empty() {
        println!("{}", "No metadata found".dimmed());
    }
    for (key, value) in &meta {
        println!("{}: {}", key.cyan(), value);
    }
    Ok(())
}

fn run_keywords(config: &AppConfig, file: &Path) -> Result<()> {
    let reader = open_reader(config)?;
    let meta = reader.read_one(file, ReadScope::Full)?;
    for keyword in extract_keywords(&meta) {
        println!("{}", keyword);
    }
    Ok(())
}

fn format_cutoff(cutoff: Option<u8>) -> String {
    match cutoff {
        Some(stars) => format!("{} stars", stars),
        None => "none".to_string(),
    }
}
