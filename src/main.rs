// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evalbank: category and mark based image databank
//!
//! Command line front end for evaluating images and maintaining the databank.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use evalbank::config::AppConfig;
use evalbank::databank::{JsonDatabank, ManifestMode};
use evalbank::nodes::{EvaluatedImage, Mark};
use evalbank::scan::scan_images;
use evalbank::schema::EvaluationSchema;
use evalbank::session::Session;
use evalbank::{EvalBankError, Result};

/// Evalbank CLI - sort images into a category/mark databank
#[derive(Parser, Debug)]
#[command(name = "evalbank")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "0.1.0")]
#[command(about = "Sort evaluated images into a bucketed databank", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List candidate images in a directory
    Scan {
        /// Directory to scan (overrides config)
        dir: Option<PathBuf>,
    },

    /// Assign marks to an image and file it into the databank
    Evaluate {
        /// Image to evaluate
        image: PathBuf,

        /// CATEGORY=MARK pairs
        #[arg(short, long = "mark", value_parser = parse_mark)]
        marks: Vec<(String, Mark)>,

        /// Shrink the image to the configured maximum edge when placing it
        #[arg(long)]
        resize: bool,
    },

    /// Align the databank with the images present on disk
    Reconcile,

    /// Show databank nodes
    Stats,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new databank project
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration and schema files
    Validate,
}

fn parse_mark(raw: &str) -> std::result::Result<(String, Mark), String> {
    let (name, mark) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=MARK, got '{}'", raw))?;
    let mark = mark
        .trim()
        .parse::<Mark>()
        .map_err(|e| format!("bad mark '{}': {}", mark, e))?;
    Ok((name.trim().to_string(), mark))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Scan { dir } => run_scan(&config, dir, &cli.format),
        Commands::Evaluate { image, marks, resize } => run_evaluate(&config, image, marks, resize),
        Commands::Reconcile => run_reconcile(&config),
        Commands::Stats => run_stats(&config, &cli.format),
        Commands::Config { action } => run_config_command(&config, action, &cli.config),
        Commands::Init { dir, force } => run_init(dir, force),
    }
}

fn run_scan(config: &AppConfig, dir: Option<PathBuf>, format: &str) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.input_path.clone());
    let images = scan_images(&dir)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&images)?);
    } else {
        for image in &images {
            println!("{}", image.display());
        }
        println!("\nFound {} images in {:?}", images.len(), dir);
    }
    Ok(())
}

/// Evaluate one image against the full databank
fn run_evaluate(config: &AppConfig, image: PathBuf, marks: Vec<(String, Mark)>, resize: bool) -> Result<()> {
    let schema = EvaluationSchema::load(&config.schema_path)?;
    let databank = JsonDatabank::from_config(&config.databank);
    let mut registry = databank.read(config.output.clone())?;

    let id = match registry.find_by_path(&image) {
        Some(id) => {
            debug!("{:?} is already tracked", image);
            id
        }
        None => {
            if !image.is_file() {
                return Err(EvalBankError::FileSystem(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", image.display()),
                )));
            }
            registry.insert_image(EvaluatedImage::new(image.clone()))
        }
    };

    let priority = schema.prioritized_categories().to_vec();
    for (name, mark) in &marks {
        schema.validate_mark(name, *mark)?;
        let img = registry.image_mut(id);
        if schema.is_category(name) {
            img.add_category(name, &priority);
        }
        img.evaluate(name, *mark);
    }
    if resize {
        registry.image_mut(id).request_resize();
    }

    let node = registry.post(id)?;
    let placed = registry.image(id);
    println!(
        "{} -> {} (node {})",
        image.display(),
        placed.path().display(),
        registry.node(node).name()
    );

    // The registry came from a full read, so manifests are replaced
    databank.save(&registry, ManifestMode::Overwrite)?;
    Ok(())
}

fn run_reconcile(config: &AppConfig) -> Result<()> {
    let schema = EvaluationSchema::load(&config.schema_path)?;
    let databank = JsonDatabank::from_config(&config.databank);
    let registry = databank.read(config.output.clone())?;

    let session = Session::open(config, schema, Some(registry))?;
    let written = session.save_manifest()?;
    println!("Tracking {} images, wrote {} manifests", session.len(), written);
    Ok(())
}

fn run_stats(config: &AppConfig, format: &str) -> Result<()> {
    let databank = JsonDatabank::from_config(&config.databank);
    let registry = databank.read(config.output.clone())?;

    if format == "json" {
        let output: Vec<serde_json::Value> = registry
            .nodes_by_path()
            .flat_map(|(key, siblings)| {
                siblings.iter().map(|id| {
                    let node = registry.node(*id);
                    serde_json::json!({
                        "path": key.to_string(),
                        "node": node.name(),
                        "images": node.len(),
                    })
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Databank {:?}:", databank.root());
    for (key, siblings) in registry.nodes_by_path() {
        println!("  {}", key);
        for id in siblings {
            let node = registry.node(*id);
            println!("    {} ({} images)", node.name(), node.len());
        }
    }
    println!("\n{} nodes, {} images", registry.node_count(), registry.list_images().len());
    Ok(())
}

fn run_config_command(config: &AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            let schema = EvaluationSchema::load(&config.schema_path)?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Input: {:?}", config.input_path);
            println!("  Images: {:?}", config.output.root);
            println!("  Manifests: {:?}", config.databank.root);
            println!("  Categories: {:?}", schema.prioritized_categories());
        }
    }

    Ok(())
}

/// Initialize a new project directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");
    let schema_path = target.join("schema.json");

    if config_path.exists() && !force {
        return Err(EvalBankError::Config(
            "config.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    let config = AppConfig::default();
    std::fs::create_dir_all(target.join(&config.input_path))?;
    config.save(&config_path)?;

    if schema_path.exists() && !force {
        warn!("Keeping existing {:?}", schema_path);
    } else {
        let schema = serde_json::to_string_pretty(&EvaluationSchema::sample())?;
        std::fs::write(&schema_path, schema)?;
    }

    info!("Initialized project in {:?}", target);
    println!("Created:");
    println!("  - config.json");
    println!("  - schema.json");
    println!("  - {}/", config.input_path.display());
    println!("\nNext steps:");
    println!("  1. Put images into {}/", config.input_path.display());
    println!("  2. evalbank evaluate <image> -m Quality=1");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["evalbank", "stats"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_cli_evaluate_command() {
        let cli = Cli::try_parse_from([
            "evalbank", "evaluate", "/tmp/a.jpg", "-m", "Quality=1", "--mark", "Portrait = 2", "--resize",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate { image, marks, resize } => {
                assert_eq!(image, PathBuf::from("/tmp/a.jpg"));
                assert_eq!(marks, vec![("Quality".to_string(), 1), ("Portrait".to_string(), 2)]);
                assert!(resize);
            }
            _ => panic!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_mark() {
        assert!(Cli::try_parse_from(["evalbank", "evaluate", "a.jpg", "-m", "Quality"]).is_err());
        assert!(Cli::try_parse_from(["evalbank", "evaluate", "a.jpg", "-m", "Quality=x"]).is_err());
    }

    #[test]
    fn test_cli_scan_command() {
        let cli = Cli::try_parse_from(["evalbank", "--verbose", "scan", "/tmp/in"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Scan { dir } => assert_eq!(dir, Some(PathBuf::from("/tmp/in"))),
            _ => panic!("Expected Scan command"),
        }
    }
}
