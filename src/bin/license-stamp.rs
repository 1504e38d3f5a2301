//! License Stamp CLI tool
//!
//! A command-line tool for stamping PDFs with a license footer and QR code.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use license_stamp::config::StampConfig;
use license_stamp::date::resolve_license_date_today;
use license_stamp::pdf::{extract_metadata_from_path, qr, stamp_file, FooterPosition, StampOptions};
use license_stamp::Error;

/// License Stamp - Stamp PDFs with a license footer and QR code
#[derive(Parser)]
#[command(name = "license-stamp")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Stamp a score for a choir order
    license-stamp stamp score.pdf -o score-licensed.pdf --customer \"Jane Smith\" \\
        --organization \"Limerick Cathedral Choir\" --order CAIL-1234 --quantity 35

    # Diagonal watermark on every PDF in a folder
    license-stamp stamp \"parts/*.pdf\" -o licensed/ --customer \"Jane Smith\" \\
        --order CAIL-1234 --quantity 35 --position diagonal

    # Export the license QR code
    license-stamp qr --license-id test-license-123 --order CAIL-1234 --quantity 35 -o qr.png

ENVIRONMENT:
    FOOTER_OPACITY   Footer opacity in (0, 1] (default 0.6)
    DIAGONAL_ANGLE   Watermark angle in degrees (default 35)")]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp one or more PDF files
    Stamp {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file, or output directory when stamping several files
        #[arg(short, long)]
        output: PathBuf,

        /// Licensee name
        #[arg(long)]
        customer: String,

        /// Licensee organization
        #[arg(long)]
        organization: Option<String>,

        /// Order number
        #[arg(long)]
        order: String,

        /// Number of copies the license allows
        #[arg(long)]
        quantity: u32,

        /// License identifier (a random UUID when omitted)
        #[arg(long)]
        license_id: Option<String>,

        /// License date: "today", "yesterday", "2024-01-15" or "01/15/2024"
        #[arg(long)]
        date: Option<String>,

        /// Footer layout: bottom or diagonal
        #[arg(long, default_value = "bottom")]
        position: FooterPosition,

        /// Footer opacity (overrides FOOTER_OPACITY)
        #[arg(long)]
        opacity: Option<f32>,

        /// Watermark angle in degrees (overrides DIAGONAL_ANGLE)
        #[arg(long)]
        angle: Option<f32>,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Write the license QR code as a PNG image
    Qr {
        /// License identifier
        #[arg(long)]
        license_id: String,

        /// Order number
        #[arg(long)]
        order: String,

        /// Number of copies the license allows
        #[arg(long)]
        quantity: u32,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = StampConfig::from_env()
        .context("Failed to read stamp configuration")
        .and_then(|config| run(cli.command, config));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose {
        "license_stamp=debug,info"
    } else {
        "license_stamp=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn run(command: Commands, config: StampConfig) -> Result<()> {
    match command {
        Commands::Stamp {
            inputs, output, customer, organization, order, quantity,
            license_id, date, position, opacity, angle, open,
        } => {
            let config = apply_overrides(config, opacity, angle)?;
            let options = StampOptions {
                customer_name: customer,
                organization: organization.filter(|o| !o.trim().is_empty()),
                order_number: order,
                licensed_quantity: quantity,
                license_id: license_id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                date_iso: resolve_license_date_today(date.as_deref())?,
                footer_position: position,
            };
            options.validate()?;
            cmd_stamp(inputs, output, &options, &config, open)
        }
        Commands::Qr { license_id, order, quantity, output } => {
            cmd_qr(&license_id, &order, quantity, &output)
        }
        Commands::Info { input } => cmd_info(&input),
    }
}

fn apply_overrides(config: StampConfig, opacity: Option<f32>, angle: Option<f32>) -> Result<StampConfig> {
    let config = match opacity {
        Some(value) => config.with_opacity(value)?,
        None => config,
    };
    let config = match angle {
        Some(value) => config.with_angle(value)?,
        None => config,
    };
    Ok(config)
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))?;
            let mut matched = false;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => tracing::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                return Err(Error::NoFilesMatched(pattern).into());
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

/// Output paths for `inputs` when stamping into a directory
///
/// Inputs sharing a file stem get `-2`, `-3`, ... so no output is overwritten.
fn stamped_targets(inputs: &[PathBuf], dir: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut used = HashSet::new();

    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());

            let mut name = format!("{}-stamped.pdf", stem);
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}-stamped-{}.pdf", stem, n);
                n += 1;
            }
            (input.clone(), dir.join(name))
        })
        .collect()
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Stamp every input with the same license
fn cmd_stamp(
    inputs: Vec<String>,
    output: PathBuf,
    options: &StampOptions,
    config: &StampConfig,
    open: bool,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    // Validate inputs exist
    for path in &inputs {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    let targets: Vec<(PathBuf, PathBuf)> = if inputs.len() == 1 && !output.is_dir() {
        vec![(inputs[0].clone(), output.clone())]
    } else {
        std::fs::create_dir_all(&output)
            .with_context(|| format!("Failed to create output directory {}", output.display()))?;
        stamped_targets(&inputs, &output)
    };

    eprintln!(
        "Stamping {} PDF file(s) with license {} ({} layout)...",
        targets.len(),
        options.license_id,
        options.footer_position
    );

    for (input, target) in &targets {
        stamp_file(input, target, options, config)
            .with_context(|| format!("Failed to stamp {}", input.display()))?;
        eprintln!("Output: {}", target.display());
    }

    if open {
        if let Some((_, first)) = targets.first() {
            open_file(first)?;
        }
    }

    Ok(())
}

/// Write the license QR code as a PNG
fn cmd_qr(license_id: &str, order: &str, quantity: u32, output: &Path) -> Result<()> {
    let image = qr::encode(license_id, order, quantity)?;
    image.save_png(output)?;

    eprintln!("Payload: {}", qr::qr_payload(license_id, order, quantity));
    eprintln!("Output: {}", output.display());

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    let metadata = extract_metadata_from_path(input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
