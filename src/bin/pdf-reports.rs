//! PDF Reports CLI tool
//!
//! Runs the report pipeline steps on JSON payloads and prints JSON results
//! on stdout. Logs go to stderr.

use anyhow::{bail, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Args, Parser, Subcommand};
use glob::glob;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pdf_reports::config::ReportConfig;
use pdf_reports::convert::LibreOffice;
use pdf_reports::model::{Envelope, MultiCompanyRequest, ReportData, StructureRequest};
use pdf_reports::pdf::{extract_metadata, merge_pdfs, MergeOptions};
use pdf_reports::report::ReportBuilder;
use pdf_reports::structure::build_structure;

/// PDF Reports - Build client reports from weekly product metrics
#[derive(Parser)]
#[command(name = "pdf-reports")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Turn weekly records into slide descriptors
    pdf-reports build-structure --input request.json > structure.json

    # Render and merge the report described by a structure
    pdf-reports generate --input structure.json

    # Same, with the payload passed as base64
    pdf-reports generate --payload \"$(base64 -w0 structure.json)\"

    # One report for several companies generated earlier
    pdf-reports generate-multi --input multi.json

    # Use a custom data directory and converter
    pdf-reports --config reports.toml --data-dir ./data generate --input structure.json")]
struct Cli {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for templates, chart definitions and outputs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a JSON payload comes from
#[derive(Args)]
struct PayloadArgs {
    /// JSON payload file, `-` for stdin
    #[arg(short, long, conflicts_with = "payload")]
    input: Option<PathBuf>,

    /// Base64-encoded JSON payload
    #[arg(long)]
    payload: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Group weekly records by product and build the slide structure
    BuildStructure {
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Render the slides of a structure and merge them into PDF reports
    Generate {
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Wrap existing company reports in a shared cover and closing
    GenerateMulti {
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration file
    InitConfig,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::BuildStructure { ref payload } => load_config(&cli).and_then(|config| cmd_build_structure(&config, payload)),
        Commands::Generate { ref payload } => load_config(&cli).and_then(|config| cmd_generate(config, payload)),
        Commands::GenerateMulti { ref payload } => load_config(&cli).and_then(|config| cmd_generate_multi(config, payload)),
        Commands::Merge { ref inputs, ref output } => cmd_merge(inputs.clone(), output.clone()),
        Commands::Info { ref input, json } => cmd_info(input, json),
        Commands::InitConfig => {
            print!("{}", ReportConfig::default_toml());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<ReportConfig> {
    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    debug!("Using data directory {}", config.data_dir.display());
    Ok(config)
}

/// Read the payload text from a file, stdin or the base64 argument
fn read_payload(args: &PayloadArgs) -> anyhow::Result<String> {
    if let Some(encoded) = &args.payload {
        let bytes = STANDARD
            .decode(encoded.trim())
            .context("Payload is not valid base64")?;
        return String::from_utf8(bytes).context("Payload is not UTF-8");
    }

    let mut text = String::new();
    match &args.input {
        Some(path) if path.as_os_str() != "-" => {
            text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        _ => {
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read payload from stdin")?;
        }
    }
    Ok(text)
}

/// Parse a payload, with or without its `{"data": ...}` envelope
fn parse_payload<T: DeserializeOwned>(args: &PayloadArgs) -> anyhow::Result<T> {
    let text = read_payload(args)?;
    let envelope: Envelope<T> = serde_json::from_str(&text).context("Invalid JSON payload")?;
    Ok(envelope.into_inner())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_build_structure(config: &ReportConfig, payload: &PayloadArgs) -> anyhow::Result<()> {
    let request: StructureRequest = parse_payload(payload)?;
    let main = build_structure(request, config).context("Failed to build structure")?;
    print_json(&json!({ "status": "ok", "output_file": main }))
}

fn cmd_generate(config: ReportConfig, payload: &PayloadArgs) -> anyhow::Result<()> {
    let data: ReportData = parse_payload(payload)?;
    let converter = LibreOffice::from_config(&config.converter);
    let builder = ReportBuilder::new(config, converter);

    let reports = builder.generate(&data).context("Failed to generate report")?;
    let file_names: Vec<String> = reports.iter().map(|p| p.display().to_string()).collect();
    print_json(&json!({ "file_names": file_names }))
}

fn cmd_generate_multi(config: ReportConfig, payload: &PayloadArgs) -> anyhow::Result<()> {
    let request: MultiCompanyRequest = parse_payload(payload)?;
    let converter = LibreOffice::from_config(&config.converter);
    let builder = ReportBuilder::new(config, converter);

    let file_name = builder
        .generate_multi(&request)
        .context("Failed to generate multi-company report")?;
    print_json(&json!({ "file_name": file_name }))
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern).with_context(|| format!("Bad glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => warn!("Glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> anyhow::Result<()> {
    let inputs = expand_globs(inputs)?;

    for path in &inputs {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    info!("Merging {} PDF files...", inputs.len());
    let pages = merge_pdfs(&MergeOptions::new(inputs, output.clone()))?;
    info!("Merged to: {} ({} pages)", output.display(), pages);

    Ok(())
}

fn cmd_info(input: &Path, as_json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let metadata = extract_metadata(input)?;
    if as_json {
        return print_json(&serde_json::to_value(&metadata)?);
    }

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    Ok(())
}
