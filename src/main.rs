//! bXporter CLI
//!
//! Command-line interface for exporting scene snapshots to `.bx`/`.bxon`
//! and inspecting exported files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use bxporter_export::logging::{init_with_config, TracingConfig};
use bxporter_export::{bx, bxon, ExportFormat, ExportOptions, Exporter};
use bxporter_scene::Scene;

/// bXporter - scene graph exporter for .bx and .bxon files
#[derive(Parser)]
#[command(name = "bxporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene snapshot
    Export(ExportArgs),

    /// Decode an exported file and print its contents
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene snapshot (JSON)
    input: PathBuf,

    /// Output file; the extension picks the format unless --target is set
    #[arg(short, long)]
    output: PathBuf,

    /// Output file format: bx or bxon
    #[arg(long)]
    target: Option<String>,

    /// Fail on animation curves driving unsupported properties
    #[arg(long)]
    strict_channels: bool,

    /// Do not write animation tracks
    #[arg(long)]
    no_animation: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Exported .bx or .bxon file
    path: PathBuf,

    /// Print every record instead of a summary
    #[arg(short, long)]
    detailed: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::for_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Inspect(args) => cmd_inspect(args, cli.format),
    }
}

fn resolve_format(args: &ExportArgs) -> Result<ExportFormat> {
    if let Some(target) = &args.target {
        return ExportFormat::from_extension(target)
            .with_context(|| format!("Unknown target format: {}", target));
    }

    let ext = args.output.extension().and_then(|e| e.to_str()).unwrap_or("");
    ExportFormat::from_extension(ext).with_context(|| {
        format!(
            "Cannot infer format from {:?}; use --target bx or --target bxon",
            args.output
        )
    })
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let target = resolve_format(&args)?;

    if args.output.exists() && !args.overwrite {
        bail!("Output exists: {:?} (use --overwrite)", args.output);
    }

    info!("Loading scene: {:?}", args.input);
    let scene = Scene::from_path(&args.input).context("Failed to load scene snapshot")?;
    debug!(objects = scene.objects.len(), "Scene loaded");

    let options = ExportOptions {
        format: target,
        skip_unknown_channels: !args.strict_channels,
        export_animation: !args.no_animation,
        ..Default::default()
    };
    let exporter = Exporter::new(options);

    // Encode fully before touching the output path
    let mut buffer = Vec::new();
    let summary = exporter.export(&scene, &mut buffer).context("Export failed")?;
    fs::write(&args.output, &buffer)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            let counts = summary.counts;
            println!("Exported {:?} ({})", args.output, summary.format);
            println!("  Textures:   {:>6}", counts.textures);
            println!("  Materials:  {:>6}", counts.materials);
            println!("  Meshes:     {:>6}", counts.meshes);
            println!("  Cameras:    {:>6}", counts.cameras);
            println!("  Armatures:  {:>6}", counts.armatures);
            println!("  Curves:     {:>6}", counts.curves);
            println!("  Lamps:      {:>6}", counts.lamps);
            println!("  Objects:    {:>6}", counts.objects);
            println!("  Size:       {:>6}", format_size(summary.bytes as u64));
        }
    }

    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let path = &args.path;

    if !path.exists() {
        bail!("File not found: {:?}", path);
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    match ExportFormat::from_extension(&ext) {
        Some(ExportFormat::Bx) => show_bx(path, &bytes, args.detailed, format),
        Some(ExportFormat::Bxon) => show_bxon(path, &bytes, args.detailed, format),
        None => bail!("Unknown file type: {:?}", path),
    }
}

fn show_bx(path: &Path, bytes: &[u8], detailed: bool, format: OutputFormat) -> Result<()> {
    let doc = bx::decode(bytes).context("Failed to decode .bx file")?;

    match format {
        OutputFormat::Json => {
            if detailed {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                let json = serde_json::json!({
                    "type": "BX",
                    "path": path,
                    "version": doc.version,
                    "size": bytes.len(),
                    "counts": doc.counts,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        OutputFormat::Text => {
            println!("BX file: {:?}", path);
            println!("  Version:    {}", doc.version);
            println!("  Size:       {}", format_size(bytes.len() as u64));

            print_names("Textures", doc.textures.iter().map(|t| t.name.as_str()), detailed);
            print_names("Materials", doc.materials.iter().map(|m| m.name.as_str()), detailed);
            print_names("Meshes", doc.meshes.iter().map(|m| m.name.as_str()), detailed);
            print_names("Cameras", doc.cameras.iter().map(|c| c.name.as_str()), detailed);
            print_names("Armatures", doc.armatures.iter().map(|a| a.name.as_str()), detailed);
            print_names("Curves", doc.curves.iter().map(|c| c.name.as_str()), detailed);
            print_names("Lamps", doc.lamps.iter().map(|l| l.name.as_str()), detailed);
            print_names("Objects", doc.objects.iter().map(|o| o.name.as_str()), detailed);
        }
    }

    Ok(())
}

fn show_bxon(path: &Path, bytes: &[u8], detailed: bool, format: OutputFormat) -> Result<()> {
    let root = bxon::decode(bytes).context("Failed to decode .bxon file")?;
    let map = root.as_map().context("Root node is not a map")?;

    match format {
        OutputFormat::Json => {
            if detailed {
                println!("{}", serde_json::to_string_pretty(&root.to_json())?);
            } else {
                let counts: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(key, node)| {
                        let count = node.as_map().map_or(0, |m| m.len());
                        (key.to_string(), serde_json::Value::from(count))
                    })
                    .collect();
                let json = serde_json::json!({
                    "type": "BXON",
                    "path": path,
                    "size": bytes.len(),
                    "counts": counts,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        OutputFormat::Text => {
            println!("BXON file: {:?}", path);
            println!("  Size:       {}", format_size(bytes.len() as u64));
            for (key, node) in map.iter() {
                let names = node.as_map().map(|m| m.keys().collect::<Vec<_>>()).unwrap_or_default();
                print_names(key, names.into_iter(), detailed);
            }
        }
    }

    Ok(())
}

fn print_names<'a>(label: &str, names: impl Iterator<Item = &'a str>, detailed: bool) {
    let names: Vec<&str> = names.collect();
    println!("  {:<11} {}", format!("{}:", label), names.len());
    if detailed {
        for name in names {
            println!("    - {}", name);
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
