use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use layoutstream_core::processor::default_output_dir;
use layoutstream_core::{
    DocumentProcessor, LayoutConfig, LayoutSource, ManifestSource, MissingBitmapPolicy,
    NoisePolicy,
};

#[derive(Parser)]
#[command(name = "layoutstream")]
#[command(about = "Rebuild PDF page content with figure and table crops from a layout manifest")]
struct Args {
    /// Path to the layout manifest (JSON) produced by the PDF front end
    #[arg(short, long)]
    manifest: Option<String>,

    /// Output directory (default: <manifest dir>/<document stem>)
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Clustering radius in page units
    #[arg(long, alias = "cluster-margin")]
    eps: Option<f64>,

    /// Minimum fragments within the radius to seed a figure
    #[arg(long)]
    min_samples: Option<usize>,

    /// Vertical distance within which elements share a reading row
    #[arg(long)]
    y_tolerance: Option<f64>,

    /// Noise fragment handling: singleton or merged
    #[arg(long)]
    noise_policy: Option<String>,

    /// Keep text when a page raster is missing instead of failing
    #[arg(long)]
    text_only_on_missing_bitmap: bool,

    /// Also write summary.json next to the content file
    #[arg(long)]
    summary: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose || args.profile {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    println!("🦀 Layoutstream Page Reconstruction");

    let mut config = LayoutConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    if let Err(e) = apply_overrides(&mut config, &args) {
        eprintln!("❌ Invalid arguments: {e}");
        std::process::exit(1);
    }
    log::debug!("effective config: {:?}", config);

    if args.show_config {
        println!("\n📋 Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match run(&args, config) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("❌ Processing failed: {e:#}");
            std::process::exit(1);
        }
    }
}

fn apply_overrides(config: &mut LayoutConfig, args: &Args) -> Result<()> {
    if let Some(eps) = args.eps {
        config.clustering.eps = eps;
    }
    if let Some(min_samples) = args.min_samples {
        config.clustering.min_samples = min_samples;
    }
    if let Some(y_tolerance) = args.y_tolerance {
        config.reading_order.y_tolerance = y_tolerance;
    }
    if let Some(policy) = &args.noise_policy {
        config.clustering.noise_policy = match policy.as_str() {
            "singleton" => NoisePolicy::Singleton,
            "merged" => NoisePolicy::Merged,
            other => anyhow::bail!("unknown noise policy '{other}' (expected singleton or merged)"),
        };
    }
    if args.text_only_on_missing_bitmap {
        config.missing_bitmap = MissingBitmapPolicy::TextOnly;
    }
    if args.summary {
        config.output.write_summary = true;
    }
    config.validate()?;
    Ok(())
}

fn run(args: &Args, config: LayoutConfig) -> Result<()> {
    let Some(manifest) = args.manifest.as_deref() else {
        anyhow::bail!("no manifest given (use --manifest <path>)");
    };
    let manifest_path = Path::new(manifest);
    if !manifest_path.exists() {
        anyhow::bail!("manifest not found at: {}", manifest);
    }

    let source = ManifestSource::from_file(manifest_path)
        .with_context(|| format!("failed to read manifest {}", manifest))?;

    let output_dir = args
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_dir(manifest_path, source.name()));

    println!("📄 Processing: {} ({} pages)", source.name(), source.page_count());

    let processor = DocumentProcessor::new(config)?;
    let summary = processor
        .process_document(&source, &output_dir, args.profile)
        .with_context(|| format!("failed to process {}", source.name()))?;

    println!("✅ Successfully processed document");
    println!("📊 Page metrics:");
    println!("   - Pages: {}", summary.pages);
    println!("   - Text blocks: {}", summary.totals.text_blocks);
    println!(
        "   - Figures: {} (from {} fragments)",
        summary.totals.figures, summary.totals.fragments
    );
    println!("   - Tables: {}", summary.totals.tables);
    println!("   - Images written: {}", summary.totals.images_written);
    if summary.totals.regions_skipped > 0 {
        println!("⚠️  Regions skipped: {}", summary.totals.regions_skipped);
    }
    println!("💾 Content saved to: {}", summary.content_file.display());
    println!("🖼️  Images saved to: {}", summary.images_dir.display());

    Ok(())
}
