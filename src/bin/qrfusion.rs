use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use qr_fusion::tools::{dataset_iter, load_frame};
use qr_fusion::{Analyzer, AnalyzerConfig, BatchRunner};

#[derive(Parser)]
#[command(name = "qrfusion", version, about = "Multi-detector QR fusion and quality analysis")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "QR_FUSION_CONFIG")]
    config: Option<PathBuf>,
    /// Override the fusion strategy (voting, weighted, union, intersection)
    #[arg(long, global = true)]
    strategy: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one image and print its records as JSON
    Analyze {
        #[arg(long)]
        image: PathBuf,
    },
    /// Analyze a directory or a list of images and write a JSON report
    Batch {
        /// Directory scanned recursively for images
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        root: Option<PathBuf>,
        /// Individual image paths (repeatable)
        #[arg(long)]
        image: Vec<PathBuf>,
        /// Process at most this many images (after sorting)
        #[arg(long)]
        limit: Option<usize>,
        /// Worker threads (default: available parallelism)
        #[arg(long)]
        workers: Option<usize>,
        /// Report destination
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Configuration errors end the run before any image is touched
    let analyzer = build_analyzer(cli.config.as_deref(), cli.strategy.as_deref())?;

    match cli.command {
        Command::Analyze { image } => analyze_cmd(&analyzer, &image),
        Command::Batch {
            root,
            image,
            limit,
            workers,
            output,
        } => batch_cmd(analyzer, root, image, limit, workers, &output),
    }
}

fn build_analyzer(config: Option<&Path>, strategy: Option<&str>) -> Result<Analyzer> {
    let mut cfg = AnalyzerConfig::load(config).context("invalid configuration")?;
    if let Some(strategy) = strategy {
        cfg.set_strategy(strategy)?;
    }
    info!(
        "detectors: {}; fusion: {} (min_votes {})",
        cfg.enabled_detectors.join(", "),
        cfg.fusion.strategy,
        cfg.fusion.min_votes
    );
    Ok(Analyzer::from_config(cfg)?)
}

fn analyze_cmd(analyzer: &Analyzer, image: &Path) -> Result<()> {
    let frame = load_frame(image)?;
    let records = analyzer.analyze(&frame);
    info!(
        "{} ({}x{}): {} QR regions",
        image.display(),
        frame.width(),
        frame.height(),
        records.len()
    );
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn batch_cmd(
    analyzer: Analyzer,
    root: Option<PathBuf>,
    images: Vec<PathBuf>,
    limit: Option<usize>,
    workers: Option<usize>,
    output: &Path,
) -> Result<()> {
    let mut paths: Vec<PathBuf> = match root {
        Some(root) => dataset_iter(&root, limit).collect(),
        None => images,
    };
    if let Some(limit) = limit {
        paths.truncate(limit);
    }
    if paths.is_empty() {
        bail!("no images to analyze");
    }

    let runner = BatchRunner::new(analyzer, workers)?;
    let cancel = runner.cancel_flag();
    ctrlc::set_handler(move || {
        warn!("interrupt received; finishing in-flight images");
        cancel.cancel();
    })
    .context("failed to install Ctrl-C handler")?;

    let report = runner.run(&paths);
    report
        .save_json(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let summary = &report.summary;
    info!(
        "{} images processed, {} failed, {} QR codes ({:.2} per image); report written to {}",
        summary.images_processed,
        summary.images_failed,
        summary.total_qr_codes,
        summary.average_qr_per_image,
        output.display()
    );
    if report.cancelled {
        warn!("report is partial: the batch was cancelled");
    }
    Ok(())
}
