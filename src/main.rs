mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use mediadex::index::IndexWriter;
use mediadex::scanner::Scanner;
use mediadex_av::{FfmpegFrameSource, FfprobeProber, ToolRegistry};
use mediadex_core::ScanConfig;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediadex=trace,mediadex_av=trace,mediadex_core=debug".to_string()
        } else {
            "mediadex=info,mediadex_av=info,mediadex_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Scan {
            root,
            output,
            width,
            frames,
            workers,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let result = rt.block_on(run_scan(
                cli.config.as_deref(),
                root,
                output,
                width,
                frames,
                workers,
            ));
            if let Err(e) = result {
                tracing::error!("Scan failed: {e}");
                std::process::exit(e.exit_code());
            }
            Ok(())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Version => {
            println!("mediadex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_scan(
    config_path: Option<&std::path::Path>,
    root: Option<PathBuf>,
    output: Option<PathBuf>,
    width: Option<u32>,
    frames: Option<u32>,
    workers: Option<usize>,
) -> mediadex_core::Result<()> {
    let mut config = ScanConfig::load_or_default(config_path);

    // CLI flags override config fields.
    if let Some(root) = root {
        config.source_volume = root;
    }
    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(width) = width {
        config.thumbnail_width = width;
    }
    if let Some(frames) = frames {
        config.video_frame_count = frames;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }

    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }

    // Fail fast when the external tools are absent; video/audio support
    // cannot degrade silently to per-file spawn errors.
    let registry = ToolRegistry::discover(&config.tools);
    registry.require_all()?;
    let ffprobe = registry.require("ffprobe")?.path.clone();
    let ffmpeg = registry.require("ffmpeg")?.path.clone();

    tracing::info!(
        "Scanning {} into {} ({} workers, {}px thumbnails, {} frames per video)",
        config.source_volume.display(),
        config.output_dir.display(),
        config.effective_workers(),
        config.thumbnail_width,
        config.video_frame_count
    );

    // A single Ctrl-C requests a clean stop: in-flight files finish, no
    // index is written, existing assets stay intact.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping scan");
            signal_token.cancel();
        }
    });

    let source_volume = config.source_volume.to_string_lossy().to_string();
    let output_dir = config.output_dir.clone();

    let scanner = Scanner::new(
        config,
        Arc::new(FfprobeProber::new(ffprobe)),
        Arc::new(FfmpegFrameSource::new(ffmpeg)),
        cancel,
    );

    let outcome = scanner.scan().await?;
    let summary = outcome.summary;

    let writer = IndexWriter::new(output_dir);
    let document = writer.write(outcome.records, &source_volume)?;

    println!("Scan complete: {}", writer.index_path().display());
    println!("  Catalogued: {}", summary.catalogued);
    println!("    - Images: {}", document.metadata.stats.images);
    println!("    - Videos: {}", document.metadata.stats.videos);
    println!("    - Audio:  {}", document.metadata.stats.audio);
    if summary.degraded > 0 {
        println!("  Degraded (partial metadata or thumbnails): {}", summary.degraded);
    }
    if summary.skipped > 0 {
        println!("  Skipped (unreadable or corrupt): {}", summary.skipped);
    }
    println!("  Unsupported files ignored: {}", summary.unsupported);

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = ScanConfig::load_or_default(config_path);
    let registry = ToolRegistry::discover(&config.tools);

    println!("Checking external tools...\n");

    let mut all_ok = true;
    for tool in registry.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable scanning.");
    }

    Ok(())
}
