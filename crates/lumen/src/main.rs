//! Lumen CLI - enhance captured photos from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Denoise and sharpen a photo
//! lumen photo.jpg --denoise 40 --sharpness 60
//!
//! # Write to a specific path, bypassing the background worker
//! lumen photo.jpg -o enhanced.jpg --contrast 25 --no-worker
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use lumen_core::{Config, EnhancementOptions, Enhancer};

mod logging;

/// Lumen - photo enhancement pipeline.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Photo to enhance
    input: PathBuf,

    /// Output path (defaults to `<name>.enhanced.<ext>` next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Unsharp mask strength (0-100)
    #[arg(long, default_value_t = 0)]
    sharpness: i32,

    /// Denoise strength (0-100)
    #[arg(long, default_value_t = 0)]
    denoise: i32,

    /// Contrast strength (0-100)
    #[arg(long, default_value_t = 0)]
    contrast: i32,

    /// Run the stages in-process instead of on the background worker
    #[arg(long)]
    no_worker: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go straight to stderr.
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}\n  Using default configuration.");
            Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    if cli.no_worker {
        config.worker.enabled = false;
    }

    let encoded = std::fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let options = EnhancementOptions {
        sharpness: cli.sharpness,
        denoise: cli.denoise,
        contrast: cli.contrast,
    };

    let enhancer = Enhancer::new(&config);
    let enhanced = enhancer.enhance(&encoded, &options).await;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));
    std::fs::write(&output, &enhanced)
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!("wrote {}", output.display());
    Ok(())
}

/// `photo.jpg` becomes `photo.enhanced.jpg`; extensionless input gets a
/// plain `.enhanced` suffix.
fn default_output(input: &Path) -> PathBuf {
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => input.with_extension(format!("enhanced.{ext}")),
        None => input.with_extension("enhanced"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_keeps_extension() {
        assert_eq!(
            default_output(Path::new("/photos/cat.jpg")),
            PathBuf::from("/photos/cat.enhanced.jpg")
        );
    }

    #[test]
    fn test_default_output_without_extension() {
        assert_eq!(
            default_output(Path::new("/photos/cat")),
            PathBuf::from("/photos/cat.enhanced")
        );
    }

    #[test]
    fn test_cli_parses_stage_flags() {
        let cli = Cli::parse_from([
            "lumen",
            "photo.png",
            "--sharpness",
            "60",
            "--denoise",
            "40",
            "--no-worker",
        ]);
        assert_eq!(cli.sharpness, 60);
        assert_eq!(cli.denoise, 40);
        assert_eq!(cli.contrast, 0);
        assert!(cli.no_worker);
    }
}
