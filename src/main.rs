mod config;
mod errors;
pub mod queue;
mod temp_file;
mod utils;
mod video;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;

use crate::{
    config::Config,
    errors::EncodeResult,
    queue::EncodeQueue,
    utils::ensure_dir,
    video::{Encoder, TokioRunner},
};

/// Transcode videos to `<name>.HEVC.mp4` and extract a thumbnail for each result
#[derive(Parser, Debug)]
#[command(name = "video-encoder", version)]
struct Cli {
    /// Video files to encode; each input is deleted after a successful encode
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();
    log::info!("Starting video encoder...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = ensure_dir(&config.download_dir).await {
        log::error!("Cannot use {}: {}", config.download_dir.display(), e);
        std::process::exit(1);
    }

    let inputs = cli.inputs;
    let encoder = Arc::new(Encoder::new(TokioRunner, &config));
    let queue = EncodeQueue::new(encoder, config.max_concurrent_encodes);
    log::info!("Encode queue initialized");

    let mut handles = Vec::with_capacity(inputs.len());
    for input in &inputs {
        match queue.submit(input).await {
            Ok(handle) => {
                if let Some(status) = queue.status(&handle.id).await {
                    log::info!("{}: job {} {:?}", input.display(), handle.id, status);
                }
                handles.push((input, handle));
            }
            Err(e) => log::error!("Could not queue {}: {}", input.display(), e),
        }
    }

    log::info!("{} jobs waiting", queue.pending_count());

    let mut failed = handles.len() < inputs.len();
    for (input, handle) in handles {
        match handle.wait().await {
            Ok(Some(output)) => {
                if let Err(e) = describe(queue.encoder(), &output, &config.download_dir).await {
                    log::error!("Could not read back {}: {}", output.display(), e);
                }
            }
            Ok(None) => log::info!("{} left as is", input.display()),
            Err(e) => {
                log::error!("{}: {}", input.display(), e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

/// Collect what a reply needs: duration, resolution and a thumbnail from the middle
async fn describe(
    encoder: &Encoder,
    output: &Path,
    thumbnail_dir: &Path,
) -> EncodeResult<()> {
    let duration = encoder.get_duration(output).await;
    let (width, height) = encoder.get_width_height(output).await;

    let thumbnail = encoder
        .get_thumbnail(output, thumbnail_dir, Duration::from_secs(u64::from(duration / 2)))
        .await?;

    log::info!(
        "{}: {}s, {}x{}, thumbnail {}",
        output.display(),
        duration,
        width,
        height,
        thumbnail
            .as_deref()
            .map(|t| t.display().to_string())
            .unwrap_or_else(|| "unavailable".to_string())
    );
    Ok(())
}
