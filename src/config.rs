use std::path::PathBuf;

use crate::errors::{EncodeResult, EncoderError};

const DEFAULT_DOWNLOAD_DIR: &str = "downloads/";
const DEFAULT_ENCODE_THREADS: usize = 8;
const DEFAULT_MAX_CONCURRENT_ENCODES: usize = 1;

/// Runtime settings for the encoder and its queue
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Where downloaded videos and thumbnails are placed
    pub download_dir: PathBuf,
    /// Value passed to `-threads` when transcoding to H.264
    pub encode_threads: usize,
    pub max_concurrent_encodes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            encode_threads: DEFAULT_ENCODE_THREADS,
            max_concurrent_encodes: DEFAULT_MAX_CONCURRENT_ENCODES,
        }
    }
}

impl Config {
    /// Read settings from the process environment (after `.env` was loaded)
    pub fn from_env() -> EncodeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> EncodeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: lookup("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            download_dir: lookup("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            encode_threads: parse_positive(&lookup, "ENCODE_THREADS", defaults.encode_threads)?,
            max_concurrent_encodes: parse_positive(
                &lookup,
                "MAX_CONCURRENT_ENCODES",
                defaults.max_concurrent_encodes,
            )?,
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &str, default: usize) -> EncodeResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().parse::<usize>() {
        Ok(0) => Err(EncoderError::invalid_parameters(format!(
            "{} must be at least 1",
            key
        ))),
        Ok(value) => Ok(value),
        Err(e) => Err(EncoderError::invalid_parameters(format!(
            "{} = '{}': {}",
            key, raw, e
        ))),
    }
}
