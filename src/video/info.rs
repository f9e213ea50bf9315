use std::path::Path;

use serde::Deserialize;

use super::{Encoder, runner::ProcessRunner};
use crate::{
    errors::{EncodeResult, EncoderError},
    utils::path_str,
};

/// Resolution reported when the file carries no usable dimensions
pub const FALLBACK_RESOLUTION: (u32, u32) = (856, 480);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    /// Seconds
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl MediaMetadata {
    fn parse_json(json: &str) -> EncodeResult<Self> {
        let probe: FfprobeOutput = serde_json::from_str(json)?;

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        // Container duration first, stream duration for formats that only report it there
        let duration = probe
            .format
            .and_then(|f| f.duration)
            .or_else(|| video.and_then(|v| v.duration.clone()))
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0);

        Ok(Self {
            duration,
            width: video.and_then(|v| v.width),
            height: video.and_then(|v| v.height),
        })
    }

    /// Whole seconds, `0` when unknown
    pub fn duration_secs(&self) -> u32 {
        self.duration.map(|d| d as u32).unwrap_or(0)
    }

    /// Both dimensions or [`FALLBACK_RESOLUTION`]
    pub fn width_height(&self) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(width), Some(height)) => (width, height),
            _ => FALLBACK_RESOLUTION,
        }
    }
}

impl<R: ProcessRunner> Encoder<R> {
    async fn probe_metadata(&self, path: &Path) -> EncodeResult<MediaMetadata> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path_str(path)?.to_string(),
        ];

        let output = self
            .runner
            .run(&self.ffprobe, &args)
            .await
            .map_err(|e| EncoderError::external_command_error(&self.ffprobe, e.to_string()))?;

        if !output.success() {
            return Err(EncoderError::external_command_error(
                &self.ffprobe,
                output.stderr_lossy(),
            ));
        }

        MediaMetadata::parse_json(&String::from_utf8_lossy(&output.stdout))
    }

    /// Metadata of `path`; anything unreadable yields empty metadata
    pub async fn metadata(&self, path: &Path) -> MediaMetadata {
        match self.probe_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("No metadata for {}: {}", path.display(), e);
                MediaMetadata::default()
            }
        }
    }

    pub async fn get_duration(&self, path: &Path) -> u32 {
        self.metadata(path).await.duration_secs()
    }

    pub async fn get_width_height(&self, path: &Path) -> (u32, u32) {
        self.metadata(path).await.width_height()
    }
}
