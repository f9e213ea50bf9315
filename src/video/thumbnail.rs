use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use tokio::fs::OpenOptions;

use super::{Encoder, runner::ProcessRunner};
use crate::{
    errors::{EncodeResult, EncoderError},
    temp_file::TempFile,
    utils::path_str,
};

/// `<unix seconds>.<micros>.jpg`
fn thumbnail_name() -> String {
    let now = Utc::now();
    format!("{}.{:06}.jpg", now.timestamp(), now.timestamp_subsec_micros())
}

impl<R: ProcessRunner> Encoder<R> {
    /// Grab a single frame at `timestamp` into a new JPEG inside `directory`.
    ///
    /// Returns `Ok(None)` when ffmpeg fails on the input; the placeholder it
    /// would have filled is removed in that case.
    pub async fn get_thumbnail(
        &self,
        input: &Path,
        directory: &Path,
        timestamp: Duration,
    ) -> EncodeResult<Option<PathBuf>> {
        let out_path = directory.join(thumbnail_name());

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&out_path)
            .await?;
        let placeholder = TempFile::new(&out_path);

        let args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", timestamp.as_secs_f64()),
            "-i".to_string(),
            path_str(input)?.to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            path_str(&out_path)?.to_string(),
        ];

        let output = self
            .runner
            .run(&self.ffmpeg, &args)
            .await
            .map_err(|e| EncoderError::external_command_error(&self.ffmpeg, e.to_string()))?;

        if !output.success() {
            log::debug!(
                "No thumbnail for {}: {}",
                input.display(),
                output.stderr_lossy()
            );
            return Ok(None);
        }

        Ok(Some(placeholder.persist()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, video::fake_runner::FakeRunner};

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn name_is_a_timestamp_jpeg() {
        let name = thumbnail_name();
        let stem = name.strip_suffix(".jpg").unwrap();
        let (secs, micros) = stem.split_once('.').unwrap();
        assert!(secs.parse::<i64>().unwrap() > 0);
        assert_eq!(micros.len(), 6);
    }

    #[tokio::test]
    async fn thumbnail_is_written_to_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Encoder::new(
            FakeRunner::new().ffmpeg_writes(b"\xff\xd8jpeg"),
            &Config::default(),
        );

        let thumb = encoder
            .get_thumbnail(
                Path::new("movie.HEVC.mp4"),
                dir.path(),
                Duration::from_secs(12),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumb.parent(), Some(dir.path()));
        assert_eq!(thumb.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(std::fs::read(&thumb).unwrap(), b"\xff\xd8jpeg");

        let call = &encoder.runner().calls_to("ffmpeg")[0];
        assert!(call.has_args(&["-ss", "12.000", "-i", "movie.HEVC.mp4"]));
        assert!(call.has_args(&["-vframes", "1"]));
        assert_eq!(call.args.last().unwrap(), thumb.to_str().unwrap());
    }

    #[tokio::test]
    async fn failed_extraction_returns_none_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Encoder::new(FakeRunner::new().ffmpeg_exits_with(1), &Config::default());

        let thumb = encoder
            .get_thumbnail(Path::new("broken.mp4"), dir.path(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(thumb, None);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn placeholder_exists_before_ffmpeg_runs() {
        let dir = tempfile::tempdir().unwrap();
        // ffmpeg succeeds without touching the file: the placeholder is returned as is
        let encoder = Encoder::new(FakeRunner::new().ffmpeg_writes_nothing(), &Config::default());

        let thumb = encoder
            .get_thumbnail(Path::new("clip.mp4"), dir.path(), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        assert!(thumb.exists());
        assert_eq!(std::fs::metadata(&thumb).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Encoder::new(FakeRunner::new().spawn_fails(), &Config::default());

        let result = encoder
            .get_thumbnail(Path::new("clip.mp4"), dir.path(), Duration::from_secs(1))
            .await;

        assert!(result.is_err());
        assert!(files_in(dir.path()).is_empty());
    }
}
