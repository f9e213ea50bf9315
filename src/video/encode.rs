use std::path::{Path, PathBuf};

use tokio::fs;

use super::{
    Encoder,
    probe::{CodecDescriptor, StreamSelector},
    runner::ProcessRunner,
};
use crate::{
    errors::{ConversionError, EncodeResult, EncoderError},
    temp_file::TempFile,
    utils::{is_file, output_path_for, path_str},
};

/// Why `encode` returned without producing a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    OutputExists(PathBuf),
    NoVideoStream,
    /// Already HEVC tagged `hvc1`
    AlreadyTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPlan {
    /// Stream copy, only the codec tag is rewritten to `hvc1`
    RetagHvc1,
    ToH264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPlan {
    /// No audio stream, ffmpeg defaults apply
    Passthrough,
    ToOpus,
    ToVorbis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video: VideoPlan,
    pub audio: AudioPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeDecision {
    Skip(SkipReason),
    Transcode(EncodePlan),
}

impl VideoPlan {
    pub fn from_codec(codec: &CodecDescriptor) -> Option<Self> {
        match (codec.codec_name(), codec.codec_tag()) {
            (Some("hevc"), Some("hvc1")) => None,
            (Some("hevc"), _) => Some(Self::RetagHvc1),
            _ => Some(Self::ToH264),
        }
    }

    pub fn args(self, threads: usize) -> Vec<String> {
        let args: &[&str] = match self {
            Self::RetagHvc1 => &["-c:v", "copy", "-tag:v", "hvc1"],
            Self::ToH264 => &[
                "-c:v",
                "libx264",
                "-crf",
                "29",
                "-preset",
                "medium",
                "-tune",
                "animation",
                "-b:v",
                "350k",
                "-threads",
            ],
        };

        let mut args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if self == Self::ToH264 {
            args.push(threads.to_string());
        }
        args
    }
}

impl AudioPlan {
    pub fn from_codec(codec: &CodecDescriptor) -> Self {
        match codec.codec_name() {
            None => Self::Passthrough,
            Some("libvorbis") => Self::ToOpus,
            Some(_) => Self::ToVorbis,
        }
    }

    pub fn args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Passthrough => &[],
            Self::ToOpus => &["-c:a", "libopus"],
            Self::ToVorbis => &["-c:a", "libvorbis", "-b:a", "60k", "-ac", "2"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

impl EncodePlan {
    /// Full ffmpeg argument list: input, video options, audio options, output
    pub fn ffmpeg_args(&self, threads: usize) -> Result<Vec<String>, ConversionError> {
        let mut args = vec!["-i".to_string(), path_str(&self.input)?.to_string()];
        args.extend(self.video.args(threads));
        args.extend(self.audio.args());
        args.push(path_str(&self.output)?.to_string());
        Ok(args)
    }
}

impl<R: ProcessRunner> Encoder<R> {
    /// Decide what `encode` would do without running the transcode
    pub async fn plan(&self, input: &Path) -> EncodeResult<EncodeDecision> {
        let output = output_path_for(input)?;

        if is_file(&output).await {
            return Ok(EncodeDecision::Skip(SkipReason::OutputExists(output)));
        }

        let video_codec = self.probe_codec(input, StreamSelector::Video).await?;
        if video_codec.is_empty() {
            return Ok(EncodeDecision::Skip(SkipReason::NoVideoStream));
        }

        let Some(video) = VideoPlan::from_codec(&video_codec) else {
            return Ok(EncodeDecision::Skip(SkipReason::AlreadyTarget));
        };

        let audio_codec = self.probe_codec(input, StreamSelector::Audio).await?;
        let audio = AudioPlan::from_codec(&audio_codec);

        Ok(EncodeDecision::Transcode(EncodePlan {
            input: input.to_path_buf(),
            output,
            video,
            audio,
        }))
    }

    /// Transcode `input` to `<stem>.HEVC.mp4` and delete the input.
    ///
    /// Returns `Ok(None)` when there is nothing to do. The input is only
    /// removed after ffmpeg exited successfully and left a non-empty output.
    pub async fn encode(&self, input: &Path) -> EncodeResult<Option<PathBuf>> {
        let plan = match self.plan(input).await? {
            EncodeDecision::Transcode(plan) => plan,
            EncodeDecision::Skip(reason) => {
                match &reason {
                    SkipReason::OutputExists(output) => log::info!(
                        "Skipping \"{}\": file already exists",
                        output.display()
                    ),
                    SkipReason::NoVideoStream => {
                        log::info!("Skipping {}: no video codec reported", input.display())
                    }
                    SkipReason::AlreadyTarget => {
                        log::info!("Skipping {}: already h265 / hvc1", input.display())
                    }
                }
                return Ok(None);
            }
        };

        log::info!(
            "Encoding {} -> {} ({:?}, {:?})",
            input.display(),
            plan.output.display(),
            plan.video,
            plan.audio
        );

        let args = plan.ffmpeg_args(self.threads)?;
        let output_guard = TempFile::new(&plan.output);

        let result = self
            .runner
            .run(&self.ffmpeg, &args)
            .await
            .map_err(|e| EncoderError::external_command_error(&self.ffmpeg, e.to_string()))?;

        if !result.success() {
            log::error!("ffmpeg failed on {}, keeping the input", input.display());
            return Err(ConversionError::FfmpegFailed {
                code: result.code,
                stderr: result.stderr_lossy(),
            }
            .into());
        }

        let written = fs::metadata(output_guard.path())
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(ConversionError::EmptyOutput(plan.output).into());
        }

        let output = output_guard.persist();
        // Output is already persisted, a leftover input is not an encode failure
        if let Err(e) = fs::remove_file(input).await {
            log::warn!(
                "Encoded {} but could not remove {}: {}",
                output.display(),
                input.display(),
                e
            );
        }
        log::info!("Encoded {}", output.display());

        Ok(Some(output))
    }
}
