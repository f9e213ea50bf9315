use std::path::Path;

use strum::{Display, EnumString};

use super::{Encoder, runner::ProcessRunner};
use crate::{
    errors::{EncodeResult, EncoderError},
    utils::path_str,
};

/// Stream specifier understood by `ffprobe -select_streams`
#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelector {
    #[strum(serialize = "v:0")]
    Video,
    #[strum(serialize = "a:0")]
    Audio,
}

/// Whitespace separated `codec_name codec_tag_string` as printed by ffprobe.
/// Empty when the selected stream does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecDescriptor(pub Vec<String>);

impl CodecDescriptor {
    pub fn parse(stdout: &str) -> Self {
        Self(stdout.split_whitespace().map(str::to_owned).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codec_name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn codec_tag(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }
}

impl<R: ProcessRunner> Encoder<R> {
    pub async fn probe_codec(
        &self,
        path: &Path,
        selector: StreamSelector,
    ) -> EncodeResult<CodecDescriptor> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            selector.to_string(),
            "-show_entries".to_string(),
            "stream=codec_name,codec_tag_string".to_string(),
            "-of".to_string(),
            "default=nokey=1:noprint_wrappers=1".to_string(),
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

        Ok(CodecDescriptor::parse(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}
