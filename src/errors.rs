use std::path::PathBuf;

use thiserror::Error;

/// Centralized error type for the encoder and its queue
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Transcode failures
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
    /// File system failures
    #[error("file system error: {0}")]
    FileSystem(#[from] std::io::Error),
    /// Malformed tool output
    #[error("parse error: {0}")]
    Parse(String),
    /// Bad configuration or arguments
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// External command could not run or exited with an error
    #[error("command {command} failed: {stderr}")]
    ExternalCommand { command: String, stderr: String },
    #[error("{0}")]
    General(String),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("path is not valid UTF-8")]
    NonUtf8Path,
    #[error("ffmpeg exited with {} - stderr: {stderr}", exit_code(.code))]
    FfmpegFailed { code: Option<i32>, stderr: String },
    #[error("ffmpeg produced no output at {0}")]
    EmptyOutput(PathBuf),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "signal".to_string(),
    }
}

impl From<serde_json::Error> for EncoderError {
    fn from(err: serde_json::Error) -> Self {
        EncoderError::Parse(format!("JSON parsing error: {}", err))
    }
}

impl EncoderError {
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn external_command_error(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ExternalCommand {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

pub type EncodeResult<T> = Result<T, EncoderError>;
