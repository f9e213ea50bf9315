use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::{ConversionError, EncodeResult, EncoderError};

/// Suffix that replaces the extension of every transcoded file
pub const OUTPUT_SUFFIX: &str = ".HEVC.mp4";

/// `clip.avi` -> `clip.HEVC.mp4`, next to the input
pub fn output_path_for(input: &Path) -> EncodeResult<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        EncoderError::invalid_parameters(format!("{} has no file name", input.display()))
    })?;

    let mut name = stem.to_os_string();
    name.push(OUTPUT_SUFFIX);
    let output = input.with_file_name(name);

    if output == input {
        return Err(EncoderError::invalid_parameters(format!(
            "output path would overwrite the input {}",
            input.display()
        )));
    }

    Ok(output)
}

pub fn path_str(path: &Path) -> Result<&str, ConversionError> {
    path.to_str().ok_or(ConversionError::NonUtf8Path)
}

pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

pub async fn ensure_dir(path: &Path) -> EncodeResult<()> {
    if !is_file(path).await {
        fs::create_dir_all(path).await?;
        return Ok(());
    }
    Err(EncoderError::invalid_parameters(format!(
        "{} exists and is not a directory",
        path.display()
    )))
}
