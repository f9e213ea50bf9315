pub mod encode;
pub mod info;
pub mod probe;
pub mod runner;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod fake_runner;

pub use runner::{ProcessRunner, TokioRunner};

use crate::config::Config;

/// Wraps ffprobe/ffmpeg behind a [`ProcessRunner`].
///
/// Stateless apart from tool locations; every operation is an independent
/// call that waits for its external process.
pub struct Encoder<R = TokioRunner> {
    runner: R,
    ffmpeg: String,
    ffprobe: String,
    threads: usize,
}

impl<R: ProcessRunner> Encoder<R> {
    pub fn new(runner: R, config: &Config) -> Self {
        Self {
            runner,
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            threads: config.encode_threads,
        }
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }
}
