use std::{future::Future, io, process::Stdio};

use tokio::process;

/// Captured result of an external command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external tools (ffmpeg, ffprobe) to completion.
///
/// Every tool call of the encoder goes through this trait so the decision
/// logic can be exercised with a recording fake.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<CommandOutput>> + Send;
}

/// Spawns real processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        log::debug!("Running {} {}", program, args.join(" "));

        let output = process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
