//! Recording stand-in for ffmpeg/ffprobe used by the unit tests.

use std::{
    io,
    path::Path,
    sync::{Arc, Mutex},
};

use tokio::sync::Semaphore;

use super::runner::{CommandOutput, ProcessRunner};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    /// True when `needle` appears as a contiguous run of arguments
    pub fn has_args(&self, needle: &[&str]) -> bool {
        self.args
            .windows(needle.len())
            .any(|window| window.iter().zip(needle).all(|(a, b)| a == b))
    }
}

pub struct FakeRunner {
    video_probe: String,
    audio_probe: String,
    metadata_json: String,
    ffmpeg_code: i32,
    /// Bytes written to the last ffmpeg argument, even when it then fails
    ffmpeg_writes: Option<Vec<u8>>,
    /// Fail like ffmpeg without `-y` when the output already exists
    ffmpeg_refuses_existing: bool,
    /// ffmpeg calls wait for a permit here before they run
    ffmpeg_gate: Option<Arc<Semaphore>>,
    probe_code: i32,
    spawn_fails: bool,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            video_probe: String::new(),
            audio_probe: String::new(),
            metadata_json: "{}".to_string(),
            ffmpeg_code: 0,
            ffmpeg_writes: Some(b"encoded".to_vec()),
            ffmpeg_refuses_existing: false,
            ffmpeg_gate: None,
            probe_code: 0,
            spawn_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, stdout: &str) -> Self {
        self.video_probe = stdout.to_string();
        self
    }

    pub fn with_audio(mut self, stdout: &str) -> Self {
        self.audio_probe = stdout.to_string();
        self
    }

    pub fn with_metadata(mut self, json: &str) -> Self {
        self.metadata_json = json.to_string();
        self
    }

    pub fn ffmpeg_exits_with(mut self, code: i32) -> Self {
        self.ffmpeg_code = code;
        self
    }

    pub fn ffmpeg_writes(mut self, bytes: &[u8]) -> Self {
        self.ffmpeg_writes = Some(bytes.to_vec());
        self
    }

    pub fn ffmpeg_writes_nothing(mut self) -> Self {
        self.ffmpeg_writes = None;
        self
    }

    pub fn ffmpeg_refuses_existing(mut self) -> Self {
        self.ffmpeg_refuses_existing = true;
        self
    }

    /// Hold every ffmpeg call until `gate` hands out a permit
    pub fn ffmpeg_gated_by(mut self, gate: Arc<Semaphore>) -> Self {
        self.ffmpeg_gate = Some(gate);
        self
    }

    pub fn probe_exits_with(mut self, code: i32) -> Self {
        self.probe_code = code;
        self
    }

    pub fn spawn_fails(mut self) -> Self {
        self.spawn_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == program)
            .collect()
    }

    fn respond(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        if self.spawn_fails {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such binary"));
        }

        match program {
            "ffprobe" => {
                let selector = args
                    .iter()
                    .position(|a| a == "-select_streams")
                    .and_then(|i| args.get(i + 1));
                let stdout = match selector.map(String::as_str) {
                    Some("v:0") => &self.video_probe,
                    Some("a:0") => &self.audio_probe,
                    _ => &self.metadata_json,
                };
                Ok(CommandOutput {
                    code: Some(self.probe_code),
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: if self.probe_code == 0 {
                        Vec::new()
                    } else {
                        b"Invalid data found when processing input".to_vec()
                    },
                })
            }
            "ffmpeg" => {
                let out = args.last().map(Path::new);
                if self.ffmpeg_refuses_existing && out.is_some_and(|p| p.exists()) {
                    return Ok(CommandOutput {
                        code: Some(1),
                        stdout: Vec::new(),
                        stderr: b"File exists. Not overwriting".to_vec(),
                    });
                }
                if let (Some(bytes), Some(out)) = (&self.ffmpeg_writes, args.last()) {
                    std::fs::write(out, bytes)?;
                }
                Ok(CommandOutput {
                    code: Some(self.ffmpeg_code),
                    stdout: Vec::new(),
                    stderr: if self.ffmpeg_code == 0 {
                        Vec::new()
                    } else {
                        b"Conversion failed!".to_vec()
                    },
                })
            }
            other => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unexpected program {other}"),
            )),
        }
    }
}

impl ProcessRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(Call {
            program: program.to_string(),
            args: args.to_vec(),
        });
        if program == "ffmpeg" {
            if let Some(gate) = &self.ffmpeg_gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }
        self.respond(program, args)
    }
}
