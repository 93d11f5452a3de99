//! FFmpeg command construction and subprocess execution.
//!
//! Two builders share one runner: [`FfmpegCommand`] for single-input
//! invocations (the thumbnail still) and [`EncodeCommand`] for the
//! multi-input filter-complex invocation the Timeline Compiler emits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Trait shared by the two command builders so the runner doesn't care
/// which one it's executing.
pub trait BuildArgs {
    fn build_args(&self) -> Vec<String>;
}

/// Single-input FFmpeg command (thumbnail extraction, simple transcodes).
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn single_frame(self) -> Self {
        self.output_arg("-vframes").output_arg("1")
    }

    pub fn quality(self, qscale: u8) -> Self {
        self.output_arg("-q:v").output_arg(qscale.to_string())
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl BuildArgs for FfmpegCommand {
    fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-v".to_string());
        args.push(self.log_level.clone());
        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// One input slot in a multi-input encode, in the order the Timeline
/// Compiler's input list (§4.4.1) assigns it.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub path: PathBuf,
    /// Args emitted immediately before this input's `-i`, e.g.
    /// `-stream_loop -1` for looped GIF/image inputs.
    pub pre_args: Vec<String>,
}

impl InputSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pre_args: Vec::new(),
        }
    }

    pub fn looped(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pre_args: vec!["-stream_loop".to_string(), "-1".to_string()],
        }
    }
}

/// Multi-input filter-complex encode, the shape the Timeline Compiler
/// produces.
#[derive(Debug, Clone)]
pub struct EncodeCommand {
    inputs: Vec<InputSpec>,
    filter_complex: Option<String>,
    output_args: Vec<String>,
    output: PathBuf,
    overwrite: bool,
    log_level: String,
}

impl EncodeCommand {
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            filter_complex: None,
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn add_input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn filter_complex(mut self, graph: impl Into<String>) -> Self {
        self.filter_complex = Some(graph.into());
        self
    }

    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn video_codec(self, codec: &str) -> Self {
        self.output_arg("-c:v").output_arg(codec.to_string())
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u32) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn video_bitrate_mbps(self, mbps: f64) -> Self {
        self.output_arg("-b:v").output_arg(format!("{}M", mbps))
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate_kbps(self, kbps: u32) -> Self {
        self.output_arg("-b:a").output_arg(format!("{}k", kbps))
    }

    /// `-sn -dn`: no subtitle/data streams, per §4.4.7.
    pub fn no_subtitles_or_data(self) -> Self {
        self.output_arg("-sn").output_arg("-dn")
    }

    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    pub fn pixel_format(self, fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(fmt)
    }

    /// Bounds total output duration per §4.4.7.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }
}

impl BuildArgs for EncodeCommand {
    fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-v".to_string());
        args.push(self.log_level.clone());
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.pre_args.clone());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Elapsed encode time parsed from FFmpeg's stderr. The engine's stderr is a
/// best-effort progress source (§9 design note): a best-effort parse is
/// correct behavior, not a shortcut.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncodeProgress {
    pub elapsed_sec: f64,
}

/// Parse a `time=HH:MM:SS(.ff)` token out of an FFmpeg stderr line (§4.5).
/// FFmpeg emits this both in its human-readable progress banner
/// (`frame=... time=00:00:05.12 bitrate=...`) and is not tied to any
/// specific surrounding format, so this scans for the token rather than
/// anchoring on line structure.
pub fn parse_progress_line(line: &str) -> Option<EncodeProgress> {
    let idx = line.find("time=")?;
    let rest = &line[idx + "time=".len()..];
    let token: &str = rest.split_whitespace().next()?;
    parse_timestamp(token).map(|elapsed_sec| EncodeProgress { elapsed_sec })
}

fn parse_timestamp(token: &str) -> Option<f64> {
    let mut parts = token.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

/// How much stderr to retain for failure diagnostics (§4.5).
const STDERR_TAIL_BYTES: usize = 1500;

/// Runs [`BuildArgs`] implementers as an `ffmpeg` subprocess, streaming
/// stderr for progress and retaining a tail for failure diagnostics.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &impl BuildArgs) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, cmd: &impl BuildArgs, on_progress: F) -> MediaResult<()>
    where
        F: Fn(EncodeProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut reader = BufReader::new(stderr).lines();

        let tail: std::sync::Arc<std::sync::Mutex<String>> = std::sync::Arc::new(std::sync::Mutex::new(String::new()));
        let tail_writer = tail.clone();

        let progress_handle = tokio::spawn(async move {
            while let Ok(Some(line)) = reader.next_line().await {
                if let Ok(mut buf) = tail_writer.lock() {
                    buf.push_str(&line);
                    buf.push('\n');
                    if buf.len() > STDERR_TAIL_BYTES {
                        let start = buf.len() - STDERR_TAIL_BYTES;
                        *buf = buf[start..].to_string();
                    }
                }
                if let Some(progress) = parse_progress_line(&line) {
                    on_progress(progress);
                }
            }
        });

        let result = self.wait_for_completion(&mut child).await;
        let _ = progress_handle.await;

        match result {
            Ok(()) => Ok(()),
            Err(MediaError::EngineFailed { exit_code, .. }) => {
                let stderr_tail = tail.lock().map(|s| s.clone()).unwrap_or_default();
                Err(MediaError::EngineFailed { stderr_tail, exit_code })
            }
            Err(other) => Err(other),
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let wait_future = child.wait();

        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), wait_future).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("ffmpeg timed out after {}s, killing process", timeout_secs);
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            wait_future.await?
        };

        if let Some(ref cancel_rx) = self.cancel_rx {
            if *cancel_rx.borrow() {
                info!("ffmpeg run cancelled, killing process");
                let _ = child.kill().await;
                return Err(MediaError::Cancelled);
            }
        }

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::EngineFailed {
                stderr_tail: String::new(),
                exit_code: status.code(),
            })
        }
    }
}

/// Verify required binaries are on `PATH`. Called once at worker startup so
/// a misconfigured deployment fails fast rather than on the first job.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_input_command_builds_expected_args() {
        let cmd = FfmpegCommand::new("in.mp4", "thumb.jpg")
            .seek(1.0)
            .video_filter("scale=-2:720")
            .single_frame()
            .quality(2);

        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"1.000".to_string()));
        assert!(args.contains(&"-vframes".to_string()));
        assert_eq!(args.last().unwrap(), "thumb.jpg");
    }

    #[test]
    fn multi_input_command_orders_inputs_then_filter_then_output_args() {
        let cmd = EncodeCommand::new("out.mp4")
            .add_input(InputSpec::new("scene0.mp4"))
            .add_input(InputSpec::looped("logo.gif"))
            .filter_complex("[0:v][1:v]overlay[vout]")
            .map("[vout]")
            .video_codec("libx264")
            .crf(23)
            .no_subtitles_or_data()
            .faststart()
            .pixel_format("yuv420p");

        let args = cmd.build_args();
        let i_positions: Vec<usize> = args.iter().enumerate().filter(|(_, a)| *a == "-i").map(|(i, _)| i).collect();
        assert_eq!(i_positions.len(), 2);
        assert_eq!(args[i_positions[0] + 1], "scene0.mp4");
        assert_eq!(args[i_positions[1] + 1], "logo.gif");
        assert!(args.contains(&"-stream_loop".to_string()));
        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.contains(&"-sn".to_string()));
        assert!(args.contains(&"-dn".to_string()));
    }

    #[test]
    fn progress_line_extracts_elapsed_seconds() {
        let line = "frame=  125 fps= 25 q=28.0 size=    512kB time=00:00:05.12 bitrate= 818.3kbits/s speed=1.2x";
        let progress = parse_progress_line(line).expect("should parse");
        assert!((progress.elapsed_sec - 5.12).abs() < 0.01);
    }

    #[test]
    fn progress_line_without_time_token_is_none() {
        assert!(parse_progress_line("frame=  125 fps= 25").is_none());
    }
}
