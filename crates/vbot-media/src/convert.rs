//! FFmpeg conversion to the requested container or audio format.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info};

use vbot_models::OutputFormat;

use crate::error::{MediaError, MediaResult};

/// FFmpeg output arguments for a target format. `None` for `source`.
pub fn preset_args(format: OutputFormat) -> Option<&'static [&'static str]> {
    let args: &'static [&'static str] = match format {
        OutputFormat::Mp4 => &["-c:v", "libx264", "-c:a", "aac", "-movflags", "+faststart"],
        OutputFormat::Webm => &["-c:v", "libvpx-vp9", "-c:a", "libopus"],
        OutputFormat::Mkv => &["-c:v", "libx264", "-c:a", "aac"],
        OutputFormat::Mp3 => &["-vn", "-c:a", "libmp3lame", "-b:a", "192k"],
        OutputFormat::M4a => &["-vn", "-c:a", "aac", "-b:a", "192k"],
        OutputFormat::Ogg => &["-vn", "-c:a", "libvorbis", "-q:a", "4"],
        OutputFormat::Source => return None,
    };
    Some(args)
}

/// Output path for converting `input` to `extension`.
///
/// When the extension is unchanged the stem gets a `_conv` suffix so the
/// input is never overwritten.
pub fn output_path_for(input: &Path, extension: &str) -> PathBuf {
    let same_ext = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension));

    if same_ext {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        input.with_file_name(format!("{}_conv.{}", stem, extension))
    } else {
        input.with_extension(extension)
    }
}

/// Builder for a single-input FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add output arguments (after -i).
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            self.log_level.clone(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
        ];
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Run an FFmpeg command to completion.
pub async fn run_ffmpeg(cmd: &FfmpegCommand) -> MediaResult<()> {
    let ffmpeg = which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let args = cmd.build_args();
    info!("Running FFmpeg: ffmpeg {}", args.join(" "));

    let output = Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    error!("FFmpeg failed: {}", stderr.trim());
    Err(MediaError::ffmpeg_failed(
        "ffmpeg conversion failed",
        Some(stderr),
        output.status.code(),
    ))
}

/// Convert `input` to `format` and return the resulting path.
///
/// `source` returns the input unchanged.
pub async fn convert_any(input: &Path, format: OutputFormat) -> MediaResult<PathBuf> {
    let (Some(extension), Some(args)) = (format.extension(), preset_args(format)) else {
        debug!("Keeping source file {}", input.display());
        return Ok(input.to_path_buf());
    };

    let output = output_path_for(input, extension);
    let cmd = FfmpegCommand::new(input, &output).output_args(args.iter().copied());
    run_ffmpeg(&cmd).await?;

    if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(output));
    }
    Ok(output)
}

/// Check that the external tools are on PATH.
pub fn check_tools() -> MediaResult<()> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
    Ok(())
}
