//! Media download using yt-dlp.
//!
//! yt-dlp runs as a child process. Progress lines (see [`crate::progress`])
//! are parsed from both output streams as they arrive and handed to the
//! caller's callback; the final file path is read from
//! `--print after_move:filepath`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use vbot_models::{OutputFormat, Quality};

use crate::error::{MediaError, MediaResult};
use crate::paths::safe_file_name_for;
use crate::progress::{parse_progress_line, DownloadProgress, PROGRESS_TEMPLATE};
use crate::retry::{retry_if, RetryConfig};

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// yt-dlp format selection for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelector {
    pub format: String,
    pub merge_output_format: Option<&'static str>,
}

impl FormatSelector {
    /// Primary selector for a requested output format and quality.
    pub fn for_request(format: OutputFormat, quality: Quality) -> Self {
        if format.is_audio() {
            return Self {
                format: "bestaudio/best".to_string(),
                merge_output_format: None,
            };
        }
        let height = quality.height();
        Self {
            format: format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]/bestvideo+bestaudio/best",
                h = height
            ),
            merge_output_format: Some("mp4"),
        }
    }

    /// Generic selector used when the primary one fails.
    pub fn fallback() -> Self {
        Self {
            format: "best".to_string(),
            merge_output_format: None,
        }
    }
}

/// Download `url` into `out_dir` and return the local file path.
///
/// Transient failures are retried per `retry`. A generic download failure
/// with the primary selector is retried once more with format `best`.
pub async fn download_video<F>(
    url: &str,
    out_dir: &Path,
    format: OutputFormat,
    quality: Quality,
    retry: &RetryConfig,
    on_progress: F,
) -> MediaResult<PathBuf>
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    let ytdlp = which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;
    tokio::fs::create_dir_all(out_dir).await?;

    let primary = FormatSelector::for_request(format, quality);
    info!(
        "Downloading {} into {} (format={}, quality={}, selector={})",
        url,
        out_dir.display(),
        format,
        quality,
        primary.format
    );

    let attempt = |selector: FormatSelector| {
        let ytdlp = ytdlp.clone();
        let on_progress = &on_progress;
        async move {
            retry_if(
                retry,
                || run_ytdlp(&ytdlp, url, out_dir, &selector, on_progress),
                MediaError::is_transient,
            )
            .await
        }
    };

    let downloaded = match attempt(primary).await {
        Ok(path) => path,
        Err(e @ MediaError::DownloadFailed { .. }) if e.reason() == "download_failed" => {
            warn!("Primary format failed ({}). Retrying with generic 'best'.", e);
            attempt(FormatSelector::fallback()).await?
        }
        Err(e) => return Err(e),
    };

    Ok(rename_to_safe_name(downloaded).await)
}

async fn run_ytdlp<F>(
    ytdlp: &Path,
    url: &str,
    out_dir: &Path,
    selector: &FormatSelector,
    on_progress: &F,
) -> MediaResult<PathBuf>
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    let template = out_dir.join("%(title)s.%(ext)s");

    let mut cmd = Command::new(ytdlp);
    cmd.args([
        "--newline",
        "--progress",
        "--no-warnings",
        "--no-playlist",
        "--playlist-items",
        "1",
        "--no-simulate",
        "--print",
        "after_move:filepath",
        "--progress-template",
        PROGRESS_TEMPLATE,
        "-f",
    ])
    .arg(&selector.format)
    .arg("-o")
    .arg(&template);
    if let Some(merge) = selector.merge_output_format {
        cmd.args(["--merge-output-format", merge]);
    }
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running yt-dlp: {:?}", cmd);
    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::internal("yt-dlp stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("yt-dlp stderr was not captured"))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let (mut out_done, mut err_done) = (false, false);
    let mut printed_path: Option<PathBuf> = None;
    let mut stderr_tail: Vec<String> = Vec::new();

    while !(out_done && err_done) {
        tokio::select! {
            line = out_lines.next_line(), if !out_done => match line? {
                Some(line) => {
                    if let Some(progress) = parse_progress_line(&line) {
                        on_progress(progress);
                    } else if !line.trim().is_empty() {
                        printed_path = Some(PathBuf::from(line.trim()));
                    }
                }
                None => out_done = true,
            },
            line = err_lines.next_line(), if !err_done => match line? {
                Some(line) => {
                    if let Some(progress) = parse_progress_line(&line) {
                        on_progress(progress);
                    } else if !line.trim().is_empty() {
                        if stderr_tail.len() == STDERR_TAIL_LINES {
                            stderr_tail.remove(0);
                        }
                        stderr_tail.push(line);
                    }
                }
                None => err_done = true,
            },
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(classify_failure(&stderr_tail));
    }

    locate_download(printed_path, out_dir).await
}

/// Build an error from yt-dlp's trailing stderr.
fn classify_failure(stderr_tail: &[String]) -> MediaError {
    let message = stderr_tail
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .cloned()
        .unwrap_or_else(|| stderr_tail.join("\n"));
    let message = if message.trim().is_empty() {
        "yt-dlp exited with an error".to_string()
    } else {
        message
    };

    if message.contains("HTTP Error 429") || message.to_lowercase().contains("too many requests") {
        MediaError::RateLimited(message)
    } else {
        MediaError::download_failed(message)
    }
}

/// Resolve the downloaded file.
///
/// Uses the printed path when it exists, otherwise the largest complete
/// file in `out_dir`.
async fn locate_download(printed: Option<PathBuf>, out_dir: &Path) -> MediaResult<PathBuf> {
    if let Some(path) = printed {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
        debug!("Printed path {} does not exist, scanning output dir", path.display());
    }

    let mut best: Option<(u64, PathBuf)> = None;
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let partial = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("part") | Some("ytdl") | Some("json")
        );
        let meta = entry.metadata().await?;
        if partial || !meta.is_file() {
            continue;
        }
        if best.as_ref().map_or(true, |(len, _)| meta.len() > *len) {
            best = Some((meta.len(), path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or_else(|| MediaError::download_failed("Could not determine the downloaded file path"))
}

/// Rename a download to its sanitized name. Keeps the original on failure.
async fn rename_to_safe_name(path: PathBuf) -> PathBuf {
    let safe = safe_file_name_for(&path, "video");
    let target = path.with_file_name(&safe);
    if target == path {
        return path;
    }

    if tokio::fs::try_exists(&target).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(&target).await;
    }
    match tokio::fs::rename(&path, &target).await {
        Ok(()) => target,
        Err(e) => {
            debug!("Could not rename {} to a safe name: {}", path.display(), e);
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_for_video() {
        let selector = FormatSelector::for_request(OutputFormat::Mp4, Quality::P480);
        assert!(selector.format.starts_with("bestvideo[height<=480]+bestaudio"));
        assert_eq!(selector.merge_output_format, Some("mp4"));

        let auto = FormatSelector::for_request(OutputFormat::Webm, Quality::Auto);
        assert!(auto.format.contains("height<=720"));
    }

    #[test]
    fn test_selector_for_audio() {
        let selector = FormatSelector::for_request(OutputFormat::Mp3, Quality::P1080);
        assert_eq!(selector.format, "bestaudio/best");
        assert_eq!(selector.merge_output_format, None);
    }

    #[test]
    fn test_classify_failure() {
        let tail = vec![
            "[youtube] abc: Downloading webpage".to_string(),
            "ERROR: [youtube] abc: Video unavailable".to_string(),
        ];
        let err = classify_failure(&tail);
        assert_eq!(err.reason(), "unavailable");

        let err = classify_failure(&["ERROR: unable to download video data: HTTP Error 429: Too Many Requests".to_string()]);
        assert!(matches!(err, MediaError::RateLimited(_)));

        let err = classify_failure(&[]);
        assert_eq!(err.reason(), "download_failed");
    }

    #[tokio::test]
    async fn test_locate_download_prefers_printed_path() {
        let dir = tempfile::tempdir().unwrap();
        let printed = dir.path().join("clip.mp4");
        tokio::fs::write(&printed, b"x").await.unwrap();
        tokio::fs::write(dir.path().join("other.mkv"), vec![0u8; 64]).await.unwrap();

        let found = locate_download(Some(printed.clone()), dir.path()).await.unwrap();
        assert_eq!(found, printed);
    }

    #[tokio::test]
    async fn test_locate_download_scans_for_largest_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("small.webm"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("big.mp4"), vec![0u8; 64]).await.unwrap();
        tokio::fs::write(dir.path().join("bigger.mp4.part"), vec![0u8; 128]).await.unwrap();

        let found = locate_download(Some(dir.path().join("gone.mp4")), dir.path())
            .await
            .unwrap();
        assert_eq!(found, dir.path().join("big.mp4"));

        let empty = tempfile::tempdir().unwrap();
        assert!(locate_download(None, empty.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_to_safe_name() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("What? A clip!.mp4");
        tokio::fs::write(&raw, b"x").await.unwrap();

        let renamed = rename_to_safe_name(raw.clone()).await;
        assert_eq!(renamed, dir.path().join("What_ A clip.mp4"));
        assert!(renamed.exists());
        assert!(!raw.exists());
    }
}
