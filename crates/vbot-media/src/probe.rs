//! Source metadata probing via `yt-dlp -J`.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use vbot_models::MediaMeta;

use crate::error::{MediaError, MediaResult};

/// Subset of the yt-dlp info JSON used for metadata and size estimation.
#[derive(Debug, Default, Deserialize)]
pub struct ProbeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub formats: Vec<ProbeFormat>,
}

/// One entry of the `formats` array.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProbeFormat {
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl ProbeFormat {
    fn size(&self) -> Option<f64> {
        positive(self.filesize).or(positive(self.filesize_approx))
    }

    fn is_mp4(&self) -> bool {
        self.ext.as_deref() == Some("mp4")
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Probe `url` and estimate the download size at `target_height`.
pub async fn probe(url: &str, target_height: u32) -> MediaResult<MediaMeta> {
    let ytdlp = which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let primary = Command::new(&ytdlp)
        .args(["-J", "--no-warnings", "--no-playlist", "--playlist-items", "1"])
        .arg(url)
        .output()
        .await?;

    let output = if primary.status.success() {
        primary
    } else {
        let stderr = String::from_utf8_lossy(&primary.stderr);
        warn!("Probe failed for {} ({}), retrying without playlist options", url, stderr.trim());
        Command::new(&ytdlp)
            .args(["-J", "--no-warnings"])
            .arg(url)
            .output()
            .await?
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::probe_failed(stderr.trim().to_string()));
    }

    let info: ProbeInfo = serde_json::from_slice(&output.stdout)?;
    if info.is_live == Some(true) {
        return Err(MediaError::probe_failed("Live stream is not supported"));
    }

    let meta = meta_from_probe(&info, target_height);
    debug!(
        "Probed {}: title={:?} estimated_size_mb={:?}",
        url, meta.title, meta.estimated_size_mb
    );
    Ok(meta)
}

/// Build media metadata from the probe output.
pub fn meta_from_probe(info: &ProbeInfo, target_height: u32) -> MediaMeta {
    MediaMeta {
        title: info.title.clone(),
        duration: info.duration,
        thumbnail: info.thumbnail.clone(),
        estimated_size_mb: estimate_size_bytes(info, target_height).map(bytes_to_mb),
    }
}

/// Estimate the download size in bytes.
///
/// Prefers the best mp4 format at or below `target_height` (by height,
/// then bitrate), then any mp4 format, then the top-level size fields,
/// then the first format with any size.
pub fn estimate_size_bytes(info: &ProbeInfo, target_height: u32) -> Option<f64> {
    let mut candidates: Vec<&ProbeFormat> = info
        .formats
        .iter()
        .filter(|f| f.is_mp4() && f.height.unwrap_or(0) <= target_height)
        .collect();
    candidates.sort_by(|a, b| {
        let key = |f: &ProbeFormat| (f.height.unwrap_or(0), f.tbr.unwrap_or(0.0));
        let (ha, ta) = key(a);
        let (hb, tb) = key(b);
        hb.cmp(&ha).then(tb.total_cmp(&ta))
    });

    candidates
        .iter()
        .find_map(|f| f.size())
        .or_else(|| info.formats.iter().filter(|f| f.is_mp4()).find_map(|f| f.size()))
        .or_else(|| positive(info.filesize).or(positive(info.filesize_approx)))
        .or_else(|| info.formats.iter().find_map(|f| f.size()))
}

/// Convert bytes to megabytes, rounded to two decimals.
pub fn bytes_to_mb(bytes: f64) -> f64 {
    (bytes / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Reject an estimate above `max_size_mb`. Unknown estimates pass.
pub fn check_size_or_fail(estimated_size_mb: Option<f64>, max_size_mb: u64) -> MediaResult<()> {
    match estimated_size_mb {
        Some(size_mb) if size_mb > max_size_mb as f64 => Err(MediaError::TooLarge {
            size_mb,
            limit_mb: max_size_mb,
        }),
        _ => Ok(()),
    }
}

/// Reject a downloaded file above `max_size_mb`.
pub async fn ensure_size_within_limit(path: &Path, max_size_mb: u64) -> MediaResult<()> {
    let len = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?
        .len();
    check_size_or_fail(Some(bytes_to_mb(len as f64)), max_size_mb)
}
