//! The converter interface and its yt-dlp + FFmpeg implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use vbot_models::{ConversionRequest, MediaMeta};

use crate::convert::convert_any;
use crate::download::download_video;
use crate::error::{MediaError, MediaResult};
use crate::paths::guess_mimetype;
use crate::probe::{check_size_or_fail, ensure_size_within_limit, probe};
use crate::progress::download_progress_percent;
use crate::retry::{retry_if, RetryConfig};

/// Progress reported by a converter while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    /// A new stage started.
    Stage { message: String, progress: u8 },
    /// Progress within the current stage.
    Progress(u8),
    /// Metadata of the source became known.
    Meta(MediaMeta),
}

/// Channel a converter reports events on. Send errors are ignored.
pub type EventSink = mpsc::UnboundedSender<ConversionEvent>;

/// A finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub path: PathBuf,
    pub mimetype: String,
}

impl ConvertedFile {
    /// Name of the file without its directory.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Turns a conversion request into a file inside `output_dir`.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        request: &ConversionRequest,
        output_dir: &Path,
        events: EventSink,
    ) -> MediaResult<ConvertedFile>;
}

/// Converter limits.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub max_file_size_mb: u64,
    pub retry: RetryConfig,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 500,
            retry: RetryConfig::default(),
        }
    }
}

/// Production converter: probe and download with yt-dlp, convert with FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct YtDlpConverter {
    config: ConverterConfig,
}

impl YtDlpConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }
}

fn emit(events: &EventSink, event: ConversionEvent) {
    let _ = events.send(event);
}

fn stage(events: &EventSink, message: impl Into<String>, progress: u8) {
    emit(
        events,
        ConversionEvent::Stage {
            message: message.into(),
            progress,
        },
    );
}

#[async_trait]
impl Converter for YtDlpConverter {
    async fn convert(
        &self,
        request: &ConversionRequest,
        output_dir: &Path,
        events: EventSink,
    ) -> MediaResult<ConvertedFile> {
        let quality = request.quality.resolve();

        stage(&events, "Fetching metadata", 5);
        let probe_retry = self.config.retry.named("probe");
        let meta = retry_if(
            &probe_retry,
            || probe(&request.url, quality.height()),
            MediaError::is_transient,
        )
        .await?;
        emit(&events, ConversionEvent::Meta(meta.clone()));
        check_size_or_fail(meta.estimated_size_mb, self.config.max_file_size_mb)?;

        stage(&events, "Downloading media", 15);
        let download_retry = self.config.retry.named("download");
        let downloaded = download_video(
            &request.url,
            output_dir,
            request.format,
            quality,
            &download_retry,
            |p| {
                if let Some(percent) = download_progress_percent(&p) {
                    emit(&events, ConversionEvent::Progress(percent));
                }
            },
        )
        .await?;
        ensure_size_within_limit(&downloaded, self.config.max_file_size_mb).await?;
        debug!("Downloaded {}", downloaded.display());

        let path = if request.format.extension().is_some() {
            let progress = if request.format.is_audio() { 92 } else { 95 };
            stage(
                &events,
                format!("Converting to {}", request.format.as_str().to_uppercase()),
                progress,
            );
            let converted = convert_any(&downloaded, request.format).await?;
            if converted != downloaded {
                let _ = tokio::fs::remove_file(&downloaded).await;
            }
            converted
        } else {
            downloaded
        };

        info!("Conversion of {} finished: {}", request.url, path.display());
        Ok(ConvertedFile {
            mimetype: guess_mimetype(&path).to_string(),
            path,
        })
    }
}
