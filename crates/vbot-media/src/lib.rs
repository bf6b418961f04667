//! yt-dlp and FFmpeg CLI wrappers for media retrieval and conversion.
//!
//! This crate provides:
//! - The `Converter` interface consumed by the job executor
//! - Metadata probing and size estimation via `yt-dlp -J`
//! - Downloads with live progress parsed from yt-dlp output
//! - FFmpeg conversion presets for video and audio-only formats
//! - Failure classification into machine-readable reason codes

pub mod convert;
pub mod converter;
pub mod download;
pub mod error;
pub mod paths;
pub mod probe;
pub mod progress;
pub mod retry;

pub use convert::{check_tools, convert_any, output_path_for};
pub use converter::{
    ConversionEvent, ConvertedFile, Converter, ConverterConfig, EventSink, YtDlpConverter,
};
pub use download::download_video;
pub use error::{MediaError, MediaResult};
pub use paths::{guess_mimetype, safe_filename};
pub use probe::{check_size_or_fail, ensure_size_within_limit, probe};
pub use progress::{download_progress_percent, parse_progress_line, DownloadProgress};
pub use retry::RetryConfig;
