//! Output formats and quality presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Quality used when the client asks for `auto`.
pub const DEFAULT_QUALITY: Quality = Quality::P720;

/// Requested output container or audio-only variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Mkv,
    Mp3,
    M4a,
    Ogg,
    /// Keep whatever container the source was downloaded in
    Source,
}

impl OutputFormat {
    /// All supported formats.
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Mp4,
        OutputFormat::Webm,
        OutputFormat::Mkv,
        OutputFormat::Mp3,
        OutputFormat::M4a,
        OutputFormat::Ogg,
        OutputFormat::Source,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Ogg => "ogg",
            OutputFormat::Source => "source",
        }
    }

    /// Audio-only variants ignore the quality selector.
    pub fn is_audio(&self) -> bool {
        matches!(self, OutputFormat::Mp3 | OutputFormat::M4a | OutputFormat::Ogg)
    }

    pub fn is_video(&self) -> bool {
        matches!(self, OutputFormat::Mp4 | OutputFormat::Webm | OutputFormat::Mkv)
    }

    /// File extension produced by a conversion, `None` for [`OutputFormat::Source`].
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Source => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or(ModelError::UnsupportedFormat(lowered))
    }
}

/// Requested video quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1024p")]
    P1024,
    #[serde(rename = "1080p")]
    P1080,
    /// Sentinel used for audio-only formats
    #[serde(rename = "auto")]
    Auto,
}

impl Default for Quality {
    fn default() -> Self {
        DEFAULT_QUALITY
    }
}

impl Quality {
    /// Concrete presets, excluding `auto`.
    pub const PRESETS: [Quality; 5] = [
        Quality::P360,
        Quality::P480,
        Quality::P720,
        Quality::P1024,
        Quality::P1080,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::P360 => "360p",
            Quality::P480 => "480p",
            Quality::P720 => "720p",
            Quality::P1024 => "1024p",
            Quality::P1080 => "1080p",
            Quality::Auto => "auto",
        }
    }

    /// Normalize `auto` to the default preset.
    pub fn resolve(self) -> Quality {
        match self {
            Quality::Auto => DEFAULT_QUALITY,
            other => other,
        }
    }

    /// Target frame height in pixels.
    pub fn height(&self) -> u32 {
        match self.resolve() {
            Quality::P360 => 360,
            Quality::P480 => 480,
            Quality::P1024 => 1024,
            Quality::P1080 => 1080,
            _ => 720,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value == "auto" {
            return Ok(Quality::Auto);
        }
        Quality::PRESETS
            .into_iter()
            .find(|q| q.as_str() == value)
            .ok_or_else(|| ModelError::UnsupportedQuality {
                value: value.to_string(),
                allowed: Quality::PRESETS.iter().map(|q| q.as_str()).collect(),
            })
    }
}
