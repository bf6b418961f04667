//! Format and quality selection rules.

use vbot_models::{OutputFormat, Quality, DEFAULT_QUALITY};

/// Current format/quality choice of the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSelection {
    format: OutputFormat,
    quality: Quality,
}

impl Default for FormSelection {
    fn default() -> Self {
        Self::new(OutputFormat::Mp4, DEFAULT_QUALITY)
    }
}

impl FormSelection {
    pub fn new(format: OutputFormat, quality: Quality) -> Self {
        let mut selection = Self {
            format: OutputFormat::Mp4,
            quality,
        };
        selection.select_format(format);
        selection
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Audio-only formats have no quality choice.
    pub fn quality_enabled(&self) -> bool {
        !self.format.is_audio()
    }

    /// Switching to audio forces `auto`; switching back from `auto`
    /// restores the default preset, any other quality is kept.
    pub fn select_format(&mut self, format: OutputFormat) {
        self.format = format;
        if format.is_audio() {
            self.quality = Quality::Auto;
        } else if self.quality == Quality::Auto {
            self.quality = DEFAULT_QUALITY;
        }
    }

    /// Ignored while the selector is disabled.
    pub fn select_quality(&mut self, quality: Quality) {
        if self.quality_enabled() {
            self.quality = quality.resolve();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_forces_auto_and_disables_quality() {
        let mut form = FormSelection::new(OutputFormat::Mp4, Quality::P1080);
        form.select_format(OutputFormat::Mp3);
        assert_eq!(form.quality(), Quality::Auto);
        assert!(!form.quality_enabled());

        form.select_quality(Quality::P480);
        assert_eq!(form.quality(), Quality::Auto);
    }

    #[test]
    fn test_leaving_audio_resets_to_default() {
        let mut form = FormSelection::new(OutputFormat::M4a, Quality::P1080);
        assert_eq!(form.quality(), Quality::Auto);
        form.select_format(OutputFormat::Webm);
        assert_eq!(form.quality(), Quality::P720);
    }

    #[test]
    fn test_video_to_video_keeps_quality() {
        let mut form = FormSelection::new(OutputFormat::Mp4, Quality::P360);
        form.select_format(OutputFormat::Mkv);
        assert_eq!(form.quality(), Quality::P360);
        assert!(form.quality_enabled());
    }
}
