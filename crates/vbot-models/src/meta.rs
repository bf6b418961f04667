//! Metadata extracted from the source media.

use serde::{Deserialize, Serialize};

/// Metadata reported by the converter while probing the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_size_mb: Option<f64>,
}

impl MediaMeta {
    /// Duration formatted as `H:MM:SS` or `M:SS`.
    pub fn duration_label(&self) -> Option<String> {
        let total = self.duration?.max(0.0).round() as u64;
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        Some(if h > 0 {
            format!("{}:{:02}:{:02}", h, m, s)
        } else {
            format!("{}:{:02}", m, s)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_label() {
        let meta = MediaMeta {
            duration: Some(125.0),
            ..Default::default()
        };
        assert_eq!(meta.duration_label().as_deref(), Some("2:05"));

        let long = MediaMeta {
            duration: Some(3725.4),
            ..Default::default()
        };
        assert_eq!(long.duration_label().as_deref(), Some("1:02:05"));
        assert_eq!(MediaMeta::default().duration_label(), None);
    }
}
