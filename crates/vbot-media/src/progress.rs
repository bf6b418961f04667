//! yt-dlp download progress parsing.
//!
//! yt-dlp is run with `--newline` and a custom `--progress-template` so
//! each progress update arrives as one machine-readable stdout line:
//!
//! ```text
//! vbot-progress <downloaded_bytes> <total_bytes> <total_bytes_estimate>
//! ```
//!
//! Unknown values are printed by yt-dlp as `NA`.

/// Prefix marking a progress line.
pub const PROGRESS_PREFIX: &str = "vbot-progress";

/// Value for yt-dlp's `--progress-template` flag.
pub const PROGRESS_TEMPLATE: &str = "download:vbot-progress %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// One progress update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub downloaded_bytes: u64,
    /// Exact total, or yt-dlp's estimate when the exact size is unknown.
    pub total_bytes: Option<u64>,
}

/// Parse a progress line. Returns `None` for any other output.
pub fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();

    let downloaded_bytes = parse_bytes(fields.next()?)?;
    let total = fields.next().and_then(parse_bytes);
    let estimate = fields.next().and_then(parse_bytes);

    Some(DownloadProgress {
        downloaded_bytes,
        total_bytes: total.or(estimate).filter(|t| *t > 0),
    })
}

fn parse_bytes(field: &str) -> Option<u64> {
    if field.eq_ignore_ascii_case("na") || field.eq_ignore_ascii_case("none") {
        return None;
    }
    let value: f64 = field.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value as u64)
    } else {
        None
    }
}

/// Map download progress onto the job's 20..=90 download band.
///
/// Returns `None` when the total size is unknown.
pub fn download_progress_percent(progress: &DownloadProgress) -> Option<u8> {
    let total = progress.total_bytes?;
    let ratio = progress.downloaded_bytes as f64 / total as f64;
    let percent = (15.0 + ratio * 70.0) as i64;
    Some(percent.clamp(20, 90) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        let p = parse_progress_line("vbot-progress 1024 4096 NA").unwrap();
        assert_eq!(p.downloaded_bytes, 1024);
        assert_eq!(p.total_bytes, Some(4096));

        let p = parse_progress_line("vbot-progress 10 NA 2048.5").unwrap();
        assert_eq!(p.total_bytes, Some(2048));

        let p = parse_progress_line("  vbot-progress 10 NA NA  ").unwrap();
        assert_eq!(p.total_bytes, None);
    }

    #[test]
    fn test_ignores_other_output() {
        assert!(parse_progress_line("[youtube] abc: Downloading webpage").is_none());
        assert!(parse_progress_line("/tmp/x/video.mp4").is_none());
        assert!(parse_progress_line("vbot-progress NA NA NA").is_none());
    }

    #[test]
    fn test_percent_band() {
        let at = |done, total| {
            download_progress_percent(&DownloadProgress {
                downloaded_bytes: done,
                total_bytes: Some(total),
            })
        };
        assert_eq!(at(0, 100), Some(20));
        assert_eq!(at(50, 100), Some(50));
        assert_eq!(at(100, 100), Some(85));
        assert_eq!(at(500, 100), Some(90));

        let unknown = DownloadProgress {
            downloaded_bytes: 5,
            total_bytes: None,
        };
        assert_eq!(download_progress_percent(&unknown), None);
    }
}
