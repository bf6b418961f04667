//! Output sink for poll loop updates.

use std::io::Write;

use vbot_models::MediaMeta;

use crate::error::ClientError;

/// Receives every user-visible update from a poll loop.
pub trait Renderer: Send + Sync {
    fn progress(&self, progress: u8, message: &str);

    fn meta(&self, meta: &MediaMeta);

    /// The job finished; `link` downloads the file.
    fn done(&self, link: &str);

    /// The job failed on the server.
    fn failed(&self, message: &str);

    /// Polling stopped because the status could not be fetched.
    fn transport_error(&self, error: &ClientError);
}

/// Format a job failure for display.
pub fn failure_message(error: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{} ({})", error, reason),
        _ => error.to_string(),
    }
}

/// Renders to stdout, one line per update.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
    }
}

impl Renderer for TerminalRenderer {
    fn progress(&self, progress: u8, message: &str) {
        self.line(&format!("[{:>3}%] {}", progress, message));
    }

    fn meta(&self, meta: &MediaMeta) {
        let mut parts = Vec::new();
        if let Some(title) = &meta.title {
            parts.push(title.clone());
        }
        if let Some(duration) = meta.duration_label() {
            parts.push(duration);
        }
        if let Some(size) = meta.estimated_size_mb {
            parts.push(format!("~{:.1} MB", size));
        }
        if !parts.is_empty() {
            self.line(&parts.join(" | "));
        }
    }

    fn done(&self, link: &str) {
        self.line(&format!("Done: {}", link));
    }

    fn failed(&self, message: &str) {
        self.line(&format!("Error: {}", message));
    }

    fn transport_error(&self, error: &ClientError) {
        self.line(&format!("Network error: {}", error));
    }
}
