//! Structured job logging.

use tracing::{error, info, info_span, warn, Span};
use vbot_models::{ConversionRequest, JobId};

/// Job-scoped logger; every event carries `job_id` and `format`.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    format: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, request: &ConversionRequest) -> Self {
        Self {
            job_id: job_id.to_string(),
            format: request.format.as_str(),
        }
    }

    pub fn started(&self, request: &ConversionRequest) {
        info!(
            job_id = %self.job_id,
            format = self.format,
            quality = %request.quality,
            url = %request.url,
            "Conversion started"
        );
    }

    pub fn stage(&self, message: &str, progress: u8) {
        info!(job_id = %self.job_id, progress, "{}", message);
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, format = self.format, "{}", message);
    }

    pub fn failed(&self, reason: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            format = self.format,
            reason,
            "Conversion failed: {}", message
        );
    }

    pub fn completed(&self, filename: &str) {
        info!(
            job_id = %self.job_id,
            format = self.format,
            filename,
            "Conversion completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping the whole pipeline of one job.
    pub fn span(&self) -> Span {
        info_span!("job", job_id = %self.job_id, format = self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbot_models::{OutputFormat, Quality};

    #[test]
    fn test_logger_carries_job_id() {
        let request = ConversionRequest::new("https://youtu.be/x", OutputFormat::Mp3, Quality::Auto);
        let logger = JobLogger::new(&JobId::from("abc"), &request);
        assert_eq!(logger.job_id(), "abc");
        logger.stage("Downloading media", 15);
    }
}
