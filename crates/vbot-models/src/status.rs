//! Wire status payload served to polling clients.

use serde::{Deserialize, Serialize};

use crate::{Job, JobState, MediaMeta};

/// Snapshot of a job as returned by the status endpoint.
///
/// Tagged by `status`; only the `done` variant carries a filename and only
/// the `error` variant carries the error and reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusPayload {
    Queued {
        progress: u8,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<MediaMeta>,
    },
    Running {
        progress: u8,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<MediaMeta>,
    },
    Done {
        progress: u8,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<MediaMeta>,
        filename: String,
    },
    Error {
        #[serde(default)]
        progress: u8,
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<MediaMeta>,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl StatusPayload {
    pub fn progress(&self) -> u8 {
        match self {
            StatusPayload::Queued { progress, .. }
            | StatusPayload::Running { progress, .. }
            | StatusPayload::Done { progress, .. }
            | StatusPayload::Error { progress, .. } => *progress,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StatusPayload::Queued { message, .. }
            | StatusPayload::Running { message, .. }
            | StatusPayload::Done { message, .. }
            | StatusPayload::Error { message, .. } => message,
        }
    }

    pub fn meta(&self) -> Option<&MediaMeta> {
        match self {
            StatusPayload::Queued { meta, .. }
            | StatusPayload::Running { meta, .. }
            | StatusPayload::Done { meta, .. }
            | StatusPayload::Error { meta, .. } => meta.as_ref(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            StatusPayload::Queued { .. } => "queued",
            StatusPayload::Running { .. } => "running",
            StatusPayload::Done { .. } => "done",
            StatusPayload::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusPayload::Done { .. } | StatusPayload::Error { .. })
    }
}

impl From<&Job> for StatusPayload {
    fn from(job: &Job) -> Self {
        let progress = job.progress;
        let message = job.message.clone();
        let meta = job.meta.clone();

        match &job.state {
            JobState::Queued => StatusPayload::Queued {
                progress,
                message,
                meta,
            },
            JobState::Running => StatusPayload::Running {
                progress,
                message,
                meta,
            },
            JobState::Done { filename } => StatusPayload::Done {
                progress,
                message,
                meta,
                filename: filename.clone(),
            },
            JobState::Error { error, reason } => StatusPayload::Error {
                progress,
                message,
                meta,
                error: error.clone(),
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConversionRequest, JobId, JobPatch, OutputFormat, Quality};

    fn job() -> Job {
        Job::new(
            JobId::from("abc"),
            ConversionRequest::new("https://x/video", OutputFormat::Mp4, Quality::P720),
        )
    }

    #[test]
    fn test_snapshot_mirrors_job_fields() {
        let mut job = job();
        job.apply(JobPatch::stage("Downloading media", 40).meta(MediaMeta {
            title: Some("Sample".into()),
            duration: Some(120.0),
            ..Default::default()
        }));

        let payload = StatusPayload::from(&job);
        assert_eq!(payload.status(), "running");
        assert_eq!(payload.progress(), 40);
        assert_eq!(payload.message(), "Downloading media");
        assert_eq!(payload.meta().and_then(|m| m.title.as_deref()), Some("Sample"));
    }

    #[test]
    fn test_done_payload_carries_filename_only_when_done() {
        let mut job = job();
        let running = serde_json::to_value(StatusPayload::from(&job)).unwrap();
        assert!(running.get("filename").is_none());

        job.apply(JobPatch::done("video.mp4", "File is ready to download"));
        let done = serde_json::to_value(StatusPayload::from(&job)).unwrap();
        assert_eq!(done["status"], "done");
        assert_eq!(done["progress"], 100);
        assert_eq!(done["filename"], "video.mp4");
        assert!(done.get("error").is_none());
    }

    #[test]
    fn test_parses_sparse_payloads() {
        let running: StatusPayload =
            serde_json::from_str(r#"{"status":"running","progress":40}"#).unwrap();
        assert_eq!(running.progress(), 40);
        assert_eq!(running.message(), "");

        let error: StatusPayload = serde_json::from_str(
            r#"{"status":"error","error":"Video unavailable","reason":"age_restricted"}"#,
        )
        .unwrap();
        assert!(matches!(
            error,
            StatusPayload::Error { ref error, reason: Some(ref r), .. }
                if error == "Video unavailable" && r == "age_restricted"
        ));
        assert!(error.is_terminal());
    }
}
