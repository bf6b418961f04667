//! Job records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{MediaMeta, OutputFormat, Quality};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What the user asked for. Captured at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub url: String,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl ConversionRequest {
    pub fn new(url: impl Into<String>, format: OutputFormat, quality: Quality) -> Self {
        Self {
            url: url.into(),
            format,
            quality,
        }
    }
}

/// Lifecycle state of a job.
///
/// Each variant carries exactly the fields valid for it: only `Done` has a
/// filename and only `Error` has an error message and reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for a worker
    #[default]
    Queued,
    /// The converter accepted the work
    Running,
    /// Artifact produced and registered
    Done { filename: String },
    /// Converter reported a final failure
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done { .. } => "done",
            JobState::Error { .. } => "error",
        }
    }

    /// Check if this is a terminal state (no more updates accepted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done { .. } | JobState::Error { .. })
    }

    pub fn error(error: impl Into<String>, reason: Option<String>) -> Self {
        JobState::Error {
            error: error.into(),
            reason,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked unit of conversion work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MediaMeta>,
    pub request: ConversionRequest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a queued job.
    pub fn new(id: JobId, request: ConversionRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: JobState::Queued,
            progress: 0,
            message: "Queued".to_string(),
            meta: None,
            request,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Filename of the produced artifact, set only when done.
    pub fn filename(&self) -> Option<&str> {
        match &self.state {
            JobState::Done { filename } => Some(filename),
            _ => None,
        }
    }

    /// Merge a partial update into the record.
    ///
    /// Returns `false` without touching anything when the job is already
    /// terminal. Progress never goes backwards and a running job is never
    /// moved back to queued.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.is_terminal() {
            return false;
        }

        if let Some(state) = patch.state {
            let rewinds = state == JobState::Queued && self.state != JobState::Queued;
            if !rewinds {
                self.state = state;
            }
        }
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(meta) = patch.meta {
            self.meta = Some(meta);
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Field-level partial update of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MediaMeta>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn meta(mut self, meta: MediaMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Stage change: running with a new message and progress floor.
    pub fn stage(message: impl Into<String>, progress: u8) -> Self {
        Self::new()
            .state(JobState::Running)
            .message(message)
            .progress(progress)
    }

    /// Terminal success.
    pub fn done(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new()
            .state(JobState::Done {
                filename: filename.into(),
            })
            .message(message)
            .progress(100)
    }

    /// Terminal failure. The error text doubles as the message.
    pub fn failed(error: impl Into<String>, reason: Option<String>) -> Self {
        let error = error.into();
        Self::new()
            .message(error.clone())
            .state(JobState::error(error, reason))
    }
}
