//! Status poll loop for one submission.

use std::time::Duration;

use tracing::debug;

use vbot_models::{JobId, StatusPayload};

use crate::api::ApiClient;
use crate::marker::PollMarker;
use crate::render::{failure_message, Renderer};

/// Default delay between status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    /// Reads `VBOT_POLL_INTERVAL_MS`.
    pub fn from_env() -> Self {
        let poll_interval = std::env::var("VBOT_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        Self { poll_interval }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Done { link: String },
    Failed { message: String },
    /// A status fetch failed; the loop does not retry.
    TransportFailed,
    /// The marker was cancelled; nothing further was rendered.
    Cancelled,
}

/// Poll `job_id` until it finishes, the fetch fails, or `marker` is cancelled.
pub async fn poll_job(
    client: &ApiClient,
    job_id: &JobId,
    marker: &PollMarker,
    renderer: &dyn Renderer,
    config: &PollConfig,
) -> PollOutcome {
    loop {
        if marker.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let result = client.status(job_id).await;

        // Renders below run under the gate and stop as soon as the marker is
        // cancelled, including by the renderer itself.
        let gate = marker.render_gate().await;
        if marker.is_cancelled() {
            debug!(job_id = %job_id, "Discarding status of superseded poll");
            return PollOutcome::Cancelled;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                renderer.transport_error(&e);
                return PollOutcome::TransportFailed;
            }
        };

        renderer.progress(payload.progress(), payload.message());
        if let Some(meta) = payload.meta() {
            if marker.is_cancelled() {
                return PollOutcome::Cancelled;
            }
            renderer.meta(meta);
        }

        match payload {
            StatusPayload::Done { .. } => {
                if marker.is_cancelled() {
                    return PollOutcome::Cancelled;
                }
                let link = client.file_url(job_id);
                renderer.done(&link);
                return PollOutcome::Done { link };
            }
            StatusPayload::Error { error, reason, .. } => {
                if marker.is_cancelled() {
                    return PollOutcome::Cancelled;
                }
                let message = failure_message(&error, reason.as_deref());
                renderer.failed(&message);
                return PollOutcome::Failed { message };
            }
            StatusPayload::Queued { .. } | StatusPayload::Running { .. } => {}
        }
        drop(gate);

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = marker.cancelled() => return PollOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ClientError;
    use vbot_models::MediaMeta;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every render call as a line of text.
    #[derive(Default)]
    pub(crate) struct RecordingRenderer {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingRenderer {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Renderer for RecordingRenderer {
        fn progress(&self, progress: u8, message: &str) {
            self.push(format!("progress {} {}", progress, message));
        }

        fn meta(&self, meta: &MediaMeta) {
            self.push(format!("meta {}", meta.title.clone().unwrap_or_default()));
        }

        fn done(&self, link: &str) {
            self.push(format!("done {}", link));
        }

        fn failed(&self, message: &str) {
            self.push(format!("failed {}", message));
        }

        fn transport_error(&self, _error: &ClientError) {
            self.push("transport_error".to_string());
        }
    }

    fn fast() -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_running_then_done_renders_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "running",
                "progress": 40,
                "message": "Downloading media",
                "meta": {"title": "Sample"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "done",
                "progress": 100,
                "message": "File is ready to download",
                "filename": "clip.mp4"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let renderer = RecordingRenderer::default();
        let outcome = poll_job(&client, &JobId::from("abc"), &PollMarker::new(), &renderer, &fast()).await;

        let link = format!("{}/api/file/abc", server.uri());
        assert_eq!(outcome, PollOutcome::Done { link: link.clone() });
        assert_eq!(
            renderer.events(),
            vec![
                "progress 40 Downloading media".to_string(),
                "meta Sample".to_string(),
                "progress 100 File is ready to download".to_string(),
                format!("done {}", link),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_renders_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": "Video unavailable",
                "reason": "age_restricted"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let renderer = RecordingRenderer::default();
        let outcome = poll_job(&client, &JobId::from("abc"), &PollMarker::new(), &renderer, &fast()).await;

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                message: "Video unavailable (age_restricted)".to_string()
            }
        );
        assert_eq!(
            renderer.events().last().map(String::as_str),
            Some("failed Video unavailable (age_restricted)")
        );
    }

    #[tokio::test]
    async fn test_server_error_stops_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let renderer = RecordingRenderer::default();
        let outcome = poll_job(&client, &JobId::from("abc"), &PollMarker::new(), &renderer, &fast()).await;

        assert_eq!(outcome, PollOutcome::TransportFailed);
        assert_eq!(renderer.events(), vec!["transport_error".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_marker_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let marker = PollMarker::new();
        marker.cancel();
        let client = ApiClient::new(&server.uri()).unwrap();
        let renderer = RecordingRenderer::default();
        let outcome = poll_job(&client, &JobId::from("abc"), &marker, &renderer, &fast()).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert!(renderer.events().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_fetch_suppresses_stale_render() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "status": "done",
                        "progress": 100,
                        "filename": "clip.mp4"
                    }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let renderer = std::sync::Arc::new(RecordingRenderer::default());
        let marker = PollMarker::new();

        let task = {
            let (client, renderer, marker) = (client.clone(), renderer.clone(), marker.clone());
            tokio::spawn(async move {
                poll_job(&client, &JobId::from("abc"), &marker, renderer.as_ref(), &fast()).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        marker.cancel();

        assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
        assert!(renderer.events().is_empty());
    }

    /// Cancels its marker from inside the first progress callback.
    struct CancelOnProgress {
        inner: RecordingRenderer,
        marker: PollMarker,
    }

    impl Renderer for CancelOnProgress {
        fn progress(&self, progress: u8, message: &str) {
            self.inner.progress(progress, message);
            self.marker.cancel();
        }

        fn meta(&self, meta: &MediaMeta) {
            self.inner.meta(meta);
        }

        fn done(&self, link: &str) {
            self.inner.done(link);
        }

        fn failed(&self, message: &str) {
            self.inner.failed(message);
        }

        fn transport_error(&self, error: &ClientError) {
            self.inner.transport_error(error);
        }
    }

    #[tokio::test]
    async fn test_cancel_inside_render_stops_remaining_renders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "done",
                "progress": 100,
                "message": "File is ready to download",
                "filename": "clip.mp4",
                "meta": {"title": "Sample"}
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let marker = PollMarker::new();
        let renderer = CancelOnProgress {
            inner: RecordingRenderer::default(),
            marker: marker.clone(),
        };
        let outcome = poll_job(&client, &JobId::from("abc"), &marker, &renderer, &fast()).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(
            renderer.inner.events(),
            vec!["progress 100 File is ready to download".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancel_inside_error_render_stops_failure_render() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": "Video unavailable"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let marker = PollMarker::new();
        let renderer = CancelOnProgress {
            inner: RecordingRenderer::default(),
            marker: marker.clone(),
        };
        let outcome = poll_job(&client, &JobId::from("abc"), &marker, &renderer, &fast()).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert!(renderer.inner.events().iter().all(|e| !e.starts_with("failed")));
    }
}
