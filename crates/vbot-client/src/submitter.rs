//! Submission flow owning the active poll loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use vbot_models::{validate_url, JobId, DEFAULT_ALLOWED_DOMAINS};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::form::FormSelection;
use crate::last_url::LastUrlStore;
use crate::marker::PollMarker;
use crate::poll::{poll_job, PollConfig, PollOutcome};
use crate::render::Renderer;

/// Reported when the poll loop panicked instead of finishing.
pub const POLL_PANIC_MESSAGE: &str = "Internal error while checking the job status";

/// A submitted job and its running poll loop.
pub struct Submission {
    pub job_id: JobId,
    pub marker: PollMarker,
    task: JoinHandle<PollOutcome>,
}

impl Submission {
    /// Wait for the poll loop to end.
    pub async fn outcome(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                error!(job_id = %self.job_id, "Poll loop panicked");
                PollOutcome::Failed {
                    message: POLL_PANIC_MESSAGE.to_string(),
                }
            }
            Err(_) => PollOutcome::Cancelled,
        }
    }
}

/// Submits jobs and keeps at most one poll loop rendering.
///
/// Each new submission cancels the previous marker, and waits out any render
/// of the previous loop in progress, before anything is sent.
pub struct Submitter {
    client: ApiClient,
    renderer: Arc<dyn Renderer>,
    config: PollConfig,
    allowed_domains: Vec<String>,
    last_url: Option<LastUrlStore>,
    active: Option<PollMarker>,
}

impl Submitter {
    pub fn new(client: ApiClient, renderer: Arc<dyn Renderer>, config: PollConfig) -> Self {
        Self {
            client,
            renderer,
            config,
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            last_url: None,
            active: None,
        }
    }

    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    pub fn with_last_url_store(mut self, store: LastUrlStore) -> Self {
        self.last_url = Some(store);
        self
    }

    /// Validate, submit, and start polling `url`.
    pub async fn submit(&mut self, url: &str, form: FormSelection) -> ClientResult<Submission> {
        let url = url.trim();
        validate_url(url, &self.allowed_domains)?;

        if let Some(store) = &self.last_url {
            if let Err(e) = store.save(url).await {
                warn!("Failed to remember URL: {}", e);
            }
        }

        if let Some(previous) = self.active.take() {
            previous.supersede().await;
        }
        let marker = PollMarker::new();
        self.active = Some(marker.clone());

        let job_id = self
            .client
            .submit(url, form.format().as_str(), form.quality().as_str())
            .await?;
        info!(job_id = %job_id, "Polling job");

        let task = {
            let client = self.client.clone();
            let renderer = Arc::clone(&self.renderer);
            let config = self.config.clone();
            let marker = marker.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move {
                poll_job(&client, &job_id, &marker, renderer.as_ref(), &config).await
            })
        };

        Ok(Submission { job_id, marker, task })
    }

    /// Stop the active poll loop, if any.
    pub fn cancel(&mut self) {
        if let Some(marker) = self.active.take() {
            marker.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ClientError;
    use crate::poll::tests::RecordingRenderer;
    use vbot_models::{OutputFormat, Quality};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast() -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(10),
        }
    }

    async fn mock_submit(server: &MockServer, job_id: &str) {
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": job_id})))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_new_submission_supersedes_previous_loop() {
        let server = MockServer::start().await;
        mock_submit(&server, "first").await;
        mock_submit(&server, "second").await;
        Mock::given(method("GET"))
            .and(path("/api/status/first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "done", "progress": 100, "filename": "a.mp4"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status/second"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "done", "progress": 100, "filename": "b.mp4"})),
            )
            .mount(&server)
            .await;

        let renderer = Arc::new(RecordingRenderer::default());
        let client = ApiClient::new(&server.uri()).unwrap();
        let mut submitter = Submitter::new(client, renderer.clone(), fast());

        let first = submitter
            .submit("https://youtu.be/one", FormSelection::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = submitter
            .submit("https://youtu.be/two", FormSelection::default())
            .await
            .unwrap();

        assert!(first.marker.is_cancelled());
        assert_eq!(first.outcome().await, PollOutcome::Cancelled);
        assert!(matches!(second.outcome().await, PollOutcome::Done { ref link } if link.ends_with("/api/file/second")));

        let events = renderer.events();
        assert!(events.iter().all(|e| !e.contains("first")));
        assert_eq!(events.last().map(|e| e.ends_with("/api/file/second")), Some(true));
    }

    /// Blocks inside the first progress render.
    struct SlowRenderer {
        inner: RecordingRenderer,
        delay: Duration,
    }

    impl Renderer for SlowRenderer {
        fn progress(&self, progress: u8, message: &str) {
            std::thread::sleep(self.delay);
            self.inner.progress(progress, message);
        }

        fn meta(&self, meta: &vbot_models::MediaMeta) {
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

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resubmit_waits_for_render_of_previous_loop() {
        let server = MockServer::start().await;
        mock_submit(&server, "first").await;
        mock_submit(&server, "second").await;
        Mock::given(method("GET"))
            .and(path("/api/status/first"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "done", "progress": 100, "filename": "a.mp4"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status/second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "done", "progress": 100, "filename": "b.mp4"
            })))
            .mount(&server)
            .await;

        let renderer = Arc::new(SlowRenderer {
            inner: RecordingRenderer::default(),
            delay: Duration::from_millis(300),
        });
        let client = ApiClient::new(&server.uri()).unwrap();
        let mut submitter = Submitter::new(client, renderer.clone(), fast());

        let first = submitter
            .submit("https://youtu.be/one", FormSelection::default())
            .await
            .unwrap();
        // Let the first loop enter its slow progress render
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = submitter
            .submit("https://youtu.be/two", FormSelection::default())
            .await
            .unwrap();

        assert_eq!(first.outcome().await, PollOutcome::Cancelled);
        assert!(matches!(second.outcome().await, PollOutcome::Done { .. }));

        let events = renderer.inner.events();
        assert!(events.iter().all(|e| !e.contains("/api/file/first")));
        assert_eq!(events.last().map(|e| e.ends_with("/api/file/second")), Some(true));
    }

    #[tokio::test]
    async fn test_panicked_poll_loop_reports_failure() {
        let task: JoinHandle<PollOutcome> = tokio::spawn(async {
            if true {
                panic!("renderer crashed");
            }
            PollOutcome::Cancelled
        });
        let submission = Submission {
            job_id: JobId::from("abc"),
            marker: PollMarker::new(),
            task,
        };

        assert_eq!(
            submission.outcome().await,
            PollOutcome::Failed {
                message: POLL_PANIC_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_aborted_poll_loop_is_cancelled() {
        let task = tokio::spawn(std::future::pending::<PollOutcome>());
        task.abort();
        let submission = Submission {
            job_id: JobId::from("abc"),
            marker: PollMarker::new(),
            task,
        };

        assert_eq!(submission.outcome().await, PollOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let mut submitter = Submitter::new(client, Arc::new(RecordingRenderer::default()), fast());
        let err = submitter
            .submit("https://vimeo.com/1", FormSelection::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_audio_submission_sends_auto_and_remembers_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .and(query_param("format", "mp3"))
            .and(query_param("quality", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "a1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error", "error": "Video unavailable"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = LastUrlStore::new(dir.path().join("last-url"));
        let client = ApiClient::new(&server.uri()).unwrap();
        let mut submitter = Submitter::new(client, Arc::new(RecordingRenderer::default()), fast())
            .with_last_url_store(store.clone());

        let form = FormSelection::new(OutputFormat::Mp3, Quality::P1080);
        let submission = submitter.submit("https://youtu.be/x", form).await.unwrap();

        assert_eq!(
            submission.outcome().await,
            PollOutcome::Failed {
                message: "Video unavailable".to_string()
            }
        );
        assert_eq!(store.load().await.as_deref(), Some("https://youtu.be/x"));
    }
}
