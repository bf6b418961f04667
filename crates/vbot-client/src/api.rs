//! HTTP client for the conversion API.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use vbot_models::{DeleteFileResponse, ErrorBody, JobId, StatusPayload, SubmitResponse};

use crate::error::{ClientError, ClientResult};

/// Client bound to one API server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8000`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: &str) -> ClientResult<Self> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a conversion; returns the new job id.
    pub async fn submit(&self, url: &str, format: &str, quality: &str) -> ClientResult<JobId> {
        let response = self
            .http
            .post(format!("{}/api/download", self.base_url))
            .query(&[("url", url), ("format", format), ("quality", quality)])
            .send()
            .await?;

        let body: SubmitResponse = Self::parse_response(response).await?;
        debug!(job_id = %body.job_id, "Submitted job");
        Ok(body.job_id)
    }

    /// Fetch one status snapshot.
    pub async fn status(&self, job_id: &JobId) -> ClientResult<StatusPayload> {
        let response = self
            .http
            .get(format!("{}/api/status/{}", self.base_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download link of a finished job.
    pub fn file_url(&self, job_id: &JobId) -> String {
        format!("{}/api/file/{}", self.base_url, job_id)
    }

    /// Stream a finished job's file to `dest`. Returns the bytes written.
    pub async fn download_file(&self, job_id: &JobId, dest: &Path) -> ClientResult<u64> {
        let mut response = Self::ensure_success(self.http.get(self.file_url(job_id)).send().await?).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Delete a finished job's file from the server.
    pub async fn delete_file(&self, job_id: &JobId) -> ClientResult<bool> {
        let response = self.http.delete(self.file_url(job_id)).send().await?;
        let body: DeleteFileResponse = Self::parse_response(response).await?;
        Ok(body.ok)
    }

    async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.detail)
            .unwrap_or(text);
        Err(ClientError::status(status.as_u16(), detail))
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.file_url(&JobId::from("abc")),
            "http://localhost:8000/api/file/abc"
        );
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_submit_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .and(query_param("url", "https://youtu.be/x"))
            .and(query_param("format", "mp3"))
            .and(query_param("quality", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "j1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let id = client.submit("https://youtu.be/x", "mp3", "auto").await.unwrap();
        assert_eq!(id, JobId::from("j1"));
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "Link from an unsupported domain"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let err = client.submit("https://vimeo.com/1", "mp4", "720p").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status: 400, ref detail } if detail == "Link from an unsupported domain"
        ));
    }

    #[tokio::test]
    async fn test_download_file_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp4");
        let client = ApiClient::new(&server.uri()).unwrap();
        let written = client.download_file(&JobId::from("abc"), &dest).await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"media");
    }
}
