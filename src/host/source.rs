use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use url::Url;

use super::HostSnapshot;
use crate::error::{PipelensError, Result};

const MAX_RETRIES: u32 = 5;
const RETRY_DELAY_SECONDS: u64 = 2;

/// HTTP client for snapshot exports published by a CI server.
pub struct SnapshotClient {
    client: Client,
    url: Url,
    token: Option<String>,
    retry_delay: Duration,
}

impl SnapshotClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `url` is not a valid URL.
    pub fn new(url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipelens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let url = Url::parse(url)
            .map_err(|e| PipelensError::Config(format!("Invalid snapshot URL: {e}")))?;

        Ok(Self {
            client,
            url,
            token,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token)
        } else {
            request
        }
    }

    /// Fetches the snapshot, retrying on network errors, rate limits and server errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the server keeps failing after all retries, answers with a
    /// non-retryable status, or the body is not a valid snapshot document.
    pub async fn fetch(&self) -> Result<HostSnapshot> {
        let mut retry_count = 0;
        loop {
            let request = self.auth_request(self.client.get(self.url.clone()));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {:?} ({}/{MAX_RETRIES})...",
                        self.retry_delay,
                        retry_count + 1
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(PipelensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }

                warn!(
                    "Snapshot endpoint error (status {status}). Retrying in {:?} ({}/{MAX_RETRIES})...",
                    self.retry_delay,
                    retry_count + 1
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(PipelensError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            let body = response.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
    }
}

/// Loads a host snapshot from an `http(s)://` URL or a local file.
///
/// Local files are parsed according to their extension (`json`, `yaml`/`yml`, `toml`); files
/// with any other extension are tried as JSON, then YAML, then TOML.
///
/// # Errors
///
/// Returns an error if the source cannot be read or fetched, or does not parse.
pub async fn load_snapshot(source: &str, token: Option<String>) -> Result<HostSnapshot> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching host snapshot from {source}");
        return SnapshotClient::new(source, token)?.fetch().await;
    }

    let path = Path::new(source);
    debug!("Reading host snapshot from {}", path.display());
    let contents = tokio::fs::read_to_string(path).await?;

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    let snapshot = match extension {
        "json" => serde_json::from_str(&contents)?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)?,
        "toml" => toml::from_str(&contents)?,
        _ => match serde_json::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(_) => match serde_yaml::from_str(&contents) {
                Ok(snapshot) => snapshot,
                Err(_) => toml::from_str(&contents)?,
            },
        },
    };

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT_JSON: &str = r#"{
        "jobs": [{"name": "build"}, {"name": "test", "upstream": ["build"]}],
        "builds": [
            {"job": "build", "number": 1, "state": "completed", "result": "SUCCESS"},
            {"job": "test", "state": "queued", "queue-id": 3,
             "causes": [{"type": "upstream", "job": "build", "number": 1}]}
        ]
    }"#;

    #[test]
    fn test_load_json_file() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{SNAPSHOT_JSON}").unwrap();
        let source = temp_file.path().to_string_lossy().to_string();

        let snapshot = tokio_test::block_on(load_snapshot(&source, None)).unwrap();

        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(snapshot.builds.len(), 2);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml = r"
jobs:
  - name: build
  - name: deploy
    manual-upstream: [build]
builds:
  - job: build
    number: 7
    state: in-progress
";
        write!(temp_file, "{yaml}").unwrap();
        let source = temp_file.path().to_string_lossy().to_string();

        let snapshot = tokio_test::block_on(load_snapshot(&source, None)).unwrap();

        assert_eq!(snapshot.jobs[1].manual_upstream, vec!["build"]);
        assert!(snapshot.builds[0].is_in_progress());
    }

    #[test]
    fn test_load_missing_file() {
        let result = tokio_test::block_on(load_snapshot("does-not-exist.json", None));
        assert!(matches!(result, Err(PipelensError::Io(_))));
    }

    #[tokio::test]
    async fn test_fetch_over_http_with_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/snapshot.json")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SNAPSHOT_JSON)
            .create_async()
            .await;

        let url = format!("{}/snapshot.json", server.url());
        let snapshot = load_snapshot(&url, Some("secret".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.jobs[0].name, "build");
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/snapshot.json")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/snapshot.json")
            .with_status(200)
            .with_body(SNAPSHOT_JSON)
            .create_async()
            .await;

        let client = SnapshotClient::new(&format!("{}/snapshot.json", server.url()), None)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1));
        let snapshot = client.fetch().await.unwrap();

        failing.assert_async().await;
        succeeding.assert_async().await;
        assert_eq!(snapshot.builds.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/snapshot.json")
            .with_status(404)
            .with_body("not found")
            .expect(1)
            .create_async()
            .await;

        let client = SnapshotClient::new(&format!("{}/snapshot.json", server.url()), None)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1));
        let result = client.fetch().await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(PipelensError::ApiError { status: 404, .. })
        ));
    }
}
