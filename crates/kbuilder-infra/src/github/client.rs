//! GithubDispatchClient -- concrete [`DispatchClient`] for GitHub Actions.
//!
//! Sends one `workflow_dispatch` event per call. GitHub answers `204 No
//! Content` without a run id, so the tracking reference is the workflow's
//! Actions page, optionally upgraded to the newest run's URL.
//!
//! The token is wrapped in [`secrecy::SecretString`] and only exposed when
//! building the `Authorization` header.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;

use kbuilder_core::dispatch::DispatchClient;
use kbuilder_types::build::BuildConfiguration;
use kbuilder_types::config::GithubConfig;
use kbuilder_types::dispatch::TrackingRef;
use kbuilder_types::error::DispatchError;

use super::types::{GithubErrorBody, WorkflowDispatchRequest, WorkflowRunsResponse};

/// GitHub workflow-dispatch client.
///
/// Does not derive Debug; the config it holds carries the API token.
pub struct GithubDispatchClient {
    client: reqwest::Client,
    config: GithubConfig,
}

impl GithubDispatchClient {
    /// REST API version pinned in every request.
    const API_VERSION: &'static str = "2022-11-28";

    const ACCEPT: &'static str = "application/vnd.github+json";

    /// Create a client for the workflow described by `config`.
    ///
    /// `request_timeout` bounds each HTTP request; the wizard applies its own
    /// overall dispatch timeout on top.
    pub fn new(config: GithubConfig, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("kbuilder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    fn workflow_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/actions/workflows/{}/{suffix}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.workflow
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.config.token.expose_secret())
            .header("Accept", Self::ACCEPT)
            .header("X-GitHub-Api-Version", Self::API_VERSION)
    }

    /// Best-effort lookup of the newest `workflow_dispatch` run.
    ///
    /// Any failure yields `None`; the dispatch itself already succeeded.
    async fn latest_run_url(&self) -> Option<String> {
        let response = self
            .authorized(self.client.get(self.workflow_url("runs")))
            .query(&[("event", "workflow_dispatch"), ("per_page", "1")])
            .send()
            .await
            .map_err(|e| tracing::debug!(error = %e, "workflow run lookup failed"))
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "workflow run lookup rejected");
            return None;
        }

        let runs: WorkflowRunsResponse = response
            .json()
            .await
            .map_err(|e| tracing::debug!(error = %e, "workflow run listing unreadable"))
            .ok()?;

        runs.workflow_runs.into_iter().next().map(|run| {
            tracing::debug!(run_id = run.id, "resolved workflow run");
            run.html_url
        })
    }
}

/// Map a non-2xx dispatch response to a [`DispatchError`].
async fn error_from_response(response: Response) -> DispatchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<GithubErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DispatchError::Unauthorized(detail),
        StatusCode::NOT_FOUND => DispatchError::WorkflowNotFound(detail),
        StatusCode::UNPROCESSABLE_ENTITY => DispatchError::InvalidInput(detail),
        _ => DispatchError::Transient(format!("HTTP {status}: {detail}")),
    }
}

impl DispatchClient for GithubDispatchClient {
    async fn dispatch(&self, config: &BuildConfiguration) -> Result<TrackingRef, DispatchError> {
        let body = WorkflowDispatchRequest::new(&self.config.git_ref, config);

        let response = self
            .authorized(self.client.post(self.workflow_url("dispatches")))
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Transient(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        tracing::debug!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            workflow = %self.config.workflow,
            "workflow dispatch accepted"
        );

        let url = if self.config.resolve_run_url {
            self.latest_run_url().await
        } else {
            None
        };

        Ok(TrackingRef(
            url.unwrap_or_else(|| self.config.workflow_page_url()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbuilder_types::build::KsuMode;
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DISPATCH_PATH: &str = "/repos/acme/kernels/actions/workflows/build.yml/dispatches";
    const RUNS_PATH: &str = "/repos/acme/kernels/actions/workflows/build.yml/runs";

    fn github_config(api_url: &str) -> GithubConfig {
        GithubConfig {
            token: SecretString::from("ghp_test".to_string()),
            owner: "acme".to_string(),
            repo: "kernels".to_string(),
            workflow: "build.yml".to_string(),
            git_ref: "main".to_string(),
            api_url: api_url.to_string(),
            web_url: "https://github.com".to_string(),
            resolve_run_url: false,
        }
    }

    fn client(config: GithubConfig) -> GithubDispatchClient {
        GithubDispatchClient::new(config, Duration::from_secs(5)).unwrap()
    }

    fn build_config() -> BuildConfiguration {
        BuildConfiguration {
            compiler: "Clang-20".to_string(),
            kernel_repository_url: "https://example.com/k.git".to_string(),
            kernel_branch: "main".to_string(),
            container_image: "fedora:40".to_string(),
            notes: String::new(),
            kernel_su_mode: KsuMode::None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_sends_payload_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DISPATCH_PATH))
            .and(header("authorization", "Bearer ghp_test"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", "2022-11-28"))
            .and(body_json(serde_json::json!({
                "ref": "main",
                "inputs": {
                    "compiler": "Clang-20",
                    "krepo": "https://example.com/k.git",
                    "kbranch": "main",
                    "container": "fedora:40",
                    "notes": "",
                    "ksu": ""
                }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let tracking = client(github_config(&server.uri()))
            .dispatch(&build_config())
            .await
            .unwrap();

        assert_eq!(
            tracking.url(),
            "https://github.com/acme/kernels/actions/workflows/build.yml"
        );
    }

    async fn dispatch_with_status(status: u16, body: &str) -> DispatchError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DISPATCH_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        client(github_config(&server.uri()))
            .dispatch(&build_config())
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_unauthorized_statuses() {
        let err = dispatch_with_status(401, r#"{"message":"Bad credentials"}"#).await;
        assert_eq!(err, DispatchError::Unauthorized("Bad credentials".to_string()));

        let err = dispatch_with_status(403, r#"{"message":"Resource not accessible"}"#).await;
        assert!(matches!(err, DispatchError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_workflow_not_found() {
        let err = dispatch_with_status(404, r#"{"message":"Not Found"}"#).await;
        assert_eq!(err, DispatchError::WorkflowNotFound("Not Found".to_string()));
    }

    #[tokio::test]
    async fn test_unprocessable_maps_to_invalid_input() {
        let err = dispatch_with_status(422, r#"{"message":"Unexpected inputs provided"}"#).await;
        assert_eq!(
            err,
            DispatchError::InvalidInput("Unexpected inputs provided".to_string())
        );
    }

    #[tokio::test]
    async fn test_other_status_is_transient() {
        let err = dispatch_with_status(502, "bad gateway").await;
        assert!(err.is_transient());
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_network_failure_is_transient() {
        // Nothing listens on the discard port.
        let err = client(github_config("http://127.0.0.1:9"))
            .dispatch(&build_config())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_resolve_run_url_uses_latest_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DISPATCH_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .and(query_param("event", "workflow_dispatch"))
            .and(query_param("per_page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "workflow_runs": [
                    { "id": 42, "html_url": "https://github.com/acme/kernels/actions/runs/42" }
                ]
            })))
            .mount(&server)
            .await;

        let mut config = github_config(&server.uri());
        config.resolve_run_url = true;

        let tracking = client(config).dispatch(&build_config()).await.unwrap();
        assert_eq!(
            tracking.url(),
            "https://github.com/acme/kernels/actions/runs/42"
        );
    }

    #[tokio::test]
    async fn test_failed_run_lookup_falls_back_to_workflow_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DISPATCH_PATH))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(RUNS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = github_config(&server.uri());
        config.resolve_run_url = true;

        let tracking = client(config).dispatch(&build_config()).await.unwrap();
        assert_eq!(
            tracking.url(),
            "https://github.com/acme/kernels/actions/workflows/build.yml"
        );
    }
}
