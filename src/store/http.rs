use super::types::{
    BatchChange, BatchChangeKind, CreateRepositoryOptions, RemoteSnapshot, RepoRef,
    RepositoryInfo,
};
use super::{ContentStore, StoreError};
use crate::utils::{decode_content, encode_content};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Tuning for the HTTP content-store client
#[derive(Debug, Clone)]
pub struct ForgeClientOptions {
    /// Per-request timeout, enforced by the transport
    pub timeout: Duration,
    /// Extra attempts for a failed request. Reads retry transport errors,
    /// 429 and 5xx; writes only retry failures to connect.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt
    pub initial_backoff: Duration,
}

impl Default for ForgeClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Which failures a request may be re-sent after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Transport errors, 429 and 5xx
    Transient,
    /// Only failures to connect; once a write reached the forge it may have
    /// landed, so it is never replayed
    ConnectOnly,
}

/// Content-store client for Gitea/Forgejo-compatible `/api/v1` endpoints
pub struct ForgeClient {
    client: Client,
    base: Url,
    token: Option<String>,
    options: ForgeClientOptions,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    full_name: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    clone_url: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ChangeFileEntry<'a> {
    operation: BatchChangeKind,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Treat the base URL as a directory so sub-path installs keep their prefix.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;

    if url.cannot_be_a_base() {
        return Err(StoreError::InvalidUrl(format!(
            "{base_url} cannot carry a path"
        )));
    }

    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }

    Ok(url)
}

impl ForgeClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        options: ForgeClientOptions,
    ) -> Result<Self, StoreError> {
        let base = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("forgesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            token: token.filter(|t| !t.is_empty()),
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn api_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(["api", "v1"]);
            path.extend(segments);
        }
        Ok(url)
    }

    fn contents_url(&self, repo: &RepoRef, path: Option<&str>) -> Result<Url, StoreError> {
        let prefix = ["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"];
        match path {
            Some(path) => self.api_url(prefix.into_iter().chain(path.split('/'))),
            None => self.api_url(prefix),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header("Authorization", format!("token {token}")),
            None => builder,
        }
    }

    /// Send a request, retrying failures allowed by `retry` with exponential
    /// backoff.
    async fn send<F>(&self, retry: Retry, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        let mut backoff = self.options.initial_backoff;

        loop {
            let err = match build().send().await {
                Ok(response)
                    if retry == Retry::Transient && is_retryable_status(response.status()) =>
                {
                    if attempt >= self.options.max_retries {
                        return Ok(response);
                    }
                    StoreError::Api {
                        status: response.status().as_u16(),
                        body: String::new(),
                    }
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    let retryable = retry == Retry::Transient || e.is_connect();
                    let err = StoreError::Transport(e.to_string());
                    if !retryable || attempt >= self.options.max_retries {
                        return Err(err);
                    }
                    err
                }
            };

            attempt += 1;
            warn!(attempt, error = %err, "Retrying forge request");
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
        }
    }

    async fn send_write(&self, method: Method, url: Url, body: Value) -> Result<(), StoreError> {
        let response = self
            .send(Retry::ConnectOnly, || {
                self.request(method.clone(), url.clone()).json(&body)
            })
            .await?;
        check_status(response).await.map(|_| ())
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Map a non-2xx response into the store error taxonomy
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(url),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Conflict {
            status: status.as_u16(),
            body,
        },
        _ => StoreError::Api {
            status: status.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl ContentStore for ForgeClient {
    async fn fetch(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteSnapshot>, StoreError> {
        let mut url = self.contents_url(repo, Some(path))?;
        url.query_pairs_mut().append_pair("ref", reference);
        debug!(%repo, path, reference, "Fetching remote snapshot");

        let response = self
            .send(Retry::Transient, || self.request(Method::GET, url.clone()))
            .await?;
        let response = match check_status(response).await {
            Ok(response) => response,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("contents for {path}: {e}")))?;
        if body.is_array() {
            return Err(StoreError::InvalidResponse(format!("{path} is a directory")));
        }

        let entry: ContentsEntry = serde_json::from_value(body)
            .map_err(|e| StoreError::InvalidResponse(format!("contents for {path}: {e}")))?;
        if entry.kind != "file" {
            return Err(StoreError::InvalidResponse(format!(
                "{path} is a {}, not a file",
                entry.kind
            )));
        }

        let content = match (entry.content.as_deref(), entry.encoding.as_deref()) {
            (Some(encoded), Some("base64")) => decode_content(encoded)
                .map_err(|e| StoreError::InvalidResponse(format!("content of {path}: {e}")))?,
            (Some(raw), None) => raw.as_bytes().to_vec(),
            _ => {
                return Err(StoreError::InvalidResponse(format!(
                    "content of {path} was not returned"
                )))
            }
        };

        Ok(Some(RemoteSnapshot {
            path: path.to_string(),
            version_token: entry.sha,
            content,
        }))
    }

    async fn create(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
    ) -> Result<(), StoreError> {
        let url = self.contents_url(repo, Some(path))?;
        let body = json!({
            "content": encode_content(content),
            "message": message,
            "branch": branch,
        });
        self.send_write(Method::POST, url, body).await
    }

    async fn update(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let url = self.contents_url(repo, Some(path))?;
        let mut body = json!({
            "content": encode_content(content),
            "message": message,
            "branch": branch,
        });
        if let Some(sha) = version_token {
            body["sha"] = json!(sha);
        }
        self.send_write(Method::PUT, url, body).await
    }

    async fn delete(
        &self,
        repo: &RepoRef,
        path: &str,
        message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let url = self.contents_url(repo, Some(path))?;
        let mut body = json!({
            "message": message,
            "branch": branch,
        });
        if let Some(sha) = version_token {
            body["sha"] = json!(sha);
        }
        self.send_write(Method::DELETE, url, body).await
    }

    async fn batch_commit(
        &self,
        repo: &RepoRef,
        changes: &[BatchChange],
        message: &str,
        branch: &str,
    ) -> Result<(), StoreError> {
        let url = self.contents_url(repo, None)?;
        let files: Vec<ChangeFileEntry<'_>> = changes
            .iter()
            .map(|change| ChangeFileEntry {
                operation: change.kind,
                path: &change.path,
                content: change.content.as_deref().map(encode_content),
                sha: change.version_token.as_deref(),
            })
            .collect();
        let body = json!({
            "files": files,
            "message": message,
            "branch": branch,
        });
        self.send_write(Method::POST, url, body).await
    }

    async fn create_repository(
        &self,
        options: &CreateRepositoryOptions,
    ) -> Result<RepositoryInfo, StoreError> {
        let url = match &options.organization {
            Some(org) => self.api_url(["orgs", org.as_str(), "repos"])?,
            None => self.api_url(["user", "repos"])?,
        };
        let body = json!({
            "name": options.name,
            "description": options.description.clone().unwrap_or_default(),
            "private": options.private,
            "auto_init": options.auto_init,
            "default_branch": options.default_branch,
        });

        let response = self
            .send(Retry::ConnectOnly, || {
                self.request(Method::POST, url.clone()).json(&body)
            })
            .await?;
        let entry: RepositoryEntry = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("repository: {e}")))?;

        Ok(RepositoryInfo {
            full_name: entry.full_name,
            html_url: entry.html_url,
            clone_url: entry.clone_url,
            default_branch: entry.default_branch,
            private: entry.private,
            created_at: entry.created_at,
        })
    }
}
