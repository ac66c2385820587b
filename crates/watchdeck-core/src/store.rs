//! Conditional read/write of named resources against the remote,
//! content-addressed document store.
//!
//! The store addresses resources by `(owner, repository, branch, name)` and
//! tags every read with an opaque revision token identifying the exact bytes
//! currently stored. A write presents the token it last observed; the remote
//! side rejects the write when the tokens no longer match. That rejection is
//! the whole optimistic-concurrency story: nothing here retries or merges.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::codec::{self, CodecError};
use crate::config::StoreConfig;
use crate::domain::WatchlistDocument;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};

/// Name of the shared watchlist resource within the repository.
pub const WATCHLIST_RESOURCE: &str = "watchlist.json";

const API_ROOT: &str = "https://api.github.com";

/// Opaque identifier of a resource's current exact content. Fetched on read,
/// consumed as a write precondition, never cached across a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RevisionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a conditional read. A missing resource is the expected state on
/// first use, so it is an outcome rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found {
        document: WatchlistDocument,
        revision: RevisionToken,
    },
    Missing,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store coordinates are not configured")]
    NotConfigured,
    #[error("remote store rejected the credential")]
    Authentication,
    #[error("revision conflict: the remote document changed since it was last fetched")]
    Conflict,
    #[error("resource '{resource}' not found")]
    NotFound { resource: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed remote payload: {0}")]
    Payload(String),
}

impl From<HttpError> for StoreError {
    fn from(err: HttpError) -> Self {
        Self::Transport(err.message().to_owned())
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        Self::Payload(err.to_string())
    }
}

/// Seam between the synchronizer and the remote store. Implemented by
/// [`GithubContentStore`] in production and by in-memory fakes in tests.
pub trait DocumentStore: Send + Sync {
    fn fetch_current<'a>(
        &'a self,
        resource: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, StoreError>> + Send + 'a>>;

    /// Writes `document` as the new content of `resource`. A `None` revision
    /// is a creation and must fail if the resource appeared concurrently; a
    /// `Some` revision must be rejected when the remote content has moved on.
    fn commit<'a>(
        &'a self,
        resource: &'a str,
        document: &'a WatchlistDocument,
        revision: Option<&'a RevisionToken>,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RevisionToken, StoreError>> + Send + 'a>>;
}

/// Production store client over the GitHub contents API.
#[derive(Clone)]
pub struct GithubContentStore {
    transport: Arc<dyn HttpTransport>,
    config: StoreConfig,
}

impl GithubContentStore {
    pub fn new(transport: Arc<dyn HttpTransport>, config: StoreConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn contents_url(&self, resource: &str) -> String {
        format!(
            "{API_ROOT}/repos/{}/{}/contents/{}",
            urlencoding::encode(&self.config.username),
            urlencoding::encode(&self.config.repository),
            urlencoding::encode(resource),
        )
    }

    fn decorate(&self, request: HttpRequest) -> HttpRequest {
        let request = request
            .with_header("accept", "application/vnd.github+json")
            .with_header("user-agent", "watchdeck/0.1");
        match &self.config.credential {
            Some(credential) => request.with_bearer(credential),
            None => request,
        }
    }

    fn ensure_configured(&self) -> Result<(), StoreError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(StoreError::NotConfigured)
        }
    }

    /// Reads a resource and returns its unwrapped UTF-8 text, or `None` when
    /// the resource does not exist. Shared by the watchlist read path and the
    /// per-symbol series fetcher.
    pub async fn fetch_raw(&self, resource: &str) -> Result<Option<String>, StoreError> {
        self.ensure_configured()?;
        let url = format!("{}?ref={}", self.contents_url(resource), self.config.branch);
        let response = self.transport.execute(self.decorate(HttpRequest::get(url))).await?;

        match read_outcome(&response, resource)? {
            Some(payload) => Ok(Some(codec::from_transport(&payload.content)?)),
            None => Ok(None),
        }
    }
}

impl DocumentStore for GithubContentStore {
    fn fetch_current<'a>(
        &'a self,
        resource: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.ensure_configured()?;
            let url = format!("{}?ref={}", self.contents_url(resource), self.config.branch);
            let response = self.transport.execute(self.decorate(HttpRequest::get(url))).await?;

            match read_outcome(&response, resource)? {
                Some(payload) => {
                    let document = codec::decode_document(&payload.content)?;
                    info!(resource, revision = %payload.sha, "fetched document");
                    Ok(FetchOutcome::Found {
                        document,
                        revision: RevisionToken::new(payload.sha),
                    })
                }
                None => {
                    info!(resource, "resource does not exist yet");
                    Ok(FetchOutcome::Missing)
                }
            }
        })
    }

    fn commit<'a>(
        &'a self,
        resource: &'a str,
        document: &'a WatchlistDocument,
        revision: Option<&'a RevisionToken>,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RevisionToken, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.ensure_configured()?;
            let body = WritePayload {
                message,
                content: codec::encode_document(document)?,
                branch: &self.config.branch,
                sha: revision.map(RevisionToken::as_str),
            };
            let body = serde_json::to_string(&body)
                .map_err(|err| StoreError::Payload(err.to_string()))?;
            let request = self.decorate(HttpRequest::put(self.contents_url(resource), body));
            let response = self.transport.execute(request).await?;

            match write_outcome(&response, resource, revision.is_some()) {
                Ok(token) => {
                    info!(resource, revision = %token, "committed document");
                    Ok(token)
                }
                Err(err) => {
                    match &err {
                        StoreError::Conflict => warn!(resource, "commit rejected: stale revision"),
                        StoreError::Authentication => warn!(resource, "commit rejected: bad credential"),
                        _ => {}
                    }
                    Err(err)
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContentPayload {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct WritePayload<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WriteResponseContent,
}

#[derive(Debug, Deserialize)]
struct WriteResponseContent {
    sha: String,
}

fn read_outcome(
    response: &HttpResponse,
    resource: &str,
) -> Result<Option<ContentPayload>, StoreError> {
    if response.is_success() {
        let payload: ContentPayload = serde_json::from_str(&response.body)
            .map_err(|err| StoreError::Payload(format!("contents response: {err}")))?;
        return Ok(Some(payload));
    }
    match response.status {
        404 => Ok(None),
        401 | 403 => Err(StoreError::Authentication),
        status => Err(StoreError::Transport(format!(
            "unexpected status {status} reading '{resource}'"
        ))),
    }
}

fn write_outcome(
    response: &HttpResponse,
    resource: &str,
    had_revision: bool,
) -> Result<RevisionToken, StoreError> {
    match response.status {
        _ if response.is_success() => {
            let payload: WriteResponse = serde_json::from_str(&response.body)
                .map_err(|err| StoreError::Payload(format!("write response: {err}")))?;
            Ok(RevisionToken::new(payload.content.sha))
        }
        401 | 403 => Err(StoreError::Authentication),
        // The remote answers 409 for a stale revision and 422 both for a
        // stale revision and for a token-less create of an existing resource.
        409 | 422 => Err(StoreError::Conflict),
        404 if had_revision => Err(StoreError::NotFound {
            resource: resource.to_owned(),
        }),
        status => Err(StoreError::Transport(format!(
            "unexpected status {status} writing '{resource}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::NoopTransport;

    fn store() -> GithubContentStore {
        GithubContentStore::new(
            Arc::new(NoopTransport),
            StoreConfig::new("ana", "watch list").with_branch("main"),
        )
    }

    #[test]
    fn builds_escaped_contents_url() {
        assert_eq!(
            store().contents_url("watchlist.json"),
            "https://api.github.com/repos/ana/watch%20list/contents/watchlist.json"
        );
    }

    #[test]
    fn read_maps_missing_to_none() {
        let response = HttpResponse {
            status: 404,
            body: String::from("{\"message\":\"Not Found\"}"),
        };
        let outcome = read_outcome(&response, "watchlist.json").expect("must map");
        assert!(outcome.is_none());
    }

    #[test]
    fn read_maps_auth_failures() {
        let response = HttpResponse {
            status: 401,
            body: String::new(),
        };
        let err = read_outcome(&response, "watchlist.json").expect_err("must fail");
        assert!(matches!(err, StoreError::Authentication));
    }

    #[test]
    fn write_maps_stale_revision_to_conflict() {
        for status in [409, 422] {
            let response = HttpResponse {
                status,
                body: String::new(),
            };
            let err = write_outcome(&response, "watchlist.json", true).expect_err("must fail");
            assert!(matches!(err, StoreError::Conflict));
        }
    }

    #[test]
    fn write_maps_vanished_resource_to_not_found() {
        let response = HttpResponse {
            status: 404,
            body: String::new(),
        };
        let err = write_outcome(&response, "watchlist.json", true).expect_err("must fail");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn write_extracts_new_revision() {
        let response = HttpResponse {
            status: 201,
            body: String::from(r#"{"content":{"sha":"abc123"}}"#),
        };
        let token = write_outcome(&response, "watchlist.json", false).expect("must map");
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn write_payload_omits_sha_on_creation() {
        let payload = WritePayload {
            message: "create watchlist",
            content: String::from("e30="),
            branch: "main",
            sha: None,
        };
        let json = serde_json::to_string(&payload).expect("must serialize");
        assert!(!json.contains("\"sha\""));
    }
}
