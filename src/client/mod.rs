//! Minimal client for the Vercel REST API.
//!
//! Only the endpoints the provider needs are implemented. Every call is a
//! single request; there is no retry or backoff.

mod project;
mod project_domain;

pub use project::ProjectResponse;
pub use project_domain::{
    CreateProjectDomainRequest, ProjectDomainResponse, UpdateProjectDomainRequest,
};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// The public Vercel API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.vercel.com";

/// Errors returned by [`Client`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("{status} {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Vercel error code, e.g. `not_found`.
        code: String,
        /// Human-readable message from the API.
        message: String,
    },

    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured API URL is not usable.
    #[error("invalid API URL: {0}")]
    Url(String),
}

impl ClientError {
    /// Whether the API reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// A configured Vercel API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    team_id: Option<String>,
}

impl Client {
    /// Create a client for the public API authenticated with `token`.
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(DEFAULT_API_URL)?,
            token: token.into(),
            team_id: None,
        })
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ClientError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Set the team used when a call does not name one.
    pub fn with_team_id(mut self, team_id: Option<String>) -> Self {
        self.team_id = team_id.filter(|t| !t.is_empty());
        self
    }

    /// The team used when a call does not name one.
    pub fn default_team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    /// The team a call runs under: the explicit one, else the default.
    pub fn effective_team_id<'a>(&'a self, team_id: Option<&'a str>) -> Option<&'a str> {
        team_id
            .filter(|t| !t.is_empty())
            .or_else(|| self.default_team_id())
    }

    fn endpoint(&self, segments: &[&str], team_id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if let Some(team_id) = self.effective_team_id(team_id) {
            url.query_pairs_mut().append_pair("teamId", team_id);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "vercel api request");
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = check(request.send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::Url(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Url(raw.to_string()));
    }
    Ok(url)
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (String::new(), text),
    };
    let code = if code.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown")
            .to_lowercase()
            .replace(' ', "_")
    } else {
        code
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
