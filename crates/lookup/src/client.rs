use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tenant_edge_core::{normalize_host, LookupResult, TenantSlug};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Path of the public domain lookup endpoint, relative to the API base.
pub const LOOKUP_DOMAIN_PATH: &str = "api/public/lookup-domain";

/// Client resolving custom domains to tenant slugs through the platform API.
#[derive(Clone)]
pub struct DomainLookupClient {
    http: Client,
    base_url: Url,
}

impl DomainLookupClient {
    /// Creates a new lookup client.
    ///
    /// `base_url` should end with `/` when it carries a path so the endpoint is
    /// joined beneath it rather than replacing its last segment.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Issues a single `GET` to the lookup endpoint with `domain=<host>`.
    pub async fn lookup_domain(&self, host: &str) -> Result<DomainLookupResponse, LookupError> {
        let mut url = self.base_url.join(LOOKUP_DOMAIN_PATH)?;
        url.query_pairs_mut().append_pair("domain", host);

        let response = self.http.get(url).send().await?;
        parse_json(response).await
    }

    /// Resolves `host` into a terminal [`LookupResult`].
    ///
    /// Transport, status and decoding failures all collapse into
    /// `TransportError`; the cause is only logged.
    pub async fn resolve(&self, host: &str) -> LookupResult {
        let host = normalize_host(host);
        match self.lookup_domain(&host).await {
            Ok(response) => match response.slug() {
                Some(slug) => {
                    debug!(stage = "lookup", %host, %slug, "custom domain resolved");
                    LookupResult::Resolved(slug)
                }
                None => {
                    debug!(stage = "lookup", %host, "custom domain has no tenant");
                    LookupResult::NotFound
                }
            },
            Err(LookupError::Status { status, body }) => {
                warn!(stage = "lookup", %host, status = status.as_u16(), %body, "domain lookup rejected");
                LookupResult::TransportError
            }
            Err(err) => {
                warn!(stage = "lookup", %host, error = %err, "domain lookup failed");
                LookupResult::TransportError
            }
        }
    }
}

/// Body returned by the lookup endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DomainLookupResponse {
    #[serde(default)]
    pub slug: Option<String>,
}

impl DomainLookupResponse {
    /// Returns the slug when present and non-blank.
    pub fn slug(&self) -> Option<TenantSlug> {
        self.slug
            .as_deref()
            .and_then(|raw| TenantSlug::parse(raw).ok())
    }
}

/// Errors produced by the lookup client.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid lookup response: {0}")]
    Decode(reqwest::Error),
}

async fn parse_json(response: Response) -> Result<DomainLookupResponse, LookupError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(LookupError::Status { status, body });
    }

    response.json().await.map_err(|err| {
        if err.is_decode() {
            LookupError::Decode(err)
        } else {
            LookupError::Http(err)
        }
    })
}
