use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Verdict of the domain classifier for a single page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostClassification {
    Platform,
    TenantCustomDomain,
}

impl HostClassification {
    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::TenantCustomDomain => "tenant_custom_domain",
        }
    }

    pub fn is_tenant(self) -> bool {
        matches!(self, Self::TenantCustomDomain)
    }
}

/// Short URL-safe identifier of a tenant, guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantSlug(String);

impl TenantSlug {
    /// Builds a slug from a raw value, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, SlugError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("tenant slug must not be empty")]
    Empty,
}

/// Outcome of the domain lookup for a tenant custom domain.
///
/// `Pending` is the only non-terminal value; a lookup moves from it to
/// exactly one of the other variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Pending,
    Resolved(TenantSlug),
    NotFound,
    TransportError,
}

impl LookupResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved(_) => "resolved",
            Self::NotFound => "not_found",
            Self::TransportError => "transport_error",
        }
    }
}

/// What the page should do once classification and lookup are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    NoAction,
    RedirectTo(Url),
    ShowNotFound,
}

/// Computes the redirect decision for one page load.
///
/// A redirect is only produced for a tenant domain whose lookup resolved and
/// whose current origin differs from the canonical platform origin.
pub fn decide(
    classification: HostClassification,
    lookup: &LookupResult,
    current_origin: &Url,
    canonical_origin: &Url,
) -> RedirectDecision {
    if !classification.is_tenant() {
        return RedirectDecision::NoAction;
    }

    match lookup {
        LookupResult::Pending => RedirectDecision::NoAction,
        LookupResult::Resolved(_) if current_origin.origin() == canonical_origin.origin() => {
            RedirectDecision::NoAction
        }
        LookupResult::Resolved(slug) => {
            RedirectDecision::RedirectTo(admin_url(canonical_origin, slug))
        }
        LookupResult::NotFound | LookupResult::TransportError => RedirectDecision::ShowNotFound,
    }
}

/// Builds `<canonical-origin>/w/<slug>/admin`.
///
/// The slug is pushed as a path segment so reserved characters are
/// percent-encoded rather than altering the path.
pub fn admin_url(canonical_origin: &Url, slug: &TenantSlug) -> Url {
    let mut url = canonical_origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(["w", slug.as_str(), "admin"]);
    }
    url
}
