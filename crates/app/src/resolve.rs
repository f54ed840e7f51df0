use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tenant_edge_core::{
    ControllerState, DomainClassifier, HostClassification, RedirectController, TransitionError,
    View,
};
use tenant_edge_lookup::DomainLookupClient;
use tracing::info;
use url::Url;

/// Runs the custom-domain check for one page load.
///
/// Holds only immutable configuration; every call builds its own controller
/// and performs at most one lookup, so nothing leaks between requests.
/// Dropping the returned future drops the in-flight lookup with it.
#[derive(Clone)]
pub struct DomainResolver {
    classifier: DomainClassifier,
    canonical_origin: Url,
    lookup: DomainLookupClient,
}

/// Outcome of a finished check.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub host: String,
    pub classification: HostClassification,
    #[serde(flatten)]
    pub state: ControllerState,
    pub view: View,
}

impl DomainResolver {
    pub fn new(
        classifier: DomainClassifier,
        canonical_origin: Url,
        lookup: DomainLookupClient,
    ) -> Self {
        Self {
            classifier,
            canonical_origin,
            lookup,
        }
    }

    pub async fn resolve(
        &self,
        host: &str,
        current_origin: &Url,
    ) -> Result<Resolution, TransitionError> {
        let mut controller =
            RedirectController::new(self.classifier.clone(), self.canonical_origin.clone());

        let classification = controller.begin(host)?;
        counter!("domain_classifications_total", "classification" => classification.as_str())
            .increment(1);

        if classification.is_tenant() {
            let started = Instant::now();
            let lookup = self.lookup.resolve(host).await;
            histogram!("domain_lookup_latency_seconds").record(started.elapsed().as_secs_f64());
            counter!("domain_lookups_total", "result" => lookup.as_str()).increment(1);

            controller.complete(current_origin, lookup)?;
        }

        let state = controller.state().clone();
        counter!("redirect_decisions_total", "state" => state.as_str()).increment(1);
        info!(
            stage = "resolve",
            %host,
            classification = classification.as_str(),
            state = state.as_str(),
            "custom domain check finished"
        );

        Ok(Resolution {
            host: host.to_string(),
            classification,
            view: state.view(),
            state,
        })
    }
}

/// Rebuilds the origin the browser sees from the request host and scheme.
///
/// The scheme comes from the first `X-Forwarded-Proto` value when it is
/// `http` or `https`, otherwise `default_scheme` is used.
pub fn request_origin(
    host: &str,
    forwarded_proto: Option<&str>,
    default_scheme: &str,
) -> Option<Url> {
    let scheme = forwarded_proto
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value == "http" || value == "https")
        .unwrap_or_else(|| default_scheme.to_string());

    let host = host.trim();
    if host.is_empty() || host.contains(['/', '?', '#', '@']) {
        return None;
    }

    Url::parse(&format!("{scheme}://{host}"))
        .ok()
        .filter(|url| url.host_str().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tenant_edge_core::ClassifierConfig;

    fn canonical() -> Url {
        Url::parse("https://agentsites.io").expect("url")
    }

    fn resolver(server: &MockServer) -> DomainResolver {
        let classifier = DomainClassifier::new(ClassifierConfig::for_canonical_origin(
            &canonical(),
            ["vercel.app"],
        ));
        let lookup = DomainLookupClient::new(
            Url::parse(&server.url("/")).expect("url"),
            reqwest::Client::new(),
        );
        DomainResolver::new(classifier, canonical(), lookup)
    }

    #[tokio::test]
    async fn platform_hosts_skip_lookup() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/public/lookup-domain");
                then.status(200).json_body(json!({ "slug": "acme" }));
            })
            .await;
        let resolver = resolver(&server);

        for host in [
            "localhost:3000",
            "127.0.0.1",
            "agentsites.io",
            "www.agentsites.io",
            "feature-x.vercel.app",
        ] {
            let origin = request_origin(host, None, "https").expect("origin");
            let resolution = resolver.resolve(host, &origin).await.expect("resolve");
            assert_eq!(resolution.classification, HostClassification::Platform);
            assert_eq!(resolution.state, ControllerState::Inactive);
        }

        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn tenant_host_issues_one_lookup_and_redirects() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/public/lookup-domain")
                    .query_param("domain", "acme-homes.com");
                then.status(200).json_body(json!({ "slug": "acme" }));
            })
            .await;
        let resolver = resolver(&server);

        let origin = request_origin("acme-homes.com", None, "https").expect("origin");
        let resolution = resolver
            .resolve("acme-homes.com", &origin)
            .await
            .expect("resolve");

        mock.assert_hits_async(1).await;
        assert_eq!(
            resolution.state,
            ControllerState::Redirecting {
                location: Url::parse("https://agentsites.io/w/acme/admin").expect("url")
            }
        );
        assert_eq!(resolution.view, View::Nothing);
    }

    #[tokio::test]
    async fn missing_slug_and_errors_show_not_found() {
        for (status, body) in [(200, json!({})), (500, json!({ "error": "boom" }))] {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/api/public/lookup-domain");
                    then.status(status).json_body(body.clone());
                })
                .await;
            let resolver = resolver(&server);

            let origin = request_origin("acme-homes.com", None, "https").expect("origin");
            let resolution = resolver
                .resolve("acme-homes.com", &origin)
                .await
                .expect("resolve");
            assert_eq!(resolution.state, ControllerState::NotFoundDisplay);
            assert_eq!(resolution.view, View::NotFound);
        }
    }

    #[tokio::test]
    async fn canonical_origin_does_not_redirect_to_itself() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/public/lookup-domain");
                then.status(200).json_body(json!({ "slug": "acme" }));
            })
            .await;
        let resolver = resolver(&server);

        let resolution = resolver
            .resolve("custom.tenant.example", &canonical())
            .await
            .expect("resolve");
        assert_eq!(resolution.state, ControllerState::Inactive);
    }

    #[tokio::test]
    async fn repeated_loads_are_independent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/public/lookup-domain");
                then.status(200).json_body(json!({ "slug": "acme" }));
            })
            .await;
        let resolver = resolver(&server);
        let origin = request_origin("acme-homes.com", None, "https").expect("origin");

        let first = resolver.resolve("acme-homes.com", &origin).await.expect("first");
        let second = resolver.resolve("acme-homes.com", &origin).await.expect("second");

        mock.assert_hits_async(2).await;
        assert_eq!(first.classification, second.classification);
        assert_eq!(first.state, second.state);
    }

    #[test]
    fn request_origin_prefers_forwarded_proto() {
        let origin = request_origin("acme-homes.com:8443", Some("http, https"), "https")
            .expect("origin");
        assert_eq!(origin.as_str(), "http://acme-homes.com:8443/");

        let origin = request_origin("acme-homes.com", Some("gopher"), "https").expect("origin");
        assert_eq!(origin.scheme(), "https");
    }

    #[test]
    fn request_origin_rejects_malformed_hosts() {
        assert!(request_origin("", None, "https").is_none());
        assert!(request_origin("evil.com/path", None, "https").is_none());
        assert!(request_origin("user@evil.com", None, "https").is_none());
    }
}
