use url::Url;

use crate::types::HostClassification;

/// Host fragments that always mark a local development host.
const LOOPBACK_MARKERS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Host names and suffixes that belong to the platform itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierConfig {
    marketing_hosts: Vec<String>,
    preview_suffixes: Vec<String>,
}

impl ClassifierConfig {
    /// Creates a configuration from explicit marketing hosts and preview suffixes.
    ///
    /// Entries are normalized the same way incoming hosts are; blank entries are
    /// dropped so an empty suffix can never match every host.
    pub fn new<M, P>(marketing_hosts: M, preview_suffixes: P) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            marketing_hosts: normalize_all(marketing_hosts),
            preview_suffixes: normalize_all(preview_suffixes),
        }
    }

    /// Derives the marketing hosts from the canonical origin in bare and `www.` form.
    pub fn for_canonical_origin<P>(canonical_origin: &Url, preview_suffixes: P) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let marketing_hosts = canonical_origin
            .host_str()
            .map(|host| {
                let host = normalize_host(host);
                let bare = host.strip_prefix("www.").unwrap_or(&host).to_string();
                vec![format!("www.{bare}"), bare]
            })
            .unwrap_or_default();

        Self::new(marketing_hosts, preview_suffixes)
    }

    pub fn marketing_hosts(&self) -> &[String] {
        &self.marketing_hosts
    }

    pub fn preview_suffixes(&self) -> &[String] {
        &self.preview_suffixes
    }
}

/// Classifies host names as platform-owned or tenant custom domains.
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    config: ClassifierConfig,
}

impl DomainClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Returns the classification for `host`.
    ///
    /// Loopback markers and preview suffixes match by containment so every
    /// preview deployment subdomain is treated as platform; marketing hosts
    /// must match exactly.
    pub fn classify(&self, host: &str) -> HostClassification {
        let host = normalize_host(host);

        let is_platform = LOOPBACK_MARKERS
            .iter()
            .any(|marker| host.contains(marker))
            || self
                .config
                .preview_suffixes
                .iter()
                .any(|suffix| host.contains(suffix.as_str()))
            || self.config.marketing_hosts.iter().any(|name| *name == host);

        if is_platform {
            HostClassification::Platform
        } else {
            HostClassification::TenantCustomDomain
        }
    }
}

/// Normalizes a host as received from a `Host` header into a bare host name.
///
/// Lowercases, trims whitespace and a trailing dot, and strips a `:port`
/// suffix. Bracketed IPv6 literals keep their brackets.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();

    let host = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => host[..=end].to_string(),
            None => host,
        }
    } else if host.matches(':').count() == 1 {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|ch| ch.is_ascii_digit()) => name.to_string(),
            _ => host,
        }
    } else {
        host
    };

    host.trim_end_matches('.').to_string()
}

fn normalize_all<I>(values: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| normalize_host(value.as_ref()))
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> DomainClassifier {
        let canonical = Url::parse("https://agentsites.io").expect("url");
        DomainClassifier::new(ClassifierConfig::for_canonical_origin(
            &canonical,
            ["vercel.app"],
        ))
    }

    #[test]
    fn loopback_hosts_are_platform() {
        let classifier = classifier();
        for host in [
            "localhost",
            "localhost:3000",
            "app.localhost",
            "127.0.0.1",
            "127.0.0.1:8080",
        ] {
            assert_eq!(
                classifier.classify(host),
                HostClassification::Platform,
                "{host}"
            );
        }
    }

    #[test]
    fn marketing_host_and_www_variant_are_platform() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("agentsites.io"),
            HostClassification::Platform
        );
        assert_eq!(
            classifier.classify("www.agentsites.io"),
            HostClassification::Platform
        );
        assert_eq!(
            classifier.classify("WWW.AgentSites.io."),
            HostClassification::Platform
        );
    }

    #[test]
    fn marketing_hosts_require_exact_match() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("blog.agentsites.io"),
            HostClassification::TenantCustomDomain
        );
        assert_eq!(
            classifier.classify("agentsites.io.evil.com"),
            HostClassification::TenantCustomDomain
        );
    }

    #[test]
    fn preview_subdomains_are_platform() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("vercel.app"),
            HostClassification::Platform
        );
        assert_eq!(
            classifier.classify("my-branch-abc123.vercel.app"),
            HostClassification::Platform
        );
    }

    #[test]
    fn other_hosts_are_tenant_domains() {
        let classifier = classifier();
        for host in ["acme-homes.com", "www.janedoe-realty.net", "10.0.0.5"] {
            assert_eq!(
                classifier.classify(host),
                HostClassification::TenantCustomDomain,
                "{host}"
            );
        }
    }

    #[test]
    fn canonical_with_www_derives_bare_host() {
        let canonical = Url::parse("https://www.agentsites.io").expect("url");
        let config = ClassifierConfig::for_canonical_origin(&canonical, Vec::<String>::new());
        assert_eq!(
            config.marketing_hosts(),
            ["www.agentsites.io".to_string(), "agentsites.io".to_string()]
        );
    }

    #[test]
    fn blank_suffixes_are_ignored() {
        let config = ClassifierConfig::new(["agentsites.io"], ["", "  "]);
        assert!(config.preview_suffixes().is_empty());
        let classifier = DomainClassifier::new(config);
        assert_eq!(
            classifier.classify("acme-homes.com"),
            HostClassification::TenantCustomDomain
        );
    }

    #[test]
    fn normalize_host_strips_ports_and_case() {
        assert_eq!(normalize_host(" Acme-Homes.COM:443 "), "acme-homes.com");
        assert_eq!(normalize_host("acme-homes.com."), "acme-homes.com");
        assert_eq!(normalize_host("[::1]:8080"), "[::1]");
        assert_eq!(normalize_host("::1"), "::1");
    }
}
