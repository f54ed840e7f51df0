use std::{env, fmt, net::SocketAddr};

use url::Url;

use super::{
    server_bind_address, split_list, DEFAULT_API_BASE_URL, DEFAULT_CANONICAL_ORIGIN,
    DEFAULT_PREVIEW_HOST_SUFFIXES, DEFAULT_PUBLIC_SCHEME,
};

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// Base of the platform API serving `/api/public/lookup-domain`. Always ends with `/`.
    pub api_base_url: Url,
    /// Origin that owns the admin panel; redirect target and loop guard.
    pub canonical_origin: Url,
    /// Explicit marketing hosts. Empty means derive them from `canonical_origin`.
    pub marketing_hosts: Vec<String>,
    pub preview_host_suffixes: Vec<String>,
    /// Scheme assumed for incoming requests lacking `X-Forwarded-Proto`.
    pub public_scheme: String,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let api_base_url = parse_http_url(
            "API_BASE_URL",
            &env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )?;
        let api_base_url = with_trailing_slash(api_base_url);

        let canonical_origin = parse_http_url(
            "CANONICAL_ORIGIN",
            &env::var("CANONICAL_ORIGIN").unwrap_or_else(|_| DEFAULT_CANONICAL_ORIGIN.to_string()),
        )?;

        let marketing_hosts = env::var("MARKETING_HOSTS")
            .map(|value| split_list(&value))
            .unwrap_or_default();
        let preview_host_suffixes = split_list(
            &env::var("PREVIEW_HOST_SUFFIXES")
                .unwrap_or_else(|_| DEFAULT_PREVIEW_HOST_SUFFIXES.to_string()),
        );

        let public_scheme = env::var("APP_PUBLIC_SCHEME")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_SCHEME.to_string())
            .to_ascii_lowercase();
        if public_scheme != "http" && public_scheme != "https" {
            return Err(ConfigError::InvalidScheme(public_scheme));
        }

        Ok(Self {
            bind_addr,
            environment,
            api_base_url,
            canonical_origin,
            marketing_hosts,
            preview_host_suffixes,
            public_scheme,
        })
    }
}

fn parse_http_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            key,
            value: value.to_string(),
        }),
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    InvalidUrl { key: &'static str, value: String },
    InvalidScheme(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidUrl { key, value } => {
                write!(f, "{key} must be an absolute http(s) URL (got {value})")
            }
            Self::InvalidScheme(value) => write!(
                f,
                "APP_PUBLIC_SCHEME must be 'http' or 'https' (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
