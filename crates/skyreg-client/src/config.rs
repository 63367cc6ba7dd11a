//! Client configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ClientError, Result};

/// Environment variable that overrides `portal.url`.
pub const PORTAL_URL_ENV: &str = "SKYREG_PORTAL_URL";

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Portal settings.
    #[serde(default)]
    pub portal: PortalConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Portal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the portal. Only scheme, host and port are used.
    #[serde(default = "default_portal_url")]
    pub url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Address skylinks as `<base32>.<portal host>` instead of `<portal>/<base64>`.
    #[serde(default)]
    pub subdomain_links: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_portal_url() -> String {
    "https://siasky.net".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: default_portal_url(),
            request_timeout_secs: default_request_timeout(),
            subdomain_links: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PortalConfig {
    /// Parse and normalize the portal URL.
    ///
    /// Requires an http(s) URL with a host. Path, query and fragment are
    /// dropped.
    pub fn resolve_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.url.trim())
            .map_err(|e| ClientError::Config(format!("invalid portal URL {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "portal URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ClientError::Config(format!("portal URL {url} has no host")));
        }
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

impl ClientConfig {
    /// Load configuration from `path`.
    ///
    /// Falls back to defaults if the file does not exist. `SKYREG_PORTAL_URL`
    /// takes precedence over the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        config.apply_portal_url_override(std::env::var(PORTAL_URL_ENV).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_portal_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.portal.url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.portal.url, "https://siasky.net");
        assert_eq!(config.portal.request_timeout_secs, 30);
        assert!(!config.portal.subdomain_links);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = ClientConfig::from_toml_str(&toml_str).expect("parse");
        assert_eq!(parsed.portal.url, config.portal.url);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            [portal]
            url = "https://portal.example.com"
            "#,
        )
        .expect("parse");
        assert_eq!(config.portal.url, "https://portal.example.com");
        assert_eq!(config.portal.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = std::env::temp_dir().join("skyreg-config-does-not-exist.toml");
        let config = ClientConfig::load(&path).expect("load");
        assert_eq!(config.portal.request_timeout_secs, 30);
    }

    #[test]
    fn test_portal_url_override() {
        let mut config = ClientConfig::default();
        config.apply_portal_url_override(Some("  ".to_string()));
        assert_eq!(config.portal.url, "https://siasky.net");
        config.apply_portal_url_override(Some("http://localhost:9980".to_string()));
        assert_eq!(config.portal.url, "http://localhost:9980");
    }

    #[test]
    fn test_resolve_url() {
        let portal = PortalConfig {
            url: "https://portal.example.com:8443/some/path?q=1#frag".to_string(),
            ..Default::default()
        };
        assert_eq!(
            portal.resolve_url().expect("resolve").as_str(),
            "https://portal.example.com:8443/"
        );

        for bad in ["not a url", "ftp://portal.example.com", "file:///tmp/x"] {
            let portal = PortalConfig {
                url: bad.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(portal.resolve_url(), Err(ClientError::Config(_))),
                "{bad}"
            );
        }
    }
}
