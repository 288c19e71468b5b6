//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [backend]
//! base_url = "https://wms.example.com"
//! request_timeout_secs = 15
//!
//! [identity]
//! authority = "https://login.example.com/tenant-id"
//! client_id = "00000000-0000-0000-0000-000000000000"
//! api_scopes = ["api://wms/access_as_user"]
//! profile_scopes = ["User.Read"]
//! post_logout_redirect_uri = "https://wms.example.com/login"
//!
//! [profile]
//! base_url = "https://graph.example.com/v1.0"
//!
//! [bootstrap]
//! exchange_timeout_secs = 10
//! login_route = "/login"
//! public_routes = ["/login", "/register"]
//!
//! [secrets]
//! provider = "file"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing; unknown fields are rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Root of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub backend: Option<BackendConfig>,
    pub identity: Option<IdentityConfig>,
    pub profile: Option<ProfileConfig>,
    pub bootstrap: Option<BootstrapConfig>,
    pub secrets: Option<SecretsConfig>,
}

impl ConfigFile {
    /// Validate every section present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(backend) = &self.backend {
            backend.validate()?;
        }
        if let Some(profile) = &self.profile {
            if let Some(url) = &profile.base_url {
                validate_http_url("profile.base_url", url)?;
            }
        }
        if let Some(bootstrap) = &self.bootstrap {
            bootstrap.validate()?;
        }
        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }
        Ok(())
    }
}

/// Backend session-exchange service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the backend API.
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl BackendConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.base_url {
            validate_http_url("backend.base_url", url)?;
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "backend.request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Federated identity provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Authority URL (tenant-qualified).
    pub authority: Option<String>,

    /// Application (client) id registered with the provider.
    pub client_id: Option<String>,

    /// Redirect URI registered for the login redirect.
    pub redirect_uri: Option<String>,

    /// Scopes for the backend API token.
    pub api_scopes: Option<Vec<String>>,

    /// Scopes for the profile service token.
    pub profile_scopes: Option<Vec<String>>,

    /// Where the provider sends the browser after logout.
    pub post_logout_redirect_uri: Option<String>,

    /// Provider token cache file.
    pub cache_path: Option<PathBuf>,
}

/// Profile enrichment service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Base URL of the profile service. Enrichment is disabled when unset.
    pub base_url: Option<String>,
}

/// Bootstrap orchestrator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Time budget for the whole federated exchange sequence.
    pub exchange_timeout_secs: Option<u64>,

    /// Public login route.
    pub login_route: Option<String>,

    /// Routes reachable without a session.
    pub public_routes: Option<Vec<String>>,
}

impl BootstrapConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "bootstrap.exchange_timeout_secs must be greater than zero".into(),
            ));
        }
        let routes = self
            .login_route
            .iter()
            .chain(self.public_routes.iter().flatten());
        for route in routes {
            if !route.starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "route '{}' must start with '/'",
                    route
                )));
            }
        }
        Ok(())
    }
}

/// Secret storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider name: "file", "memory" or "keychain".
    pub provider: Option<String>,
}

impl SecretsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if !crate::secrets::VALID_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    crate::secrets::VALID_PROVIDERS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_valid() {
        let config: ConfigFile = toml::from_str("").expect("parse");
        assert_eq!(config, ConfigFile::default());
        config.validate().expect("valid");
    }

    #[test]
    fn full_file_roundtrip() {
        let toml_src = r#"
            [backend]
            base_url = "https://wms.example.com"
            request_timeout_secs = 20

            [identity]
            client_id = "abc"
            api_scopes = ["api://wms/access_as_user"]

            [bootstrap]
            exchange_timeout_secs = 5
            public_routes = ["/login", "/register", "/forgot"]

            [secrets]
            provider = "memory"
        "#;
        let config: ConfigFile = toml::from_str(toml_src).expect("parse");
        config.validate().expect("valid");

        let rendered = toml::to_string_pretty(&config).expect("serialize");
        let reparsed: ConfigFile = toml::from_str(&rendered).expect("reparse");
        assert_eq!(config, reparsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<ConfigFile, _> = toml::from_str("[backend]\nbase = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_backend_url() {
        let config: ConfigFile =
            toml::from_str("[backend]\nbase_url = \"ftp://example.com\"").expect("parse");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config: ConfigFile =
            toml::from_str("[bootstrap]\nexchange_timeout_secs = 0").expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_route_rejected() {
        let config: ConfigFile =
            toml::from_str("[bootstrap]\nlogin_route = \"login\"").expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn invalid_provider() {
        let config: ConfigFile =
            toml::from_str("[secrets]\nprovider = \"vault\"").expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vault"));
    }
}
