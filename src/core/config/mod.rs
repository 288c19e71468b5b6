//! core::config
//!
//! `config.toml` for the `lk` binary: backend address, identity provider,
//! profile service, bootstrap budgets and the credential store.
//!
//! Lookup stops at the first file that exists:
//! `$LATCHKEY_CONFIG`, then `$XDG_CONFIG_HOME/latchkey/config.toml`, then
//! `~/.latchkey/config.toml`. With no file every key takes its default, so
//! a fresh install runs against `http://localhost:8080` with the file store.
//!
//! ```no_run
//! use latchkey::core::config::Config;
//!
//! let config = Config::load()?;
//! assert!(config.exchange_timeout().as_secs() > 0);
//! # Ok::<(), latchkey::core::config::ConfigError>(())
//! ```

pub mod schema;

pub use schema::{
    BackendConfig, BootstrapConfig, ConfigFile, IdentityConfig, ProfileConfig, SecretsConfig,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LATCHKEY_CONFIG";

/// Default time budget for the federated exchange sequence.
pub const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Default per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default public login route.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Default routes reachable without a session.
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/login", "/register"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid TOML: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("no home directory to hold config.toml")]
    NoHomeDir,
}

impl ConfigError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| ConfigError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Parsed `config.toml` plus where it came from. Accessors fill defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    path: Option<PathBuf>,
}

impl Config {
    /// Load from the first existing location, or defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::candidates().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::io("read", path))?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::Syntax {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        file.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Search order, most specific first.
    fn candidates() -> Vec<PathBuf> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let xdg = std::env::var_os("XDG_CONFIG_HOME")
            .map(|dir| PathBuf::from(dir).join("latchkey").join("config.toml"));
        let home = dirs::home_dir().map(|home| home.join(".latchkey").join("config.toml"));
        [explicit, xdg, home].into_iter().flatten().collect()
    }

    /// Where `lk config set` writes: the file that was loaded, else
    /// `$LATCHKEY_CONFIG`, else `~/.latchkey/config.toml`.
    pub fn write_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = self.path.clone().or_else(|| {
            std::env::var_os(CONFIG_ENV).map(PathBuf::from)
        }) {
            return Ok(path);
        }
        dirs::home_dir()
            .map(|home| home.join(".latchkey").join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Validate `file` and replace `path` with it via a synced temp file.
    pub fn write_atomic(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
        file.validate()?;
        let text =
            toml::to_string_pretty(file).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(ConfigError::io("create", dir))?;
        }

        let staged = path.with_extension("toml.tmp");
        fs::File::create(&staged)
            .and_then(|mut out| {
                out.write_all(text.as_bytes())?;
                out.sync_all()
            })
            .map_err(ConfigError::io("write", &staged))?;
        fs::rename(&staged, path).map_err(ConfigError::io("replace", path))
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Backend base URL. Defaults to `http://localhost:8080`.
    pub fn backend_url(&self) -> &str {
        self.file
            .backend
            .as_ref()
            .and_then(|b| b.base_url.as_deref())
            .unwrap_or("http://localhost:8080")
    }

    /// Per-request backend timeout.
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .file
            .backend
            .as_ref()
            .and_then(|b| b.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Identity provider section, or defaults.
    pub fn identity(&self) -> IdentityConfig {
        self.file.identity.clone().unwrap_or_default()
    }

    /// Scopes requested for the backend API token.
    pub fn api_scopes(&self) -> Vec<String> {
        self.file
            .identity
            .as_ref()
            .and_then(|i| i.api_scopes.clone())
            .unwrap_or_else(|| vec!["openid".to_string(), "profile".to_string()])
    }

    /// Scopes requested for the profile service token.
    pub fn profile_scopes(&self) -> Vec<String> {
        self.file
            .identity
            .as_ref()
            .and_then(|i| i.profile_scopes.clone())
            .unwrap_or_else(|| vec!["User.Read".to_string()])
    }

    /// Where the provider returns after logout. Defaults to the login route.
    pub fn post_logout_redirect_uri(&self) -> String {
        self.file
            .identity
            .as_ref()
            .and_then(|i| i.post_logout_redirect_uri.clone())
            .unwrap_or_else(|| format!("{}{}", self.backend_url(), self.login_route()))
    }

    /// Profile service URL, if enrichment is enabled.
    pub fn profile_url(&self) -> Option<&str> {
        self.file.profile.as_ref().and_then(|p| p.base_url.as_deref())
    }

    /// Time budget for the federated exchange sequence.
    pub fn exchange_timeout(&self) -> Duration {
        let secs = self
            .file
            .bootstrap
            .as_ref()
            .and_then(|b| b.exchange_timeout_secs)
            .unwrap_or(DEFAULT_EXCHANGE_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Public login route.
    pub fn login_route(&self) -> &str {
        self.file
            .bootstrap
            .as_ref()
            .and_then(|b| b.login_route.as_deref())
            .unwrap_or(DEFAULT_LOGIN_ROUTE)
    }

    /// Routes reachable without a session.
    pub fn public_routes(&self) -> Vec<String> {
        self.file
            .bootstrap
            .as_ref()
            .and_then(|b| b.public_routes.clone())
            .unwrap_or_else(|| DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect())
    }

    /// Secret store provider. Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.file
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or(crate::secrets::DEFAULT_PROVIDER)
    }

    /// Path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Dotted-key access for `lk config`
    // =========================================================================

    /// Keys understood by [`Config::get_key`] and [`Config::set_key`].
    pub const KEYS: &'static [&'static str] = &[
        "backend.base_url",
        "backend.request_timeout_secs",
        "identity.authority",
        "identity.client_id",
        "identity.redirect_uri",
        "identity.post_logout_redirect_uri",
        "identity.cache_path",
        "profile.base_url",
        "bootstrap.exchange_timeout_secs",
        "bootstrap.login_route",
        "secrets.provider",
    ];

    /// Effective value for a dotted key, defaults applied.
    pub fn get_key(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let identity = self.identity();
        let value = match key {
            "backend.base_url" => Some(self.backend_url().to_string()),
            "backend.request_timeout_secs" => Some(self.request_timeout().as_secs().to_string()),
            "identity.authority" => identity.authority,
            "identity.client_id" => identity.client_id,
            "identity.redirect_uri" => identity.redirect_uri,
            "identity.post_logout_redirect_uri" => Some(self.post_logout_redirect_uri()),
            "identity.cache_path" => identity.cache_path.map(|p| p.display().to_string()),
            "profile.base_url" => self.profile_url().map(str::to_string),
            "bootstrap.exchange_timeout_secs" => {
                Some(self.exchange_timeout().as_secs().to_string())
            }
            "bootstrap.login_route" => Some(self.login_route().to_string()),
            "secrets.provider" => Some(self.secrets_provider().to_string()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Set a dotted key in the file contents (not yet written).
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parse_secs = |v: &str| {
            v.parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue(format!("{} expects seconds, got '{}'", key, v)))
        };
        let file = &mut self.file;
        match key {
            "backend.base_url" => file.backend.get_or_insert_with(Default::default).base_url = Some(value.into()),
            "backend.request_timeout_secs" => {
                file.backend.get_or_insert_with(Default::default).request_timeout_secs = Some(parse_secs(value)?)
            }
            "identity.authority" => file.identity.get_or_insert_with(Default::default).authority = Some(value.into()),
            "identity.client_id" => file.identity.get_or_insert_with(Default::default).client_id = Some(value.into()),
            "identity.redirect_uri" => {
                file.identity.get_or_insert_with(Default::default).redirect_uri = Some(value.into())
            }
            "identity.post_logout_redirect_uri" => {
                file.identity.get_or_insert_with(Default::default).post_logout_redirect_uri = Some(value.into())
            }
            "identity.cache_path" => {
                file.identity.get_or_insert_with(Default::default).cache_path = Some(PathBuf::from(value))
            }
            "profile.base_url" => file.profile.get_or_insert_with(Default::default).base_url = Some(value.into()),
            "bootstrap.exchange_timeout_secs" => {
                file.bootstrap.get_or_insert_with(Default::default).exchange_timeout_secs = Some(parse_secs(value)?)
            }
            "bootstrap.login_route" => {
                file.bootstrap.get_or_insert_with(Default::default).login_route = Some(value.into())
            }
            "secrets.provider" => file.secrets.get_or_insert_with(Default::default).provider = Some(value.into()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        self.file.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();

        assert_eq!(config.backend_url(), "http://localhost:8080");
        assert_eq!(config.exchange_timeout(), Duration::from_secs(10));
        assert_eq!(config.login_route(), "/login");
        assert_eq!(config.public_routes(), vec!["/login", "/register"]);
        assert_eq!(config.secrets_provider(), "file");
        assert!(config.profile_url().is_none());
        assert_eq!(
            config.post_logout_redirect_uri(),
            "http://localhost:8080/login"
        );
    }

    #[test]
    fn load_from_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [backend]
            base_url = "https://wms.example.com"

            [bootstrap]
            exchange_timeout_secs = 3
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.backend_url(), "https://wms.example.com");
        assert_eq!(config.exchange_timeout(), Duration::from_secs(3));
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn invalid_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[secrets]\nprovider = \"vault\"").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn parse_error_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[backend\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { .. }));
        assert!(err.to_string().contains("config.toml is not valid TOML"));
    }

    #[test]
    fn set_key_then_write_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let mut config = Config::default();
        config.set_key("backend.base_url", "https://api.example.com").unwrap();
        config.set_key("bootstrap.exchange_timeout_secs", "7").unwrap();
        Config::write_atomic(&path, &config.file).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(
            reloaded.get_key("backend.base_url").unwrap().as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(reloaded.exchange_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn write_under_a_file_names_the_failed_step() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("config.toml");

        let err = Config::write_atomic(&path, &Config::default().file).unwrap_err();

        match &err {
            ConfigError::Io { action, path: at, .. } => {
                assert_eq!(*action, "create");
                assert_eq!(at, &blocker);
            }
            other => panic!("expected an io error, got {:?}", other),
        }
        assert!(err.to_string().contains("not-a-dir"));
    }

    #[test]
    fn missing_file_read_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Io { action: "read", .. })
        ));
    }

    #[test]
    fn set_key_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set_key("bootstrap.exchange_timeout_secs", "soon").is_err());
        assert!(config.set_key("secrets.provider", "vault").is_err());
        assert!(matches!(
            config.set_key("nope", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn every_listed_key_is_readable() {
        let config = Config::default();
        for key in Config::KEYS {
            config.get_key(key).expect("known key");
        }
    }
}
