//! Store configuration
//!
//! Resolution priority, highest first:
//! 1. Explicit `with_*` overrides (CLI flags)
//! 2. `FRAMER_*` environment variables
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! ```toml
//! mode = "remote"
//! base_url = "http://localhost:8000"
//! request_timeout_secs = 30
//! current_user = "alice"
//! language = "zh"
//!
//! [policy]
//! require_reviewer = true
//! ```

use crate::error::ConfigError;
use framer_core::heuristics::DEFAULT_JITTER;
use framer_core::{Language, TransitionPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default request bound in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default acting user when none is configured
pub const DEFAULT_USER: &str = "local-user";

/// Synchronization mode, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// In-memory only; AI results are synthesized by heuristics
    #[default]
    LocalOnly,
    /// Every mutation is mirrored to a backend
    Remote,
}

impl SyncMode {
    /// Config string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::LocalOnly => "local_only",
            SyncMode::Remote => "remote",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local" | "local_only" | "mock" => Ok(SyncMode::LocalOnly),
            "remote" | "http" | "api" => Ok(SyncMode::Remote),
            _ => Err(ConfigError::invalid("mode", s)),
        }
    }
}

/// Frame store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local-only or remote-backed
    pub mode: SyncMode,
    /// Backend base URL (routes live under `/api`)
    pub base_url: String,
    /// Bound on every remote call
    pub request_timeout_secs: u64,
    /// Acting user; owner of created frames and author of comments
    pub current_user: String,
    /// Display language for heuristics and fallback
    pub language: Language,
    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Heuristic sub-score jitter in local-only mode
    pub heuristic_jitter: u8,
    /// Reviewer/approver gates
    pub policy: TransitionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            current_user: DEFAULT_USER.to_string(),
            language: Language::default(),
            auth_token: None,
            heuristic_jitter: DEFAULT_JITTER,
            policy: TransitionPolicy::default(),
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw)),
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::invalid(key, raw))
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Local-only configuration acting as `user`
    #[must_use]
    pub fn local(user: impl Into<String>) -> Self {
        Self::default().with_current_user(user)
    }

    /// Parse TOML; absent keys keep their defaults
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if unreadable, [`ConfigError::Parse`] if malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Overlay `FRAMER_*` variables from the process environment
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if a variable is set but unparseable.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay `FRAMER_*` variables from `lookup`
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if a variable is set but unparseable.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FRAMER_MODE") {
            self.mode = v.parse()?;
        }
        if let Some(v) = get("FRAMER_BASE_URL") {
            self.base_url = v.trim().to_string();
        }
        if let Some(v) = get("FRAMER_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("FRAMER_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("FRAMER_USER") {
            self.current_user = v.trim().to_string();
        }
        if let Some(v) = get("FRAMER_LANGUAGE") {
            self.language = v
                .parse()
                .map_err(|_| ConfigError::invalid("FRAMER_LANGUAGE", v.as_str()))?;
        }
        if let Some(v) = get("FRAMER_AUTH_TOKEN") {
            self.auth_token = Some(v);
        }
        if let Some(v) = get("FRAMER_REQUIRE_REVIEWER") {
            self.policy.require_reviewer = parse_bool("FRAMER_REQUIRE_REVIEWER", &v)?;
        }
        if let Some(v) = get("FRAMER_REQUIRE_APPROVER") {
            self.policy.require_approver = parse_bool("FRAMER_REQUIRE_APPROVER", &v)?;
        }
        if let Some(v) = get("FRAMER_HEURISTIC_JITTER") {
            self.heuristic_jitter = parse_number("FRAMER_HEURISTIC_JITTER", &v)?;
        }
        Ok(self)
    }

    /// File (if given) then environment; call [`SyncConfig::validate`]
    /// after applying CLI overrides
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from reading or overlaying.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.apply_env()
    }

    /// Check values that would make the store unusable
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "0"));
        }
        if self.current_user.trim().is_empty() {
            return Err(ConfigError::invalid("current_user", self.current_user.as_str()));
        }
        if self.mode == SyncMode::Remote
            && !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid("base_url", self.base_url.as_str()));
        }
        Ok(())
    }

    /// With mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// With backend base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// With request timeout (whole seconds, at least one)
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With acting user
    #[inline]
    #[must_use]
    pub fn with_current_user(mut self, user: impl Into<String>) -> Self {
        self.current_user = user.into();
        self
    }

    /// With display language
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// With bearer token
    #[inline]
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// With transition gates
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With heuristic jitter
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, jitter: u8) -> Self {
        self.heuristic_jitter = jitter;
        self
    }

    /// Remote call bound
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }

    /// Render as TOML with the token masked
    ///
    /// # Errors
    ///
    /// Only if serialization itself fails.
    pub fn to_toml_redacted(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.auth_token.is_some() {
            shown.auth_token = Some("***".to_string());
        }
        toml::to_string_pretty(&shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.mode, SyncMode::LocalOnly);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.api_root(), "http://localhost:8000/api");
        assert!(!config.policy.require_reviewer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            mode = "remote"
            base_url = "https://framer.example.com/"

            [policy]
            require_approver = true
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, SyncMode::Remote);
        assert_eq!(config.api_root(), "https://framer.example.com/api");
        assert!(config.policy.require_approver);
        assert!(!config.policy.require_reviewer);
        assert_eq!(config.current_user, DEFAULT_USER);
    }

    #[test]
    fn env_overrides_file() {
        let config = SyncConfig::from_toml_str("current_user = \"alice\"\nrequest_timeout_secs = 10")
            .unwrap()
            .apply_env_from(env(&[
                ("FRAMER_USER", "bob"),
                ("FRAMER_LANGUAGE", "zh-CN"),
                ("FRAMER_REQUIRE_REVIEWER", "yes"),
                ("FRAMER_MODE", ""),
            ]))
            .unwrap();
        assert_eq!(config.current_user, "bob");
        assert_eq!(config.language, Language::Zh);
        assert_eq!(config.request_timeout_secs, 10);
        assert!(config.policy.require_reviewer);
        assert_eq!(config.mode, SyncMode::LocalOnly);
    }

    #[test]
    fn builders_override_env() {
        let config = SyncConfig::new()
            .apply_env_from(env(&[("FRAMER_TIMEOUT_SECS", "5")]))
            .unwrap()
            .with_timeout(Duration::from_secs(60));
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn bad_env_value_is_error() {
        let err = SyncConfig::new()
            .apply_env_from(env(&[("FRAMER_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FRAMER_TIMEOUT_SECS", .. }));

        let err = SyncConfig::new()
            .apply_env_from(env(&[("FRAMER_MODE", "hybrid")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "mode", .. }));
    }

    #[test]
    fn validation() {
        assert!(SyncConfig::new()
            .with_mode(SyncMode::Remote)
            .with_base_url("localhost:8000")
            .validate()
            .is_err());
        assert!(SyncConfig::local(" ").validate().is_err());
    }

    #[test]
    fn redacted_toml_hides_token() {
        let rendered = SyncConfig::new()
            .with_auth_token("secret")
            .to_toml_redacted()
            .unwrap();
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("secret"));
    }
}
