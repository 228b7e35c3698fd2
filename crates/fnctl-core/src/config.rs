//! Config Source and Passphrase Source contracts
//!
//! Both are consumed by provider constructors. Loading the values from disk
//! is the job of `fnctl-config`; this module only fixes the interface and
//! the key names.

use crate::error::{FnError, Result};
use std::collections::HashMap;
use std::time::Duration;

pub const PROVIDER: &str = "provider";
pub const API_URL: &str = "api-url";
pub const TOKEN: &str = "token";
pub const CALL_URL: &str = "call-url";
pub const HTTP_TIMEOUT: &str = "http.timeout";
pub const HTTP_INSECURE: &str = "http.insecure";

pub const ORACLE_COMPARTMENT_ID: &str = "oracle.compartment-id";
pub const ORACLE_KEY_ID: &str = "oracle.key-id";
pub const ORACLE_KEY_FILE: &str = "oracle.key-file";
pub const ORACLE_PASS_PHRASE: &str = "oracle.pass-phrase";
pub const ORACLE_TENANCY_ID: &str = "oracle.tenancy-id";
pub const ORACLE_USER_ID: &str = "oracle.user-id";
pub const ORACLE_FINGERPRINT: &str = "oracle.fingerprint";
pub const ORACLE_DISABLE_CERTS: &str = "oracle.disable-certs";
/// Profile of `~/.oci/config` that fills in unset credentials
pub const ORACLE_PROFILE: &str = "oracle.profile";

/// Deadline applied when `http.timeout` is unset
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Lower bound for any configured deadline
pub const MIN_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only key/value lookup
pub trait ConfigSource: Send + Sync {
    /// Value for `key`, or an empty string when unset
    fn get_string(&self, key: &str) -> String;

    fn get_bool(&self, key: &str) -> bool {
        matches!(
            self.get_string(key).trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    }

    fn is_set(&self, key: &str) -> bool;
}

/// In-memory source, used for tests and for literal overrides
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfigSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfigSource {
    fn get_string(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Parse an `http.timeout` value: `30`, `30s`, `500ms` or `2m`.
///
/// Bare integers are seconds. Results below [`MIN_HTTP_TIMEOUT`] are raised
/// to it.
pub fn parse_timeout(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || {
        FnError::Config(format!(
            "invalid {} '{}': expected e.g. 30, 30s, 500ms or 2m",
            HTTP_TIMEOUT, raw
        ))
    };

    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        _ => return Err(invalid()),
    };
    Ok(duration.max(MIN_HTTP_TIMEOUT))
}

/// Deadline configured for a source, falling back to [`DEFAULT_HTTP_TIMEOUT`]
pub fn http_timeout(config: &dyn ConfigSource) -> Result<Duration> {
    if !config.is_set(HTTP_TIMEOUT) || config.get_string(HTTP_TIMEOUT).trim().is_empty() {
        return Ok(DEFAULT_HTTP_TIMEOUT);
    }
    parse_timeout(&config.get_string(HTTP_TIMEOUT))
}

/// Prompts for a secret on demand
pub trait PassphraseSource: Send + Sync {
    /// Ask for the secret identified by `id`. May refuse with an error.
    fn challenge(&self, id: &str, prompt: &str) -> Result<String>;
}

/// Passphrase source that always refuses
#[derive(Debug, Clone, Copy, Default)]
pub struct NopPassphraseSource;

impl PassphraseSource for NopPassphraseSource {
    fn challenge(&self, id: &str, _prompt: &str) -> Result<String> {
        Err(FnError::Key(format!(
            "a pass phrase is required for '{}' but no prompt is available",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source() {
        let config = MapConfigSource::new()
            .with(API_URL, "http://localhost:8080")
            .with(HTTP_INSECURE, "true");

        assert!(config.is_set(API_URL));
        assert!(!config.is_set(TOKEN));
        assert_eq!(config.get_string(TOKEN), "");
        assert!(config.get_bool(HTTP_INSECURE));
        assert!(!config.get_bool(TOKEN));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_timeout("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        // clamped to the minimum
        assert_eq!(parse_timeout("500ms").unwrap(), MIN_HTTP_TIMEOUT);
        assert_eq!(parse_timeout("5").unwrap(), MIN_HTTP_TIMEOUT);
        assert!(parse_timeout("soon").is_err());
        assert!(parse_timeout("10h").is_err());
    }

    #[test]
    fn test_http_timeout_default() {
        let config = MapConfigSource::new();
        assert_eq!(http_timeout(&config).unwrap(), DEFAULT_HTTP_TIMEOUT);

        let config = MapConfigSource::new().with(HTTP_TIMEOUT, "");
        assert_eq!(http_timeout(&config).unwrap(), DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_nop_passphrase_refuses() {
        let err = NopPassphraseSource.challenge("key", "Pass phrase:").unwrap_err();
        assert!(matches!(err, FnError::Key(_)));
    }
}
