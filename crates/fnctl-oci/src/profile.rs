//! `~/.oci/config` profiles
//!
//! A profile fills in the signing credentials the context leaves unset.
//! Keys a named profile lacks are taken from its `[DEFAULT]` section.

use fnctl_core::config::{
    ORACLE_FINGERPRINT, ORACLE_KEY_FILE, ORACLE_PASS_PHRASE, ORACLE_PROFILE, ORACLE_TENANCY_ID,
    ORACLE_USER_ID,
};
use fnctl_core::{ConfigSource, FnError, Result};
use ini::Ini;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Context key and the profile file key standing in for it
const PROFILE_KEYS: &[(&str, &str)] = &[
    (ORACLE_TENANCY_ID, "tenancy"),
    (ORACLE_USER_ID, "user"),
    (ORACLE_FINGERPRINT, "fingerprint"),
    (ORACLE_KEY_FILE, "key_file"),
    (ORACLE_PASS_PHRASE, "pass_phrase"),
];

/// `~/.oci/config`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".oci").join("config"))
}

/// Credentials from one profile, keyed by the matching context key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OciProfile {
    values: HashMap<String, String>,
}

impl OciProfile {
    /// Profile `name` from the file at `path`
    pub fn load(path: &Path, name: &str) -> Result<Option<Self>> {
        let ini = Ini::load_from_file_noescape(path).map_err(|e| {
            FnError::Config(format!(
                "unable to read OCI config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::from_ini(&ini, name))
    }

    fn from_ini(ini: &Ini, name: &str) -> Option<Self> {
        let section = ini.section(Some(name))?;
        let defaults = ini.section(Some(DEFAULT_PROFILE));

        let values = PROFILE_KEYS
            .iter()
            .filter_map(|(context_key, file_key)| {
                section
                    .get(file_key)
                    .or_else(|| defaults.and_then(|d| d.get(file_key)))
                    .filter(|v| !v.is_empty())
                    .map(|v| (context_key.to_string(), v.to_string()))
            })
            .collect();
        Some(Self { values })
    }

    /// Profile named by `oracle.profile` (default `DEFAULT`) from `path`.
    ///
    /// A missing file yields `None`. A missing profile is an error only
    /// when `oracle.profile` names it explicitly.
    pub fn discover(config: &dyn ConfigSource, path: Option<&Path>) -> Result<Option<Self>> {
        let Some(path) = path.filter(|p| p.is_file()) else {
            return Ok(None);
        };

        let configured = config.get_string(ORACLE_PROFILE);
        let name = if configured.is_empty() {
            DEFAULT_PROFILE
        } else {
            configured.as_str()
        };

        match Self::load(path, name)? {
            Some(profile) => {
                debug!(profile = name, path = %path.display(), "Using OCI config profile");
                Ok(Some(profile))
            }
            None if configured.is_empty() => Ok(None),
            None => Err(FnError::Config(format!(
                "profile {} not found in {}",
                name,
                path.display()
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Context values first, then the profile
pub struct WithProfile<'a> {
    config: &'a dyn ConfigSource,
    profile: Option<OciProfile>,
}

impl<'a> WithProfile<'a> {
    pub fn new(config: &'a dyn ConfigSource, profile: Option<OciProfile>) -> Self {
        Self { config, profile }
    }

    fn fallback(&self, key: &str) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.get(key))
    }
}

impl ConfigSource for WithProfile<'_> {
    fn get_string(&self, key: &str) -> String {
        let value = self.config.get_string(key);
        if !value.is_empty() {
            return value;
        }
        self.fallback(key).map(str::to_string).unwrap_or_default()
    }

    fn is_set(&self, key: &str) -> bool {
        self.config.is_set(key) || self.fallback(key).is_some()
    }
}
