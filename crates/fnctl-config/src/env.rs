use fnctl_core::ConfigSource;
use fnctl_core::config::{API_URL, PROVIDER, TOKEN};
use std::collections::HashMap;

/// Environment variable and the key it overrides
pub const OVERRIDES: &[(&str, &str)] = &[
    ("API_URL", API_URL),
    ("FN_TOKEN", TOKEN),
    ("FN_PROVIDER", PROVIDER),
];

/// Config Source with a few keys overridden from the environment.
///
/// The environment is read once, at construction.
#[derive(Debug, Clone)]
pub struct EnvOverrides<C> {
    inner: C,
    overrides: HashMap<&'static str, String>,
}

impl<C: ConfigSource> EnvOverrides<C> {
    pub fn new(inner: C) -> Self {
        let overrides = OVERRIDES
            .iter()
            .filter_map(|(var, key)| {
                std::env::var(var)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|v| (*key, v))
            })
            .collect();
        Self { inner, overrides }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: ConfigSource> ConfigSource for EnvOverrides<C> {
    fn get_string(&self, key: &str) -> String {
        match self.overrides.get(key) {
            Some(value) => value.clone(),
            None => self.inner.get_string(key),
        }
    }

    fn is_set(&self, key: &str) -> bool {
        self.overrides.contains_key(key) || self.inner.is_set(key)
    }
}
