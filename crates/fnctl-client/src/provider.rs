//! Provider variant and registry

use fnctl_core::config::PROVIDER;
use fnctl_core::{
    ApiUrl, ConfigSource, FnError, PassphraseSource, ResourceApiClient, ResourceType, Result,
    RetryPolicy, SharedTransport,
};
use fnctl_oci::OracleProvider;
use fnctl_oss::OssProvider;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Registry id of the open-source provider; also used for an empty id
pub const DEFAULT_PROVIDER: &str = "default";

/// Registry id of the managed-cloud provider
pub const ORACLE_PROVIDER: &str = "oracle";

/// A configured backend, resolved once at start-up
#[derive(Debug)]
pub enum Provider {
    OpenSource(OssProvider),
    ManagedCloud(OracleProvider),
}

impl Provider {
    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenSource(_) => DEFAULT_PROVIDER,
            Provider::ManagedCloud(_) => ORACLE_PROVIDER,
        }
    }

    /// Canonical base URL, always with an explicit port
    pub fn api_url(&self) -> &ApiUrl {
        match self {
            Provider::OpenSource(p) => p.api_url(),
            Provider::ManagedCloud(p) => p.api_url(),
        }
    }

    /// Base for route-style invoke URLs
    pub fn call_url(&self) -> &ApiUrl {
        match self {
            Provider::OpenSource(p) => p.call_url(),
            Provider::ManagedCloud(p) => p.call_url(),
        }
    }

    /// The shared base transport built at construction
    pub fn transport(&self) -> SharedTransport {
        match self {
            Provider::OpenSource(p) => p.transport(),
            Provider::ManagedCloud(p) => p.transport(),
        }
    }

    /// Wrap `inner` with whatever the backend needs on invocation calls
    pub fn wrap_call_transport(&self, inner: SharedTransport) -> Result<SharedTransport> {
        match self {
            Provider::OpenSource(p) => Ok(p.wrap_call_transport(inner)),
            Provider::ManagedCloud(p) => p.wrap_call_transport(inner),
        }
    }

    pub fn api_client_v2(&self) -> Result<ResourceApiClient> {
        match self {
            Provider::OpenSource(p) => p.api_client_v2(),
            Provider::ManagedCloud(p) => p.api_client_v2(),
        }
    }

    pub fn unavailable_resources(&self) -> BTreeSet<ResourceType> {
        match self {
            Provider::OpenSource(p) => p.unavailable_resources(),
            Provider::ManagedCloud(p) => p.unavailable_resources(),
        }
    }

    /// Attempt budget for updates that hit a stale version
    pub fn update_retry(&self) -> RetryPolicy {
        match self {
            Provider::OpenSource(p) => p.update_retry(),
            Provider::ManagedCloud(p) => p.update_retry(),
        }
    }
}

impl From<OssProvider> for Provider {
    fn from(provider: OssProvider) -> Self {
        Provider::OpenSource(provider)
    }
}

impl From<OracleProvider> for Provider {
    fn from(provider: OracleProvider) -> Self {
        Provider::ManagedCloud(provider)
    }
}

/// Builds a provider from configuration
pub type ProviderConstructor = fn(&dyn ConfigSource, &dyn PassphraseSource) -> Result<Provider>;

fn open_source(config: &dyn ConfigSource, _passphrase: &dyn PassphraseSource) -> Result<Provider> {
    Ok(OssProvider::from_config(config)?.into())
}

fn managed_cloud(config: &dyn ConfigSource, passphrase: &dyn PassphraseSource) -> Result<Provider> {
    Ok(OracleProvider::from_config(config, passphrase)?.into())
}

/// Provider id to constructor mapping
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DEFAULT_PROVIDER, open_source);
        registry.register(ORACLE_PROVIDER, managed_cloud);
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ProviderRegistry {
    /// Registry with the built-in providers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register `constructor` under `id`, replacing any previous entry
    pub fn register(&mut self, id: impl Into<String>, constructor: ProviderConstructor) {
        self.constructors.insert(id.into(), constructor);
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Construct the provider registered under `id`; empty means default
    pub fn create(
        &self,
        id: &str,
        config: &dyn ConfigSource,
        passphrase: &dyn PassphraseSource,
    ) -> Result<Provider> {
        let id = if id.is_empty() { DEFAULT_PROVIDER } else { id };
        let constructor = self
            .constructors
            .get(id)
            .ok_or_else(|| FnError::UnknownProvider(id.to_string()))?;
        debug!(provider = id, "Constructing provider");
        constructor(config, passphrase)
    }

    /// Construct the provider named by the `provider` config key
    pub fn from_config(
        &self,
        config: &dyn ConfigSource,
        passphrase: &dyn PassphraseSource,
    ) -> Result<Provider> {
        self.create(&config.get_string(PROVIDER), config, passphrase)
    }
}
