//! Top-level client facade

use crate::invoke::Invoker;
use crate::provider::{Provider, ProviderRegistry};
use crate::resource::ResourceClient;
use fnctl_core::config::{self, DEFAULT_HTTP_TIMEOUT};
use fnctl_core::{
    App, CallContext, ConfigSource, Function, PassphraseSource, Resource, Result,
    SharedCollection, SharedDiagnostics, Trigger,
};
use std::collections::BTreeSet;
use std::time::Duration;

/// Resource clients and invocation for one configured provider
pub struct Client {
    provider: Provider,
    apps: ResourceClient<App>,
    functions: ResourceClient<Function>,
    triggers: ResourceClient<Trigger>,
    diagnostics: SharedDiagnostics,
    timeout: Duration,
}

fn resource_client<R: Resource>(
    api: SharedCollection<R>,
    provider: &Provider,
    unavailable: &BTreeSet<fnctl_core::ResourceType>,
    diagnostics: &SharedDiagnostics,
) -> ResourceClient<R> {
    let client = ResourceClient::new(api, diagnostics.clone())
        .with_update_attempts(provider.update_retry().max_attempts);
    if unavailable.contains(&R::TYPE) {
        client.unavailable()
    } else {
        client
    }
}

impl Client {
    pub fn new(provider: Provider, diagnostics: SharedDiagnostics) -> Result<Self> {
        let api = provider.api_client_v2()?;
        let unavailable = provider.unavailable_resources();
        Ok(Self {
            apps: resource_client(api.apps, &provider, &unavailable, &diagnostics),
            functions: resource_client(api.functions, &provider, &unavailable, &diagnostics),
            triggers: resource_client(api.triggers, &provider, &unavailable, &diagnostics),
            provider,
            diagnostics,
            timeout: DEFAULT_HTTP_TIMEOUT,
        })
    }

    /// Select the provider named in `config` from the built-in registry
    pub fn from_config(
        config: &dyn ConfigSource,
        passphrase: &dyn PassphraseSource,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        let provider = ProviderRegistry::new().from_config(config, passphrase)?;
        Ok(Self::new(provider, diagnostics)?.with_timeout(config::http_timeout(config)?))
    }

    /// Deadline used by [`Client::context`]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A fresh call context carrying the configured deadline
    pub fn context(&self) -> CallContext {
        CallContext::new(self.timeout)
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn apps(&self) -> &ResourceClient<App> {
        &self.apps
    }

    pub fn functions(&self) -> &ResourceClient<Function> {
        &self.functions
    }

    pub fn triggers(&self) -> &ResourceClient<Trigger> {
        &self.triggers
    }

    pub fn diagnostics(&self) -> SharedDiagnostics {
        self.diagnostics.clone()
    }

    /// Invoker over the provider's call transport
    pub fn invoker(&self) -> Result<Invoker> {
        let transport = self
            .provider
            .wrap_call_transport(self.provider.transport())?;
        Ok(Invoker::new(transport, self.diagnostics.clone()))
    }

    /// Route-style invoke URL `<call-url>/r/<app><route>`
    pub fn route_url(&self, app: &str, route: &str) -> String {
        let base = self.provider.call_url().to_string();
        let route = route.trim_start_matches('/');
        format!("{}/r/{}/{}", base.trim_end_matches('/'), app, route)
    }
}
