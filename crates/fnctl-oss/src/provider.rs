//! Open-source provider

use crate::api::resource_api_client;
use fnctl_core::config::{self, API_URL, CALL_URL, HTTP_INSECURE, TOKEN};
use fnctl_core::{
    ApiUrl, BearerAuth, ConfigSource, HttpTransport, ResourceApiClient, ResourceType, Result,
    RetryPolicy, SharedTransport,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Endpoint used when `api-url` is not configured
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Prefix of the resource API
pub const API_PREFIX: &str = "/v2";

/// Provider for a self-hosted control plane
pub struct OssProvider {
    api_url: ApiUrl,
    call_url: Option<ApiUrl>,
    token: String,
    transport: SharedTransport,
}

impl std::fmt::Debug for OssProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssProvider")
            .field("api_url", &self.api_url)
            .field("call_url", &self.call_url)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl OssProvider {
    /// Build from configuration; the HTTP client is created here once.
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self> {
        let raw = config.get_string(API_URL);
        let api_url = ApiUrl::parse(if raw.is_empty() { DEFAULT_API_URL } else { &raw })?;

        let raw_call = config.get_string(CALL_URL);
        let call_url = if raw_call.is_empty() {
            None
        } else {
            Some(ApiUrl::parse(&raw_call)?)
        };

        let timeout = config::http_timeout(config)?;
        let transport =
            HttpTransport::new(timeout, config.get_bool(HTTP_INSECURE))?.shared();

        debug!(api_url = %api_url, "Configured open-source provider");
        Ok(Self {
            api_url,
            call_url,
            token: config.get_string(TOKEN),
            transport,
        })
    }

    /// Build around an existing base transport
    pub fn new(api_url: ApiUrl, token: impl Into<String>, transport: SharedTransport) -> Self {
        Self {
            api_url,
            call_url: None,
            token: token.into(),
            transport,
        }
    }

    pub fn with_call_url(mut self, call_url: ApiUrl) -> Self {
        self.call_url = Some(call_url);
        self
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    /// Base for route-style invoke URLs; `call-url` when set, else `api-url`
    pub fn call_url(&self) -> &ApiUrl {
        self.call_url.as_ref().unwrap_or(&self.api_url)
    }

    /// Base transport shared by every request of this provider
    pub fn transport(&self) -> SharedTransport {
        self.transport.clone()
    }

    /// Invocation calls are sent unmodified
    pub fn wrap_call_transport(&self, inner: SharedTransport) -> SharedTransport {
        inner
    }

    /// `/v2` client, with bearer authentication when a token is configured
    pub fn api_client_v2(&self) -> Result<ResourceApiClient> {
        let transport = BearerAuth::wrap(&self.token, self.transport.clone())?;
        Ok(resource_api_client(
            &self.api_url.with_prefix(API_PREFIX),
            transport,
        ))
    }

    pub fn unavailable_resources(&self) -> BTreeSet<ResourceType> {
        BTreeSet::new()
    }

    /// The server merges updates itself, so there is nothing to reconcile
    pub fn update_retry(&self) -> RetryPolicy {
        RetryPolicy::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnctl_core::MapConfigSource;

    #[test]
    fn test_defaults() {
        let provider = OssProvider::from_config(&MapConfigSource::new()).unwrap();
        assert_eq!(provider.api_url().to_string(), "http://localhost:8080");
        assert_eq!(provider.call_url(), provider.api_url());
        assert!(provider.unavailable_resources().is_empty());
        assert_eq!(provider.update_retry().max_attempts, 1);
    }

    #[test]
    fn test_api_url_is_canonicalized() {
        let config = MapConfigSource::new()
            .with(API_URL, "fn.example.com")
            .with(CALL_URL, "https://lb.example.com");
        let provider = OssProvider::from_config(&config).unwrap();
        assert_eq!(provider.api_url().to_string(), "http://fn.example.com:80");
        assert_eq!(provider.call_url().port(), 443);
    }

    #[test]
    fn test_invalid_api_url() {
        let config = MapConfigSource::new().with(API_URL, "http://");
        let err = OssProvider::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), fnctl_core::ErrorKind::InvalidEndpoint);
    }

    #[test]
    fn test_debug_hides_token() {
        let config = MapConfigSource::new().with(TOKEN, "s3cret");
        let provider = OssProvider::from_config(&config).unwrap();
        assert!(!format!("{:?}", provider).contains("s3cret"));
    }
}
