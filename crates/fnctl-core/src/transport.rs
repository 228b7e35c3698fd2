//! HTTP round-tripper abstraction and the base transport
//!
//! Every outbound request in fnctl flows through a stack of [`RoundTrip`]
//! layers. Each layer takes ownership of a [`reqwest::Request`], may edit
//! it, and hands it to the layer below; the bottom layer is
//! [`HttpTransport`], which owns the shared `reqwest::Client`.
//!
//! ```text
//! caller ─▶ [middleware ...] ─▶ HttpTransport ─▶ network
//! ```

use crate::error::{FnError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One hop of the request pipeline
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

pub type SharedTransport = Arc<dyn RoundTrip>;

/// Base transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the process-wide client.
    ///
    /// `insecure` disables certificate verification and is meant for test
    /// endpoints only.
    pub fn new(timeout: Duration, insecure: bool) -> Result<Self> {
        if insecure {
            tracing::warn!("TLS certificate verification is disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .user_agent(concat!("fnctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FnError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn shared(self) -> SharedTransport {
        Arc::new(self)
    }
}

#[async_trait]
impl RoundTrip for HttpTransport {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(
            method = %request.method(),
            url = %request.url(),
            headers = ?redacted(request.headers()),
            "HTTP request"
        );
        let response = self.client.execute(request).await?;
        debug!(
            status = response.status().as_u16(),
            headers = ?redacted(response.headers()),
            "HTTP response"
        );
        Ok(response)
    }
}

/// Header dump with credentials masked
pub fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                "[redacted]".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

/// Adds `Authorization: Bearer <token>` to every request
pub struct BearerAuth {
    token: HeaderValue,
    inner: SharedTransport,
}

impl BearerAuth {
    pub fn new(token: &str, inner: SharedTransport) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| FnError::Config("token contains invalid header characters".into()))?;
        value.set_sensitive(true);
        Ok(Self {
            token: value,
            inner,
        })
    }

    /// Wrap `inner` when `token` is non-empty, otherwise return it unchanged.
    pub fn wrap(token: &str, inner: SharedTransport) -> Result<SharedTransport> {
        if token.is_empty() {
            return Ok(inner);
        }
        Ok(Arc::new(Self::new(token, inner)?))
    }
}

#[async_trait]
impl RoundTrip for BearerAuth {
    async fn round_trip(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.token.clone());
        self.inner.round_trip(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_bearer_auth_adds_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/apps"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let base = HttpTransport::new(Duration::from_secs(30), false)
            .unwrap()
            .shared();
        let transport = BearerAuth::wrap("s3cret", base).unwrap();

        let request = reqwest::Request::new(
            reqwest::Method::GET,
            format!("{}/v2/apps", server.uri()).parse().unwrap(),
        );
        let response = tokio_test::assert_ok!(transport.round_trip(request).await);
        assert_eq!(response.status().as_u16(), 200);
    }

    #[test]
    fn test_redacted_hides_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        headers.insert("fn-call-id", HeaderValue::from_static("abc"));

        let dump = redacted(&headers);
        assert!(dump.contains(&("authorization".to_string(), "[redacted]".to_string())));
        assert!(dump.contains(&("fn-call-id".to_string(), "abc".to_string())));
    }

    #[test]
    fn test_empty_token_is_identity() {
        let base: SharedTransport = HttpTransport::new(Duration::from_secs(30), false)
            .unwrap()
            .shared();
        let wrapped = BearerAuth::wrap("", base.clone()).unwrap();
        assert!(Arc::ptr_eq(&base, &wrapped));
    }
}
