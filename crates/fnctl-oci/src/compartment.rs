//! Compartment header injection

use async_trait::async_trait;
use fnctl_core::{FnError, Result, RoundTrip, SharedTransport};
use reqwest::header::HeaderValue;

pub const COMPARTMENT_HEADER: &str = "opc-compartment-id";

/// Sets `opc-compartment-id` on every request.
///
/// Placed outside the signer, so the header is present when the signature
/// is computed.
pub struct CompartmentInjector {
    compartment_id: HeaderValue,
    inner: SharedTransport,
}

impl CompartmentInjector {
    pub fn new(compartment_id: &str, inner: SharedTransport) -> Result<Self> {
        let compartment_id = HeaderValue::from_str(compartment_id).map_err(|_| {
            FnError::Config(format!(
                "compartment id '{}' is not a valid header value",
                compartment_id
            ))
        })?;
        Ok(Self {
            compartment_id,
            inner,
        })
    }
}

#[async_trait]
impl RoundTrip for CompartmentInjector {
    async fn round_trip(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        request
            .headers_mut()
            .insert(COMPARTMENT_HEADER, self.compartment_id.clone());
        self.inner.round_trip(request).await
    }
}
