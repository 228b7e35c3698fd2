//! HTTP signature middleware for the managed cloud
//!
//! Each outbound request is stamped with a `Date`, framed (for body
//! methods) with `Content-Type`, `Content-Length` and `x-content-sha256`,
//! and signed with an RSA key over the configured header set. The result
//! lands in the `Authorization` header:
//!
//! ```text
//! Signature version="1",headers="date (request-target) host",keyId="...",algorithm="rsa-sha256",signature="..."
//! ```

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use fnctl_core::{FnError, Result, RoundTrip, SharedTransport};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HeaderValue};
use reqwest::{Method, Request};
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::trace;

pub const CONTENT_SHA256: &str = "x-content-sha256";
pub const REQUEST_TARGET: &str = "(request-target)";

/// Headers signed on every request
pub const BASE_HEADERS: &[&str] = &["date", REQUEST_TARGET];

/// Headers additionally signed on POST, PUT and PATCH
pub const BODY_HEADERS: &[&str] = &["content-length", "content-type", CONTENT_SHA256];

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Progress of one request through the signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningStage {
    Pristine,
    DateStamped,
    BodyFramed,
    Signed,
    InFlight,
    Succeeded,
    TransportError,
    HttpError,
}

/// Source of the current time for the `Date` header
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }
}

pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

fn has_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Signs requests with one RSA key
pub struct RequestSigner {
    key_id: String,
    key: SigningKey<Sha256>,
    base_headers: Vec<String>,
    body_headers: Vec<String>,
}

impl RequestSigner {
    pub fn new(key_id: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            key: SigningKey::<Sha256>::new(key),
            base_headers: BASE_HEADERS.iter().map(|h| h.to_string()).collect(),
            body_headers: BODY_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Replace the header set signed on every request; names are lowercased.
    pub fn with_base_headers(mut self, headers: &[&str]) -> Self {
        self.base_headers = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        self
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Ordered header names signed for `method`
    pub fn signed_headers(&self, method: &Method) -> Vec<&str> {
        let mut headers: Vec<&str> = self.base_headers.iter().map(String::as_str).collect();
        if has_body(method) {
            headers.extend(self.body_headers.iter().map(String::as_str));
        }
        headers
    }

    /// Frame the body of POST/PUT/PATCH requests.
    ///
    /// The body must already be buffered; streaming bodies cannot be
    /// measured and are rejected.
    pub fn frame_body(&self, request: &mut Request) -> Result<()> {
        if !has_body(request.method()) {
            return Ok(());
        }
        let body: Vec<u8> = match request.body() {
            None => Vec::new(),
            Some(body) => body
                .as_bytes()
                .ok_or_else(|| {
                    FnError::Transport("request body must be buffered before signing".into())
                })?
                .to_vec(),
        };
        let digest = STANDARD.encode(Sha256::digest(&body));

        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(CONTENT_SHA256, header_value(&digest)?);
        Ok(())
    }

    /// Canonical `name: value` lines joined by newlines
    pub fn signing_string(&self, request: &Request) -> Result<String> {
        let lines = self
            .signed_headers(request.method())
            .into_iter()
            .map(|name| -> Result<String> {
                let value = match name {
                    REQUEST_TARGET => request_target(request),
                    "host" => host(request),
                    other => request
                        .headers()
                        .get(other)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            FnError::Transport(format!("header '{}' missing for signing", other))
                        })?,
                };
                Ok(format!("{}: {}", name, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }

    /// Sign a framed request and set its `Authorization` header.
    pub fn sign(&self, request: &mut Request) -> Result<()> {
        let signing_string = self.signing_string(request)?;
        let signature = self.key.sign(signing_string.as_bytes());
        let authorization = format!(
            "Signature version=\"1\",headers=\"{}\",keyId=\"{}\",algorithm=\"rsa-sha256\",signature=\"{}\"",
            self.signed_headers(request.method()).join(" "),
            self.key_id,
            STANDARD.encode(signature.to_bytes())
        );
        let mut value = header_value(&authorization)?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

fn header_value(s: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(s).map_err(|e| FnError::Transport(format!("invalid header value: {}", e)))
}

/// `method path?query`, method lowercased
fn request_target(request: &Request) -> String {
    let url = request.url();
    let mut target = format!("{} {}", request.method().as_str().to_lowercase(), url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Host as it appears on the wire; default ports are omitted
fn host(request: &Request) -> String {
    let url = request.url();
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Round-tripper that signs and then delegates
pub struct OciSigningTransport {
    signer: Arc<RequestSigner>,
    clock: Arc<dyn Clock>,
    inner: SharedTransport,
}

impl OciSigningTransport {
    pub fn new(signer: Arc<RequestSigner>, inner: SharedTransport) -> Self {
        Self {
            signer,
            clock: Arc::new(SystemClock),
            inner,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the request through every stage up to `Signed`.
    pub fn prepare(&self, request: &mut Request) -> Result<()> {
        let mut stage = SigningStage::Pristine;
        trace!(?stage, url = %request.url(), "Signing request");

        if !request.headers().contains_key(DATE) {
            let now = self.clock.now().map_err(|e| {
                trace!(stage = ?SigningStage::TransportError, "Clock unavailable");
                FnError::Transport(format!("cannot stamp Date header: {}", e))
            })?;
            request
                .headers_mut()
                .insert(DATE, header_value(&http_date(now))?);
        }
        stage = SigningStage::DateStamped;
        trace!(?stage, "Date stamped");

        if has_body(request.method()) {
            self.signer.frame_body(request)?;
            stage = SigningStage::BodyFramed;
            trace!(?stage, "Body framed");
        }

        self.signer.sign(request)?;
        stage = SigningStage::Signed;
        trace!(?stage, key_id = self.signer.key_id(), "Request signed");
        Ok(())
    }
}

#[async_trait]
impl RoundTrip for OciSigningTransport {
    async fn round_trip(&self, mut request: Request) -> Result<reqwest::Response> {
        self.prepare(&mut request)?;
        trace!(stage = ?SigningStage::InFlight, "Sending signed request");

        match self.inner.round_trip(request).await {
            Ok(response) => {
                let stage = if response.status().is_success() {
                    SigningStage::Succeeded
                } else {
                    SigningStage::HttpError
                };
                trace!(?stage, status = response.status().as_u16(), "Signed request completed");
                Ok(response)
            }
            Err(err) => {
                trace!(stage = ?SigningStage::TransportError, error = %err, "Signed request failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> Result<DateTime<Utc>> {
            Ok(self.0)
        }
    }

    struct BrokenClock;

    impl Clock for BrokenClock {
        fn now(&self) -> Result<DateTime<Utc>> {
            Err(FnError::Transport("no clock".into()))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl RoundTrip for Unreachable {
        async fn round_trip(&self, _request: Request) -> Result<reqwest::Response> {
            Err(FnError::Transport("unreachable".into()))
        }
    }

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    fn transport(key: RsaPrivateKey, clock: Arc<dyn Clock>) -> OciSigningTransport {
        let signer = RequestSigner::new("tenancy/user/aa:bb", key)
            .with_base_headers(&["date", "(request-target)", "host"]);
        OciSigningTransport::new(Arc::new(signer), Arc::new(Unreachable)).with_clock(clock)
    }

    fn parse_authorization(value: &str) -> Vec<(String, String)> {
        value
            .trim_start_matches("Signature ")
            .split(',')
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.to_string(), v.trim_matches('"').to_string()))
            .collect()
    }

    #[test]
    fn test_http_date_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(http_date(at), "Mon, 01 Jan 2024 00:00:00 GMT");
    }

    #[test]
    fn test_adds_date_and_authorization() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        let transport = transport(test_key(), Arc::new(FixedClock(at)));

        let mut request = Request::new(
            Method::GET,
            "https://functions.example.com/20181201/applications?compartmentId=c1"
                .parse()
                .unwrap(),
        );
        transport.prepare(&mut request).unwrap();

        assert_eq!(request.headers()[DATE], "Mon, 01 Jan 2024 12:30:00 GMT");
        let auth = request.headers()[AUTHORIZATION].to_str().unwrap().to_string();
        assert!(auth.starts_with("Signature version=\"1\""));
        assert!(auth.contains("keyId=\"tenancy/user/aa:bb\""));
        assert!(auth.contains("headers=\"date (request-target) host\""));
        assert!(request.headers().get(CONTENT_SHA256).is_none());
    }

    #[test]
    fn test_existing_date_is_kept() {
        let transport = transport(test_key(), Arc::new(BrokenClock));
        let mut request = Request::new(Method::GET, "https://h/x".parse().unwrap());
        request.headers_mut().insert(
            DATE,
            HeaderValue::from_static("Tue, 02 Jan 2024 00:00:00 GMT"),
        );

        transport.prepare(&mut request).unwrap();
        assert_eq!(request.headers()[DATE], "Tue, 02 Jan 2024 00:00:00 GMT");
    }

    #[test]
    fn test_missing_clock_is_transport_error() {
        let transport = transport(test_key(), Arc::new(BrokenClock));
        let mut request = Request::new(Method::GET, "https://h/x".parse().unwrap());
        let err = transport.prepare(&mut request).unwrap_err();
        assert!(matches!(err, FnError::Transport(_)));
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_body_framing_and_signature_verifies() {
        let key = test_key();
        let public = key.to_public_key();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let transport = transport(key, Arc::new(FixedClock(at)));

        let body = br#"{"displayName":"hello"}"#.to_vec();
        let mut request = Request::new(
            Method::POST,
            "https://functions.example.com:8443/20181201/applications"
                .parse()
                .unwrap(),
        );
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        *request.body_mut() = Some(body.clone().into());

        transport.prepare(&mut request).unwrap();

        let headers = request.headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[CONTENT_LENGTH], body.len().to_string().as_str());
        assert_eq!(
            headers[CONTENT_SHA256].to_str().unwrap(),
            STANDARD.encode(Sha256::digest(&body))
        );

        let auth = parse_authorization(headers[AUTHORIZATION].to_str().unwrap());
        let field = |name: &str| {
            auth.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(
            field("headers"),
            "date (request-target) host content-length content-type x-content-sha256"
        );

        let expected = format!(
            "date: Mon, 01 Jan 2024 00:00:00 GMT\n\
             (request-target): post /20181201/applications\n\
             host: functions.example.com:8443\n\
             content-length: {}\n\
             content-type: application/json\n\
             x-content-sha256: {}",
            body.len(),
            STANDARD.encode(Sha256::digest(&body))
        );
        let signature_bytes = STANDARD.decode(field("signature")).unwrap();
        let signature = Signature::try_from(signature_bytes.as_slice()).unwrap();
        VerifyingKey::<Sha256>::new(public)
            .verify(expected.as_bytes(), &signature)
            .unwrap();
    }

    #[test]
    fn test_empty_put_body_is_framed() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let transport = transport(test_key(), Arc::new(FixedClock(at)));
        let mut request = Request::new(Method::PUT, "https://h/a".parse().unwrap());

        transport.prepare(&mut request).unwrap();
        assert_eq!(request.headers()[CONTENT_LENGTH], "0");
        assert_eq!(
            request.headers()[CONTENT_SHA256].to_str().unwrap(),
            STANDARD.encode(Sha256::digest(b""))
        );
    }

    #[tokio::test]
    async fn test_inner_failure_propagates() {
        let transport = transport(test_key(), Arc::new(SystemClock));
        let request = Request::new(Method::GET, "https://h/a".parse().unwrap());
        let err = transport.round_trip(request).await.unwrap_err();
        assert!(matches!(err, FnError::Transport(ref m) if m == "unreachable"));
    }
}
