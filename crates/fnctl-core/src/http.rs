//! Request building and response decoding shared by the backends

use crate::error::{ErrorBody, FnError, Result};
use crate::model::ResourceType;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// A request with an optional JSON body
pub fn json_request<T: Serialize + ?Sized>(
    method: Method,
    url: Url,
    body: Option<&T>,
) -> Result<Request> {
    let mut request = Request::new(method, url);
    request
        .headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(body) = body {
        let bytes = serde_json::to_vec(body)?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(bytes.into());
    }
    Ok(request)
}

/// Parse `base` and append `segments`, percent-encoding each one
pub fn join_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| FnError::InvalidEndpoint {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    {
        let mut path = url.path_segments_mut().map_err(|_| FnError::InvalidEndpoint {
            url: base.to_string(),
            reason: "URL cannot be a base".to_string(),
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Turn a non-success response into an [`FnError`].
///
/// A 404 becomes `NotFound` for `kind`/`subject`; other statuses go through
/// [`FnError::from_status`] with the server's message when one can be read.
pub async fn error_for_response(response: Response, kind: ResourceType, subject: &str) -> FnError {
    let status = response.status().as_u16();
    if status == 404 {
        return FnError::not_found(kind.short_name(), subject);
    }
    let message = match response.bytes().await {
        Ok(bytes) => ErrorBody::message_from(&bytes).or_else(|| {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            (!text.is_empty() && text.len() <= 512).then_some(text)
        }),
        Err(_) => None,
    };
    FnError::from_status(status, subject, message)
}

/// Decode a successful JSON response, or translate the failure
pub async fn decode<T: DeserializeOwned>(
    response: Response,
    kind: ResourceType,
    subject: &str,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_for_response(response, kind, subject).await);
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Accept any 2xx, discarding the body
pub async fn expect_success(response: Response, kind: ResourceType, subject: &str) -> Result<()> {
    if !response.status().is_success() {
        return Err(error_for_response(response, kind, subject).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_encodes_segments() {
        let url = join_url("http://localhost:8080/v2", &["apps", "my app"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v2/apps/my%20app");

        let url = join_url("http://localhost:8080/v2/", &["fns"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v2/fns");
    }

    #[test]
    fn test_json_request_sets_headers() {
        let url = Url::parse("http://localhost:8080/v2/apps").unwrap();
        let request = json_request(Method::POST, url, Some(&serde_json::json!({"name": "a"})))
            .unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(br#"{"name":"a"}"#.as_slice())
        );

        let url = Url::parse("http://localhost:8080/v2/apps").unwrap();
        let request = json_request::<()>(Method::GET, url, None).unwrap();
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }
}
