//! Function Invocation Transport
//!
//! Invocations bypass the resource API: the request is built here, sent
//! through the provider's call transport (signed on the managed cloud), and
//! the response is classified as synchronous output or an asynchronous
//! acknowledgement.

use fnctl_core::{
    CallContext, FnError, Function, Result, SharedDiagnostics, SharedTransport,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Request bodies are truncated to this many bytes
pub const MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

/// Present on synchronous responses
pub const CALL_ID_HEADER: &str = "Fn_call_id";

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

pub const INVOKE_ENDPOINT_ANNOTATION: &str = "fnproject.io/fn/invokeEndpoint";

/// Which environment variables travel as request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSelection {
    /// Every variable of the process environment
    Inherit,
    /// Only these names; an empty list sends none
    Names(Vec<String>),
}

impl Default for EnvSelection {
    fn default() -> Self {
        EnvSelection::Names(Vec::new())
    }
}

impl EnvSelection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnvSelection::Names(names.into_iter().map(Into::into).collect())
    }

    /// Resolve against the process environment. A selected name that is
    /// unset is sent with an empty value; names that do not form a valid
    /// header are skipped.
    pub fn headers(&self) -> HeaderMap {
        let vars: Vec<(String, String)> = match self {
            EnvSelection::Inherit => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            EnvSelection::Names(names) => names
                .iter()
                .map(|name| (name.clone(), std::env::var(name).unwrap_or_default()))
                .collect(),
        };

        let mut headers = HeaderMap::new();
        for (name, value) in vars {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(name = %name, "Skipping environment variable that is not a valid header"),
            }
        }
        headers
    }
}

/// Everything about an invocation except the body and the output sink
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub url: String,
    /// Empty means `text/plain`
    pub content_type: String,
    pub env: EnvSelection,
    /// POST with a body, GET without, unless set
    pub method: Option<Method>,
    /// Write `Call ID: <id>` for synchronous calls too
    pub display_call_id: bool,
}

impl InvokeOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: String::new(),
            env: EnvSelection::none(),
            method: None,
            display_call_id: false,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_env(mut self, env: EnvSelection) -> Self {
        self.env = env;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_display_call_id(mut self, display: bool) -> Self {
        self.display_call_id = display;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallEnvelope {
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    error: Option<CallError>,
}

#[derive(Debug, Default, Deserialize)]
struct CallError {
    #[serde(default)]
    message: Option<String>,
}

/// Invoke URL advertised by a function, if its provider exposes one
pub fn invoke_url_for(function: &Function) -> Result<String> {
    function
        .annotations
        .get(INVOKE_ENDPOINT_ANNOTATION)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            FnError::NotSupported(format!(
                "function {} does not expose an invoke endpoint",
                function.name
            ))
        })
}

/// Read at most [`MAX_BODY_BYTES`] from `reader`; the rest is left unread
pub async fn read_body<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(MAX_BODY_BYTES).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Sends invocation requests and routes their responses
#[derive(Clone)]
pub struct Invoker {
    transport: SharedTransport,
    diagnostics: SharedDiagnostics,
}

impl Invoker {
    /// `transport` should already carry the provider's call wrapping
    pub fn new(transport: SharedTransport, diagnostics: SharedDiagnostics) -> Self {
        Self {
            transport,
            diagnostics,
        }
    }

    /// Build the outbound request for a captured body
    pub fn prepare(&self, options: &InvokeOptions, body: Option<Vec<u8>>) -> Result<Request> {
        let url = Url::parse(&options.url).map_err(|e| FnError::InvalidEndpoint {
            url: options.url.clone(),
            reason: e.to_string(),
        })?;
        let method = options.method.clone().unwrap_or(if body.is_some() {
            Method::POST
        } else {
            Method::GET
        });

        let mut request = Request::new(method, url);
        let headers = request.headers_mut();
        headers.extend(options.env.headers());

        let content_type = if options.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            options.content_type.as_str()
        };
        let content_type = HeaderValue::from_str(content_type).map_err(|_| {
            FnError::InvalidArgument(format!("invalid content type '{}'", content_type))
        })?;
        headers.insert(CONTENT_TYPE, content_type);

        if let Some(body) = body {
            *request.body_mut() = Some(body.into());
        }
        Ok(request)
    }

    /// Invoke and write the function's output to `output`
    pub async fn invoke<R, W>(
        &self,
        ctx: &CallContext,
        options: &InvokeOptions,
        body: Option<R>,
        output: &mut W,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let body = match body {
            Some(reader) => Some(read_body(reader).await?),
            None => None,
        };
        let request = self.prepare(options, body)?;
        self.send(ctx, options, request, output).await
    }

    /// Send a prepared request and classify the response
    pub async fn send<W>(
        &self,
        ctx: &CallContext,
        options: &InvokeOptions,
        request: Request,
        output: &mut W,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        debug!(method = %request.method(), url = %request.url(), "Invoking function");
        ctx.run(async {
            let mut response = self.transport.round_trip(request).await?;
            let status = response.status().as_u16();

            let call_id = response
                .headers()
                .get(CALL_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let message = match call_id {
                Some(call_id) => {
                    if options.display_call_id {
                        self.diagnostics.line(&format!("Call ID: {}", call_id));
                    }
                    while let Some(chunk) = response.chunk().await? {
                        output.write_all(&chunk).await?;
                    }
                    None
                }
                None => {
                    let bytes = response.bytes().await?;
                    let envelope = match serde_json::from_slice::<CallEnvelope>(&bytes) {
                        Ok(envelope) => envelope,
                        Err(err) if status < 400 => return Err(err.into()),
                        Err(_) => CallEnvelope::default(),
                    };
                    if let Some(call_id) = envelope.call_id {
                        self.diagnostics.line(&format!("Call ID: {}", call_id));
                    }
                    let message = envelope.error.and_then(|e| e.message);
                    if let Some(message) = &message {
                        output
                            .write_all(format!("Error: {}\n", message).as_bytes())
                            .await?;
                    }
                    message
                }
            };
            output.flush().await?;

            if status >= 400 {
                return Err(FnError::from_status(status, &options.url, message));
            }
            Ok(())
        })
        .await
    }
}
