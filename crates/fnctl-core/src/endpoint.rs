//! Canonical control-plane base URLs

use crate::error::{FnError, Result};
use std::fmt;
use url::Url;

/// A base URL that always carries an explicit port.
///
/// `url::Url` elides default ports, so the port is stored beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl {
    scheme: String,
    host: String,
    port: u16,
    path: String,
}

impl ApiUrl {
    /// Canonicalize a raw endpoint string.
    ///
    /// A missing scheme becomes `http://`; an empty port becomes 80 for
    /// `http` and 443 for `https`. Host and path are kept verbatim, except
    /// that a bare `/` path is treated as empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FnError::InvalidEndpoint {
                url: raw.to_string(),
                reason: "empty URL".to_string(),
            });
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| FnError::InvalidEndpoint {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FnError::InvalidEndpoint {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_string();

        let port = match parsed.port_or_known_default() {
            Some(port) => port,
            None => {
                return Err(FnError::InvalidEndpoint {
                    url: raw.to_string(),
                    reason: format!("no default port for scheme '{}'", parsed.scheme()),
                });
            }
        };

        let path = if parsed.path() == "/" {
            String::new()
        } else {
            parsed.path().to_string()
        };

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host,
            port,
            path,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path without trailing slash; empty for the server root
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Base joined with an extra prefix, e.g. `/v2`
    pub fn with_prefix(&self, prefix: &str) -> String {
        format!(
            "{}://{}:{}{}{}",
            self.scheme,
            self.host,
            self.port,
            self.path.trim_end_matches('/'),
            prefix
        )
    }

    /// Parsed form for building requests
    pub fn to_url(&self) -> Result<Url> {
        Url::parse(&self.to_string()).map_err(|e| FnError::InvalidEndpoint {
            url: self.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, self.path
        )
    }
}

impl std::str::FromStr for ApiUrl {
    type Err = FnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
