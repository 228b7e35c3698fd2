//! Open-source control plane provider for fnctl
//!
//! Talks JSON to a self-hosted server under `/v2`:
//!
//! - `/apps`, `/apps/{id}`
//! - `/fns`, `/fns/{id}`
//! - `/triggers`, `/triggers/{id}`
//!
//! Listings are paged with `?cursor=` and filtered with `?name=`,
//! `?app_id=` and `?fn_id=`. Authentication is an optional bearer token.
//!
//! # Example
//!
//! ```ignore
//! use fnctl_core::{CallContext, ListQuery, MapConfigSource, Scope};
//! use fnctl_oss::OssProvider;
//!
//! let config = MapConfigSource::new().with("api-url", "http://localhost:8080");
//! let provider = OssProvider::from_config(&config)?;
//! let api = provider.api_client_v2()?;
//!
//! let page = api.apps.list(&CallContext::default(), &ListQuery::new(Scope::root())).await?;
//! ```

pub mod api;
pub mod provider;

pub use api::{OssCollection, OssRoute, resource_api_client};
pub use provider::{API_PREFIX, DEFAULT_API_URL, OssProvider};
