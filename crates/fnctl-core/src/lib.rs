//! fnctl core
//!
//! Shared building blocks for the fnctl functions-platform client: the
//! error taxonomy, the resource model, the configuration contracts, the
//! HTTP round-tripper stack and the backend-neutral resource API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    fn (CLI)                      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 fnctl-client                     │
//! │   Provider registry · resource clients · invoke  │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │   fnctl-oss   │ │   fnctl-oci   │
//! │  /v2 backend  │ │ signed backend│
//! └───────┬───────┘ └───────┬───────┘
//!         │                 │
//! ┌───────▼─────────────────▼───────────────────────┐
//! │                  fnctl-core                      │
//! │  FnError · model · ConfigSource · RoundTrip      │
//! │  CallContext · RetryPolicy · CollectionApi       │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod model;
pub mod retry;
pub mod transport;

// Re-exports
pub use api::{
    CollectionApi, ListQuery, Page, ResourceApiClient, SharedCollection, UnsupportedCollection,
    Versioned,
};
pub use config::{ConfigSource, MapConfigSource, NopPassphraseSource, PassphraseSource};
pub use context::CallContext;
pub use diagnostics::{
    BufferDiagnostics, Diagnostics, SharedDiagnostics, SilentDiagnostics, StderrDiagnostics,
};
pub use endpoint::ApiUrl;
pub use error::{ErrorBody, ErrorKind, FnError, Result};
pub use model::{App, Function, Resource, ResourceType, Scope, Trigger, TriggerType};
pub use retry::RetryPolicy;
pub use transport::{BearerAuth, HttpTransport, RoundTrip, SharedTransport};
