//! fnctl client
//!
//! Resolves a [`Provider`] once from configuration and exposes the
//! resource clients and the invocation path on top of it.
//!
//! ```ignore
//! use fnctl_client::Client;
//! use fnctl_core::{NopPassphraseSource, Scope, StderrDiagnostics};
//! use std::sync::Arc;
//!
//! let config = fnctl_config::load(None)?;
//! let client = Client::from_config(&config, &NopPassphraseSource, Arc::new(StderrDiagnostics))?;
//! let apps = client.apps().list(&client.context(), &Scope::root(), 30).await?;
//! ```

pub mod client;
pub mod invoke;
pub mod provider;
pub mod resource;

pub use client::Client;
pub use invoke::{EnvSelection, InvokeOptions, Invoker, invoke_url_for};
pub use provider::{DEFAULT_PROVIDER, ORACLE_PROVIDER, Provider, ProviderRegistry};
pub use resource::ResourceClient;
