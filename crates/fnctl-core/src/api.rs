//! Backend-neutral resource API contract
//!
//! Each provider implements [`CollectionApi`] once per resource type and
//! bundles the three collections into a [`ResourceApiClient`]. The
//! resource client layer in `fnctl-client` is written purely against
//! these traits.

use crate::context::CallContext;
use crate::error::{FnError, Result};
use crate::model::{App, Function, Resource, Scope, Trigger};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// Filters and paging for a single list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub scope: Scope,
    /// Server-side exact name filter
    pub name: Option<String>,
    /// Opaque cursor from the previous page
    pub cursor: Option<String>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor.filter(|c| !c.is_empty());
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// `None` when this is the last page
    pub next_cursor: Option<String>,
}

impl<R> Page<R> {
    /// Build a page, treating an empty cursor as the end of the listing
    pub fn new(items: Vec<R>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.filter(|c| !c.is_empty()),
        }
    }

    pub fn last(items: Vec<R>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// An entity together with its optimistic-concurrency token
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<R> {
    pub value: R,
    /// Strong ETag, when the backend provides one
    pub etag: Option<String>,
}

impl<R> Versioned<R> {
    pub fn new(value: R, etag: Option<String>) -> Self {
        Self { value, etag }
    }

    pub fn unversioned(value: R) -> Self {
        Self { value, etag: None }
    }
}

/// CRUD over one resource collection of one backend.
///
/// Implementations translate HTTP failures into [`FnError`] before
/// returning; a 404 is always reported as `NotFound`.
#[async_trait]
pub trait CollectionApi<R: Resource>: Send + Sync {
    /// POST the canonical body and return the server's representation
    async fn create(&self, ctx: &CallContext, resource: &R) -> Result<R>;

    async fn get(&self, ctx: &CallContext, id: &str) -> Result<Versioned<R>>;

    async fn list(&self, ctx: &CallContext, query: &ListQuery) -> Result<Page<R>>;

    /// Apply `changes` to the entity `id` in a single attempt.
    ///
    /// Backends with optimistic locking return `PreconditionFailed` when the
    /// entity changed underneath; the caller decides whether to retry.
    async fn update(&self, ctx: &CallContext, id: &str, changes: &R) -> Result<R>;

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()>;
}

pub type SharedCollection<R> = Arc<dyn CollectionApi<R>>;

/// Collection that rejects every call without touching the network
pub struct UnsupportedCollection<R> {
    message: String,
    _resource: PhantomData<fn() -> R>,
}

impl<R> UnsupportedCollection<R> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            _resource: PhantomData,
        }
    }

    fn reject<T>(&self) -> Result<T> {
        Err(FnError::NotSupported(self.message.clone()))
    }
}

#[async_trait]
impl<R: Resource> CollectionApi<R> for UnsupportedCollection<R> {
    async fn create(&self, _ctx: &CallContext, _resource: &R) -> Result<R> {
        self.reject()
    }

    async fn get(&self, _ctx: &CallContext, _id: &str) -> Result<Versioned<R>> {
        self.reject()
    }

    async fn list(&self, _ctx: &CallContext, _query: &ListQuery) -> Result<Page<R>> {
        self.reject()
    }

    async fn update(&self, _ctx: &CallContext, _id: &str, _changes: &R) -> Result<R> {
        self.reject()
    }

    async fn delete(&self, _ctx: &CallContext, _id: &str) -> Result<()> {
        self.reject()
    }
}

/// The three collections a provider exposes
#[derive(Clone)]
pub struct ResourceApiClient {
    pub apps: SharedCollection<App>,
    pub functions: SharedCollection<Function>,
    pub triggers: SharedCollection<Trigger>,
}

impl std::fmt::Debug for ResourceApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceApiClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cursor_ends_listing() {
        let page: Page<App> = Page::new(vec![], Some(String::new()));
        assert_eq!(page.next_cursor, None);

        let query = ListQuery::default().with_cursor(Some(String::new()));
        assert_eq!(query.cursor, None);
    }

    #[tokio::test]
    async fn test_unsupported_collection_rejects() {
        let triggers: UnsupportedCollection<Trigger> = UnsupportedCollection::new("nope");
        let ctx = CallContext::default();
        let err = triggers
            .list(&ctx, &ListQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FnError::NotSupported(ref m) if m == "nope"));
    }
}
