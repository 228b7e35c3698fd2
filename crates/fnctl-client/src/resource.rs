//! Resource Client Layer
//!
//! One [`ResourceClient`] per resource type sits on top of the backend's
//! [`CollectionApi`]. It adds what every backend shares: validation before
//! the network, transient retries, the optimistic update loop, idempotent
//! delete, limit-bounded pagination, and the provider's unsupported-type
//! short-circuit.

use fnctl_core::{
    CallContext, ErrorKind, FnError, ListQuery, Resource, ResourceType, Result, RetryPolicy,
    Scope, SharedCollection, SharedDiagnostics,
};
use std::future::Future;
use tracing::{debug, info, warn};

/// Largest page requested from a backend in one call
pub const MAX_PAGE_SIZE: u32 = 100;

/// Message for operations on a resource type the provider does not offer
pub fn unsupported_message(kind: ResourceType) -> String {
    match kind {
        ResourceType::Trigger => "HTTP Triggers are not supported on this provider".to_string(),
        other => format!("{} are not supported on this provider", other.plural()),
    }
}

/// Uniform create/get/update/delete/list over one resource type
pub struct ResourceClient<R: Resource> {
    api: SharedCollection<R>,
    available: bool,
    retry: RetryPolicy,
    update_attempts: u32,
    diagnostics: SharedDiagnostics,
}

impl<R: Resource> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            available: self.available,
            retry: self.retry.clone(),
            update_attempts: self.update_attempts,
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<R: Resource> ResourceClient<R> {
    pub fn new(api: SharedCollection<R>, diagnostics: SharedDiagnostics) -> Self {
        Self {
            api,
            available: true,
            retry: RetryPolicy::default(),
            update_attempts: 1,
            diagnostics,
        }
    }

    /// Mark the resource type as unavailable on the active provider
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Backoff policy for transient failures
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attempts for an update that keeps hitting `PreconditionFailed`
    pub fn with_update_attempts(mut self, attempts: u32) -> Self {
        self.update_attempts = attempts.max(1);
        self
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// `NotSupported` when the provider does not offer this resource type
    pub fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(FnError::NotSupported(unsupported_message(R::TYPE)))
        }
    }

    /// Create `resource`. Not retried: a POST that reached the server may
    /// have taken effect.
    pub async fn create(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        self.ensure_available()?;
        resource.validate()?;

        let created = self.api.create(ctx, &resource.for_create()).await?;
        info!(
            kind = R::TYPE.short_name(),
            id = created.id(),
            name = created.name(),
            "Created"
        );
        Ok(created)
    }

    /// Look up by exact name through the list endpoint's name filter
    pub async fn get_by_name(&self, ctx: &CallContext, scope: &Scope, name: &str) -> Result<R> {
        self.ensure_available()?;
        if name.is_empty() {
            return Err(FnError::InvalidArgument(format!(
                "{} name must not be empty",
                R::TYPE.short_name()
            )));
        }

        let query = ListQuery::new(scope.clone()).with_name(name);
        let page = self
            .retry
            .run(ctx, "lookup by name", || self.api.list(ctx, &query))
            .await?;

        page.items
            .into_iter()
            .find(|item| item.name() == name)
            .ok_or_else(|| FnError::not_found(R::TYPE.short_name(), name))
    }

    pub async fn get_by_id(&self, ctx: &CallContext, id: &str) -> Result<R> {
        self.ensure_available()?;
        let versioned = self
            .retry
            .run(ctx, "get by id", || self.api.get(ctx, id))
            .await?;
        Ok(versioned.value)
    }

    /// Merge `changes` onto entity `id` and return the server's result
    pub async fn update(&self, ctx: &CallContext, id: &str, changes: &R) -> Result<R> {
        self.ensure_available()?;
        if id.is_empty() {
            return Err(FnError::InvalidArgument(format!(
                "{} id must not be empty",
                R::TYPE.short_name()
            )));
        }

        let updated = self.with_retry(ctx, || self.api.update(ctx, id, changes)).await?;
        info!(kind = R::TYPE.short_name(), id, "Updated");
        Ok(updated)
    }

    /// Run `op` with transient backoff, re-running it from scratch while it
    /// reports `PreconditionFailed`, up to the update attempt budget.
    ///
    /// `op` must re-read the current representation on every call so each
    /// attempt re-applies the caller's changes to fresh state.
    pub async fn with_retry<T, F, Fut>(&self, ctx: &CallContext, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match self.retry.run(ctx, "update", &mut op).await {
                Err(err)
                    if err.kind() == ErrorKind::PreconditionFailed
                        && attempt < self.update_attempts =>
                {
                    warn!(
                        kind = R::TYPE.short_name(),
                        attempt,
                        max_attempts = self.update_attempts,
                        "Entity changed underneath; refreshing and re-applying"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Delete by id. With `idempotent`, a missing entity is not an error.
    pub async fn delete(&self, ctx: &CallContext, id: &str, idempotent: bool) -> Result<()> {
        self.ensure_available()?;
        match self
            .retry
            .run(ctx, "delete", || self.api.delete(ctx, id))
            .await
        {
            Ok(()) => {
                info!(kind = R::TYPE.short_name(), id, "Deleted");
                Ok(())
            }
            Err(err) if idempotent && err.kind() == ErrorKind::NotFound => {
                debug!(kind = R::TYPE.short_name(), id, "Already deleted");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Collect up to `limit` entities, following cursors serially.
    ///
    /// An empty result writes "No <plural> found" to the diagnostic stream.
    pub async fn list(&self, ctx: &CallContext, scope: &Scope, limit: i64) -> Result<Vec<R>> {
        self.ensure_available()?;
        if limit < 0 {
            return Err(FnError::InvalidArgument(format!(
                "limit must not be negative, got {}",
                limit
            )));
        }
        let limit = limit as usize;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut acc: Vec<R> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let per_page = (limit - acc.len()).min(MAX_PAGE_SIZE as usize) as u32;
            let query = ListQuery::new(scope.clone())
                .with_cursor(cursor.clone())
                .with_per_page(per_page);
            let page = self
                .retry
                .run(ctx, "list", || self.api.list(ctx, &query))
                .await?;

            debug!(
                kind = R::TYPE.short_name(),
                received = page.items.len(),
                next_cursor = ?page.next_cursor,
                "Fetched page"
            );
            acc.extend(page.items);

            match page.next_cursor {
                Some(next) if acc.len() < limit => cursor = Some(next),
                _ => break,
            }
        }

        if acc.is_empty() {
            self.diagnostics
                .line(&format!("No {} found", R::TYPE.plural()));
            return Ok(acc);
        }
        acc.truncate(limit);
        Ok(acc)
    }
}
