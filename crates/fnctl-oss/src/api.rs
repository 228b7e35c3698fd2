//! `/v2` resource API of the open-source control plane

use async_trait::async_trait;
use fnctl_core::http::{decode, expect_success, join_url, json_request};
use fnctl_core::{
    App, CallContext, CollectionApi, Function, ListQuery, Page, Resource, ResourceApiClient,
    Result, SharedTransport, Trigger, Versioned,
};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Route segment for each resource collection under `/v2`
pub trait OssRoute: Resource {
    const ROUTE: &'static str;
}

impl OssRoute for App {
    const ROUTE: &'static str = "apps";
}

impl OssRoute for Function {
    const ROUTE: &'static str = "fns";
}

impl OssRoute for Trigger {
    const ROUTE: &'static str = "triggers";
}

#[derive(Debug, Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
struct ListBody<R> {
    #[serde(default = "Vec::new")]
    items: Vec<R>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// One collection of the `/v2` API
pub struct OssCollection<R> {
    base: String,
    transport: SharedTransport,
    _resource: PhantomData<fn() -> R>,
}

impl<R: OssRoute> OssCollection<R> {
    /// `base` is the API root including the `/v2` prefix
    pub fn new(base: impl Into<String>, transport: SharedTransport) -> Self {
        Self {
            base: base.into(),
            transport,
            _resource: PhantomData,
        }
    }

    fn collection_url(&self) -> Result<url::Url> {
        join_url(&self.base, &[R::ROUTE])
    }

    fn item_url(&self, id: &str) -> Result<url::Url> {
        join_url(&self.base, &[R::ROUTE, id])
    }
}

#[async_trait]
impl<R: OssRoute> CollectionApi<R> for OssCollection<R> {
    async fn create(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        let request = json_request(Method::POST, self.collection_url()?, Some(resource))?;
        ctx.run(async {
            let response = self.transport.round_trip(request).await?;
            decode(response, R::TYPE, resource.name()).await
        })
        .await
    }

    async fn get(&self, ctx: &CallContext, id: &str) -> Result<Versioned<R>> {
        let request = json_request::<()>(Method::GET, self.item_url(id)?, None)?;
        ctx.run(async {
            let response = self.transport.round_trip(request).await?;
            let value = decode(response, R::TYPE, id).await?;
            Ok(Versioned::unversioned(value))
        })
        .await
    }

    async fn list(&self, ctx: &CallContext, query: &ListQuery) -> Result<Page<R>> {
        let mut url = self.collection_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(app_id) = &query.scope.app_id {
                pairs.append_pair("app_id", app_id);
            }
            if let Some(fn_id) = &query.scope.fn_id {
                pairs.append_pair("fn_id", fn_id);
            }
            if let Some(name) = &query.name {
                pairs.append_pair("name", name);
            }
            if let Some(cursor) = &query.cursor {
                pairs.append_pair("cursor", cursor);
            }
            if let Some(per_page) = query.per_page {
                pairs.append_pair("per_page", &per_page.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        debug!(route = R::ROUTE, cursor = ?query.cursor, "Listing page");
        let request = json_request::<()>(Method::GET, url, None)?;
        let subject = query.name.clone().unwrap_or_else(|| R::TYPE.plural().to_string());
        ctx.run(async {
            let response = self.transport.round_trip(request).await?;
            let body: ListBody<R> = decode(response, R::TYPE, &subject).await?;
            Ok(Page::new(body.items, body.next_cursor))
        })
        .await
    }

    async fn update(&self, ctx: &CallContext, id: &str, changes: &R) -> Result<R> {
        // the server merges the changes onto its own copy
        let request = json_request(Method::PUT, self.item_url(id)?, Some(changes))?;
        ctx.run(async {
            let response = self.transport.round_trip(request).await?;
            decode(response, R::TYPE, id).await
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        let request = json_request::<()>(Method::DELETE, self.item_url(id)?, None)?;
        ctx.run(async {
            let response = self.transport.round_trip(request).await?;
            expect_success(response, R::TYPE, id).await
        })
        .await
    }
}

/// All three `/v2` collections sharing one transport
pub fn resource_api_client(base: &str, transport: SharedTransport) -> ResourceApiClient {
    ResourceApiClient {
        apps: Arc::new(OssCollection::<App>::new(base, transport.clone())),
        functions: Arc::new(OssCollection::<Function>::new(base, transport.clone())),
        triggers: Arc::new(OssCollection::<Trigger>::new(base, transport)),
    }
}
