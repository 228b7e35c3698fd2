//! Managed-cloud functions management API
//!
//! Applications and functions live under `/20181201`. Bodies are
//! camelCase, listings are filtered by `compartmentId` or `applicationId`
//! and paged through the `opc-next-page` response header. Updates replace
//! the config map wholesale, so the client merges changes onto the current
//! representation and sends it back with `if-match`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fnctl_core::http::{decode, expect_success, join_url, json_request};
use fnctl_core::model::{self, Annotations};
use fnctl_core::{
    App, CallContext, CollectionApi, FnError, Function, ListQuery, Page, Resource, ResourceType,
    Result, SharedTransport, Versioned,
};
use reqwest::header::{ETAG, HeaderValue, IF_MATCH};
use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const API_VERSION: &str = "20181201";

pub const ANNOTATION_COMPARTMENT_ID: &str = "oracle.com/oci/compartmentId";
pub const ANNOTATION_SUBNET_IDS: &str = "oracle.com/oci/subnetIds";
pub const ANNOTATION_IMAGE_DIGEST: &str = "oracle.com/oci/imageDigest";
pub const ANNOTATION_INVOKE_ENDPOINT: &str = "fnproject.io/fn/invokeEndpoint";

pub const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// Memory assigned when a function is created without one
pub const DEFAULT_MEMORY_MB: u64 = 128;

/// Idle timeout reported for every function; the service does not expose it
pub const DEFAULT_IDLE_TIMEOUT_SECS: u32 = 30;

// ---------------------------------------------------------------------------
// wire types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationWire {
    id: String,
    #[serde(default)]
    compartment_id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    subnet_ids: Vec<String>,
    #[serde(default)]
    config: Option<BTreeMap<String, String>>,
    #[serde(default)]
    syslog_url: Option<String>,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    time_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateApplicationDetails<'a> {
    compartment_id: &'a str,
    display_name: &'a str,
    subnet_ids: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    config: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    syslog_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateApplicationDetails<'a> {
    config: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    syslog_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionWire {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    application_id: String,
    #[serde(default)]
    compartment_id: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    image_digest: Option<String>,
    #[serde(rename = "memoryInMBs", default)]
    memory_in_mbs: u64,
    #[serde(default)]
    timeout_in_seconds: Option<u32>,
    #[serde(default)]
    config: Option<BTreeMap<String, String>>,
    #[serde(default)]
    invoke_endpoint: Option<String>,
    #[serde(default)]
    time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    time_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFunctionDetails<'a> {
    display_name: &'a str,
    application_id: &'a str,
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_digest: Option<String>,
    #[serde(rename = "memoryInMBs")]
    memory_in_mbs: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    config: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_in_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFunctionDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_digest: Option<String>,
    #[serde(rename = "memoryInMBs", skip_serializing_if = "Option::is_none")]
    memory_in_mbs: Option<u64>,
    config: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_in_seconds: Option<u32>,
}

impl From<ApplicationWire> for App {
    fn from(wire: ApplicationWire) -> Self {
        let mut annotations = Annotations::new();
        annotations.insert(
            ANNOTATION_COMPARTMENT_ID.to_string(),
            Value::String(wire.compartment_id),
        );
        annotations.insert(
            ANNOTATION_SUBNET_IDS.to_string(),
            Value::Array(wire.subnet_ids.into_iter().map(Value::String).collect()),
        );
        App {
            id: wire.id,
            name: wire.display_name,
            config: wire.config.unwrap_or_default(),
            annotations,
            syslog_url: wire.syslog_url,
            created_at: wire.time_created,
            updated_at: wire.time_updated,
        }
    }
}

impl From<FunctionWire> for Function {
    fn from(wire: FunctionWire) -> Self {
        let mut annotations = Annotations::new();
        annotations.insert(
            ANNOTATION_COMPARTMENT_ID.to_string(),
            Value::String(wire.compartment_id),
        );
        if let Some(digest) = wire.image_digest {
            annotations.insert(ANNOTATION_IMAGE_DIGEST.to_string(), Value::String(digest));
        }
        if let Some(endpoint) = wire.invoke_endpoint {
            annotations.insert(
                ANNOTATION_INVOKE_ENDPOINT.to_string(),
                Value::String(invoke_endpoint(&endpoint, &wire.id)),
            );
        }
        Function {
            id: wire.id,
            name: wire.display_name,
            app_id: wire.application_id,
            image: wire.image,
            memory: wire.memory_in_mbs,
            timeout: wire.timeout_in_seconds,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT_SECS),
            config: wire.config.unwrap_or_default(),
            annotations,
            created_at: wire.time_created,
            updated_at: wire.time_updated,
        }
    }
}

/// Invoke URL for function `id` behind `endpoint`
pub fn invoke_endpoint(endpoint: &str, id: &str) -> String {
    format!(
        "{}/{}/functions/{}/actions/invoke",
        endpoint.trim_end_matches('/'),
        API_VERSION,
        id
    )
}

fn subnet_ids(annotations: &Annotations) -> Result<Vec<String>> {
    let value = annotations.get(ANNOTATION_SUBNET_IDS).ok_or_else(|| {
        FnError::InvalidArgument(format!(
            "missing subnets annotation: set {} to a list of subnet OCIDs",
            ANNOTATION_SUBNET_IDS
        ))
    })?;
    let invalid = || FnError::InvalidArgument("invalid subnets annotation".to_string());
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn image_digest(annotations: &Annotations) -> Result<Option<String>> {
    match annotations.get(ANNOTATION_IMAGE_DIGEST) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FnError::InvalidArgument("invalid image digest".to_string())),
    }
}

fn etag(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn next_page(response: &Response) -> Option<String> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// shared request plumbing

#[derive(Clone)]
struct OciEndpoint {
    base: String,
    compartment_id: String,
    transport: SharedTransport,
}

impl OciEndpoint {
    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        let mut all = vec![API_VERSION];
        all.extend_from_slice(segments);
        join_url(&self.base, &all)
    }

    async fn send(&self, request: reqwest::Request) -> Result<Response> {
        self.transport.round_trip(request).await
    }

    async fn get<W: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        kind: ResourceType,
        id: &str,
    ) -> Result<(W, Option<String>)> {
        let request = json_request::<()>(Method::GET, self.url(&[collection, id])?, None)?;
        let response = self.send(request).await?;
        let tag = etag(&response);
        let wire = decode(response, kind, id).await?;
        Ok((wire, tag))
    }

    async fn list<W: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        kind: ResourceType,
        filter: (&str, &str),
        query: &ListQuery,
    ) -> Result<(Vec<W>, Option<String>)> {
        let mut url = self.url(&[collection])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(filter.0, filter.1);
            if let Some(name) = &query.name {
                pairs.append_pair("displayName", name);
            }
            if let Some(page) = &query.cursor {
                pairs.append_pair("page", page);
            }
            if let Some(limit) = query.per_page {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        debug!(collection, page = ?query.cursor, "Listing page");
        let request = json_request::<()>(Method::GET, url, None)?;
        let response = self.send(request).await?;
        let next = next_page(&response);
        let subject = query
            .name
            .clone()
            .unwrap_or_else(|| kind.plural().to_string());
        let items = decode(response, kind, &subject).await?;
        Ok((items, next))
    }

    async fn put<B: Serialize, W: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        kind: ResourceType,
        id: &str,
        body: &B,
        if_match: Option<&str>,
    ) -> Result<W> {
        let mut request = json_request(Method::PUT, self.url(&[collection, id])?, Some(body))?;
        if let Some(tag) = if_match {
            let value = HeaderValue::from_str(tag)
                .map_err(|_| FnError::Decode(format!("invalid etag '{}'", tag)))?;
            request.headers_mut().insert(IF_MATCH, value);
        }
        let response = self.send(request).await?;
        decode(response, kind, id).await
    }

    async fn delete(&self, collection: &str, kind: ResourceType, id: &str) -> Result<()> {
        let request = json_request::<()>(Method::DELETE, self.url(&[collection, id])?, None)?;
        let response = self.send(request).await?;
        expect_success(response, kind, id).await
    }
}

// ---------------------------------------------------------------------------
// applications

/// Applications collection, scoped to one compartment
pub struct OciApplications {
    endpoint: OciEndpoint,
}

impl OciApplications {
    const COLLECTION: &'static str = "applications";

    pub fn new(
        base: impl Into<String>,
        compartment_id: impl Into<String>,
        transport: SharedTransport,
    ) -> Self {
        Self {
            endpoint: OciEndpoint {
                base: base.into(),
                compartment_id: compartment_id.into(),
                transport,
            },
        }
    }
}

#[async_trait]
impl CollectionApi<App> for OciApplications {
    async fn create(&self, ctx: &CallContext, app: &App) -> Result<App> {
        let details = CreateApplicationDetails {
            compartment_id: &self.endpoint.compartment_id,
            display_name: &app.name,
            subnet_ids: subnet_ids(&app.annotations)?,
            config: &app.config,
            syslog_url: app.syslog_url.as_deref(),
        };
        let request = json_request(
            Method::POST,
            self.endpoint.url(&[Self::COLLECTION])?,
            Some(&details),
        )?;
        ctx.run(async {
            let response = self.endpoint.send(request).await?;
            let wire: ApplicationWire = decode(response, App::TYPE, &app.name).await?;
            Ok(wire.into())
        })
        .await
    }

    async fn get(&self, ctx: &CallContext, id: &str) -> Result<Versioned<App>> {
        ctx.run(async {
            let (wire, tag): (ApplicationWire, _) =
                self.endpoint.get(Self::COLLECTION, App::TYPE, id).await?;
            Ok(Versioned::new(wire.into(), tag))
        })
        .await
    }

    async fn list(&self, ctx: &CallContext, query: &ListQuery) -> Result<Page<App>> {
        ctx.run(async {
            let filter = ("compartmentId", self.endpoint.compartment_id.as_str());
            let (items, next): (Vec<ApplicationWire>, _) = self
                .endpoint
                .list(Self::COLLECTION, App::TYPE, filter, query)
                .await?;

            // summaries carry no config; fetch the full entity for a unique name match
            if query.name.is_some() && items.len() == 1 {
                let (full, _): (ApplicationWire, _) = self
                    .endpoint
                    .get(Self::COLLECTION, App::TYPE, &items[0].id)
                    .await?;
                return Ok(Page::new(vec![full.into()], next));
            }
            Ok(Page::new(items.into_iter().map(App::from).collect(), next))
        })
        .await
    }

    async fn update(&self, ctx: &CallContext, id: &str, changes: &App) -> Result<App> {
        ctx.run(async {
            let (wire, tag): (ApplicationWire, _) =
                self.endpoint.get(Self::COLLECTION, App::TYPE, id).await?;
            let mut merged = App::from(wire);
            changes.merge_into(&mut merged);

            let details = UpdateApplicationDetails {
                config: &merged.config,
                syslog_url: merged.syslog_url.as_deref(),
            };
            let updated: ApplicationWire = self
                .endpoint
                .put(Self::COLLECTION, App::TYPE, id, &details, tag.as_deref())
                .await?;
            info!(app = %updated.display_name, "Application updated");
            Ok(updated.into())
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        ctx.run(self.endpoint.delete(Self::COLLECTION, App::TYPE, id))
            .await
    }
}

// ---------------------------------------------------------------------------
// functions

/// Functions collection
pub struct OciFunctions {
    endpoint: OciEndpoint,
}

impl OciFunctions {
    const COLLECTION: &'static str = "functions";

    pub fn new(
        base: impl Into<String>,
        compartment_id: impl Into<String>,
        transport: SharedTransport,
    ) -> Self {
        Self {
            endpoint: OciEndpoint {
                base: base.into(),
                compartment_id: compartment_id.into(),
                transport,
            },
        }
    }
}

#[async_trait]
impl CollectionApi<Function> for OciFunctions {
    async fn create(&self, ctx: &CallContext, function: &Function) -> Result<Function> {
        let memory = if function.memory == 0 {
            DEFAULT_MEMORY_MB
        } else {
            function.memory
        };
        let details = CreateFunctionDetails {
            display_name: &function.name,
            application_id: &function.app_id,
            image: &function.image,
            image_digest: image_digest(&function.annotations)?,
            memory_in_mbs: memory,
            config: &function.config,
            timeout_in_seconds: function.timeout,
        };
        let request = json_request(
            Method::POST,
            self.endpoint.url(&[Self::COLLECTION])?,
            Some(&details),
        )?;
        ctx.run(async {
            let response = self.endpoint.send(request).await?;
            let wire: FunctionWire = decode(response, Function::TYPE, &function.name).await?;
            Ok(wire.into())
        })
        .await
    }

    async fn get(&self, ctx: &CallContext, id: &str) -> Result<Versioned<Function>> {
        ctx.run(async {
            let (wire, tag): (FunctionWire, _) =
                self.endpoint.get(Self::COLLECTION, Function::TYPE, id).await?;
            Ok(Versioned::new(wire.into(), tag))
        })
        .await
    }

    async fn list(&self, ctx: &CallContext, query: &ListQuery) -> Result<Page<Function>> {
        let app_id = query.scope.app_id.as_deref().ok_or_else(|| {
            FnError::InvalidArgument("listing functions requires an application id".into())
        })?;
        ctx.run(async {
            let (items, next): (Vec<FunctionWire>, _) = self
                .endpoint
                .list(
                    Self::COLLECTION,
                    Function::TYPE,
                    ("applicationId", app_id),
                    query,
                )
                .await?;

            if query.name.is_some() && items.len() == 1 {
                let (full, _): (FunctionWire, _) = self
                    .endpoint
                    .get(Self::COLLECTION, Function::TYPE, &items[0].id)
                    .await?;
                return Ok(Page::new(vec![full.into()], next));
            }
            Ok(Page::new(
                items.into_iter().map(Function::from).collect(),
                next,
            ))
        })
        .await
    }

    async fn update(&self, ctx: &CallContext, id: &str, changes: &Function) -> Result<Function> {
        let digest = image_digest(&changes.annotations)?;
        ctx.run(async {
            let (wire, tag): (FunctionWire, _) =
                self.endpoint.get(Self::COLLECTION, Function::TYPE, id).await?;
            let mut config = wire.config.clone().unwrap_or_default();
            model::merge_config(&mut config, &changes.config);

            let details = UpdateFunctionDetails {
                image: Some(changes.image.as_str()).filter(|i| !i.is_empty()),
                image_digest: digest,
                memory_in_mbs: Some(changes.memory).filter(|m| *m != 0),
                config: &config,
                timeout_in_seconds: changes.timeout,
            };
            let updated: FunctionWire = self
                .endpoint
                .put(
                    Self::COLLECTION,
                    Function::TYPE,
                    id,
                    &details,
                    tag.as_deref(),
                )
                .await?;
            info!(function = %updated.display_name, "Function updated");
            Ok(updated.into())
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, id: &str) -> Result<()> {
        ctx.run(
            self.endpoint
                .delete(Self::COLLECTION, Function::TYPE, id),
        )
        .await
    }
}
