pub mod create;
pub mod delete;
pub mod get;
pub mod invoke;
pub mod list;
pub mod update;

use crate::{ConfigArgs, FunctionArgs};
use fnctl_client::Client;
use fnctl_core::model::{Annotations, Config};
use fnctl_core::{App, CallContext, FnError, Function, Result, Scope, Trigger};
use serde::Serialize;

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn split_pair(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| {
            FnError::InvalidArgument(format!("expected KEY=VALUE, got '{}'", raw))
        })
}

pub fn parse_config(raw: &[String]) -> Result<Config> {
    raw.iter().map(|entry| split_pair(entry)).collect()
}

/// Values are JSON when they parse as JSON, plain strings otherwise
pub fn parse_annotations(raw: &[String]) -> Result<Annotations> {
    raw.iter()
        .map(|entry| {
            let (key, value) = split_pair(entry)?;
            let value = serde_json::from_str(&value)
                .unwrap_or(serde_json::Value::String(value));
            Ok((key, value))
        })
        .collect()
}

pub fn function_fields(name: &str, app_id: &str, image: &str, args: &FunctionArgs) -> Result<Function> {
    Ok(Function {
        name: name.to_string(),
        app_id: app_id.to_string(),
        image: image.to_string(),
        memory: args.memory.unwrap_or_default(),
        timeout: args.timeout,
        idle_timeout: args.idle_timeout,
        config: parse_config(&args.common.config)?,
        annotations: parse_annotations(&args.common.annotations)?,
        ..Default::default()
    })
}

pub fn app_fields(name: &str, syslog_url: Option<String>, args: &ConfigArgs) -> Result<App> {
    Ok(App {
        name: name.to_string(),
        syslog_url,
        config: parse_config(&args.config)?,
        annotations: parse_annotations(&args.annotations)?,
        ..Default::default()
    })
}

pub async fn resolve_app(client: &Client, ctx: &CallContext, name: &str) -> Result<App> {
    client.apps().get_by_name(ctx, &Scope::root(), name).await
}

pub async fn resolve_function(
    client: &Client,
    ctx: &CallContext,
    app: &str,
    name: &str,
) -> Result<(App, Function)> {
    let app = resolve_app(client, ctx, app).await?;
    let function = client
        .functions()
        .get_by_name(ctx, &Scope::app(app.id.clone()), name)
        .await?;
    Ok((app, function))
}

/// Checks trigger support before any lookup is sent
pub async fn resolve_trigger(
    client: &Client,
    ctx: &CallContext,
    app: &str,
    function: &str,
    name: &str,
) -> Result<Trigger> {
    client.triggers().ensure_available()?;
    let (app, function) = resolve_function(client, ctx, app, function).await?;
    client
        .triggers()
        .get_by_name(ctx, &Scope::function(app.id, function.id), name)
        .await
}
