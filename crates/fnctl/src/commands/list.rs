use super::{print_json, resolve_app, resolve_function};
use crate::ListTarget;
use fnctl_client::Client;
use fnctl_core::{CallContext, Scope};
use serde::Serialize;

fn print_items<T: Serialize>(items: Vec<T>) -> anyhow::Result<()> {
    // "No ... found" has already gone to stderr
    if items.is_empty() {
        return Ok(());
    }
    print_json(&items)
}

pub async fn handle(client: &Client, ctx: &CallContext, target: ListTarget) -> anyhow::Result<()> {
    match target {
        ListTarget::Apps { limit } => {
            print_items(client.apps().list(ctx, &Scope::root(), limit).await?)
        }
        ListTarget::Functions { app, limit } => {
            let app = resolve_app(client, ctx, &app).await?;
            print_items(client.functions().list(ctx, &Scope::app(app.id), limit).await?)
        }
        ListTarget::Triggers {
            app,
            function,
            limit,
        } => {
            client.triggers().ensure_available()?;
            let scope = match function {
                Some(function) => {
                    let (app, function) = resolve_function(client, ctx, &app, &function).await?;
                    Scope::function(app.id, function.id)
                }
                None => Scope::app(resolve_app(client, ctx, &app).await?.id),
            };
            print_items(client.triggers().list(ctx, &scope, limit).await?)
        }
    }
}
