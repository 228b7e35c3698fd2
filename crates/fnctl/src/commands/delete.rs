use super::{resolve_app, resolve_function, resolve_trigger};
use crate::Target;
use colored::Colorize;
use fnctl_client::Client;
use fnctl_core::{CallContext, ErrorKind, Result};

/// A lookup miss counts as already deleted when `ignore_missing` is set
fn found<T>(lookup: Result<T>, ignore_missing: bool) -> Result<Option<T>> {
    match lookup {
        Ok(value) => Ok(Some(value)),
        Err(err) if ignore_missing && err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

pub async fn handle(
    client: &Client,
    ctx: &CallContext,
    target: Target,
    ignore_missing: bool,
) -> anyhow::Result<()> {
    let deleted = match target {
        Target::App { name } => {
            match found(resolve_app(client, ctx, &name).await, ignore_missing)? {
                Some(app) => {
                    client.apps().delete(ctx, &app.id, ignore_missing).await?;
                    Some(name)
                }
                None => None,
            }
        }
        Target::Function { app, name } => {
            match found(resolve_function(client, ctx, &app, &name).await, ignore_missing)? {
                Some((_, function)) => {
                    client
                        .functions()
                        .delete(ctx, &function.id, ignore_missing)
                        .await?;
                    Some(name)
                }
                None => None,
            }
        }
        Target::Trigger {
            app,
            function,
            name,
        } => {
            client.triggers().ensure_available()?;
            let lookup = resolve_trigger(client, ctx, &app, &function, &name).await;
            match found(lookup, ignore_missing)? {
                Some(trigger) => {
                    client
                        .triggers()
                        .delete(ctx, &trigger.id, ignore_missing)
                        .await?;
                    Some(name)
                }
                None => None,
            }
        }
    };

    if let Some(name) = deleted {
        eprintln!("{} {}", name.cyan(), "deleted".green());
    }
    Ok(())
}
