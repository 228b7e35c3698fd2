use super::resolve_function;
use crate::InvokeArgs;
use fnctl_client::{Client, EnvSelection, InvokeOptions, invoke_url_for};
use fnctl_core::{CallContext, FnError, Result};
use std::io::IsTerminal;

/// Invoke URL from the most specific target given on the command line
async fn target_url(client: &Client, ctx: &CallContext, args: &InvokeArgs) -> Result<String> {
    if let Some(url) = &args.endpoint {
        return Ok(url.clone());
    }
    if let Some(id) = &args.fn_id {
        let function = client.functions().get_by_id(ctx, id).await?;
        return invoke_url_for(&function);
    }

    let app = args.app.as_deref().unwrap_or_default();
    if let Some(route) = &args.route {
        return Ok(client.route_url(app, route));
    }
    let name = args.function.as_deref().unwrap_or_default();
    let (_, function) = resolve_function(client, ctx, app, name).await?;
    invoke_url_for(&function)
}

pub async fn handle(client: &Client, ctx: &CallContext, args: InvokeArgs) -> anyhow::Result<()> {
    let url = target_url(client, ctx, &args).await?;

    let env = if args.inherit_env {
        EnvSelection::Inherit
    } else {
        EnvSelection::Names(args.env)
    };
    let mut options = InvokeOptions::new(url)
        .with_content_type(args.content_type.unwrap_or_default())
        .with_env(env)
        .with_display_call_id(args.display_call_id);
    if let Some(method) = args.method {
        let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| FnError::InvalidArgument(format!("invalid HTTP method '{}'", method)))?;
        options = options.with_method(method);
    }

    // An interactive terminal means there is no body to send
    let body = if std::io::stdin().is_terminal() {
        None
    } else {
        Some(tokio::io::stdin())
    };

    let mut stdout = tokio::io::stdout();
    client
        .invoker()?
        .invoke(ctx, &options, body, &mut stdout)
        .await?;
    Ok(())
}
