use super::{print_json, resolve_app, resolve_function, resolve_trigger};
use crate::Target;
use fnctl_client::Client;
use fnctl_core::CallContext;

pub async fn handle(client: &Client, ctx: &CallContext, target: Target) -> anyhow::Result<()> {
    match target {
        Target::App { name } => print_json(&resolve_app(client, ctx, &name).await?),
        Target::Function { app, name } => {
            let (_, function) = resolve_function(client, ctx, &app, &name).await?;
            print_json(&function)
        }
        Target::Trigger {
            app,
            function,
            name,
        } => print_json(&resolve_trigger(client, ctx, &app, &function, &name).await?),
    }
}
