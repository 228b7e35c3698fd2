use super::{app_fields, function_fields, parse_annotations, print_json, resolve_app, resolve_function, resolve_trigger};
use crate::UpdateTarget;
use fnctl_client::Client;
use fnctl_core::{CallContext, Trigger};

pub async fn handle(client: &Client, ctx: &CallContext, target: UpdateTarget) -> anyhow::Result<()> {
    match target {
        UpdateTarget::App {
            name,
            syslog_url,
            fields,
        } => {
            let changes = app_fields("", syslog_url, &fields)?;
            let app = resolve_app(client, ctx, &name).await?;
            print_json(&client.apps().update(ctx, &app.id, &changes).await?)
        }
        UpdateTarget::Function {
            app,
            name,
            image,
            fields,
        } => {
            let changes = function_fields("", "", image.as_deref().unwrap_or_default(), &fields)?;
            let (_, function) = resolve_function(client, ctx, &app, &name).await?;
            print_json(&client.functions().update(ctx, &function.id, &changes).await?)
        }
        UpdateTarget::Trigger {
            app,
            function,
            name,
            source,
            trigger_type,
            annotations,
        } => {
            let changes = Trigger {
                source: source.unwrap_or_default(),
                trigger_type,
                annotations: parse_annotations(&annotations)?,
                ..Default::default()
            };
            let trigger = resolve_trigger(client, ctx, &app, &function, &name).await?;
            print_json(&client.triggers().update(ctx, &trigger.id, &changes).await?)
        }
    }
}
