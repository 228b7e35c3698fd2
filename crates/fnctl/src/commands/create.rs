use super::{app_fields, function_fields, parse_annotations, print_json, resolve_app, resolve_function};
use crate::CreateTarget;
use fnctl_client::Client;
use fnctl_core::{CallContext, Trigger};

pub async fn handle(client: &Client, ctx: &CallContext, target: CreateTarget) -> anyhow::Result<()> {
    match target {
        CreateTarget::App {
            name,
            syslog_url,
            fields,
        } => {
            let app = app_fields(&name, syslog_url, &fields)?;
            print_json(&client.apps().create(ctx, &app).await?)
        }
        CreateTarget::Function {
            app,
            name,
            image,
            fields,
        } => {
            let app = resolve_app(client, ctx, &app).await?;
            let function = function_fields(&name, &app.id, &image, &fields)?;
            print_json(&client.functions().create(ctx, &function).await?)
        }
        CreateTarget::Trigger {
            app,
            function,
            name,
            source,
            trigger_type,
            annotations,
        } => {
            client.triggers().ensure_available()?;
            let (app, function) = resolve_function(client, ctx, &app, &function).await?;
            let trigger = Trigger {
                name,
                app_id: app.id,
                fn_id: function.id,
                source,
                trigger_type: Some(trigger_type),
                annotations: parse_annotations(&annotations)?,
                ..Default::default()
            };
            print_json(&client.triggers().create(ctx, &trigger).await?)
        }
    }
}
