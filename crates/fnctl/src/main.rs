mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use fnctl_client::Client;
use fnctl_config::{ConfigError, TerminalPassphraseSource};
use fnctl_core::{FnError, StderrDiagnostics, TriggerType};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fn", version)]
#[command(about = "Manage applications, functions and triggers on a functions platform", long_about = None)]
struct Cli {
    /// Context to use instead of the current one
    #[arg(long, global = true)]
    context: Option<String>,

    /// Log requests and internal steps to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an application, function or trigger
    Create {
        #[command(subcommand)]
        target: CreateTarget,
    },
    /// Show a resource as JSON
    Get {
        #[command(subcommand)]
        target: Target,
    },
    /// Update a resource
    Update {
        #[command(subcommand)]
        target: UpdateTarget,
    },
    /// Delete a resource
    Delete {
        #[command(subcommand)]
        target: Target,
        /// Succeed when the resource does not exist
        #[arg(long, global = true)]
        ignore_missing: bool,
    },
    /// List resources
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Invoke a function, sending stdin as the request body
    Invoke(InvokeArgs),
}

/// An existing resource, addressed by name
#[derive(Subcommand)]
pub enum Target {
    #[command(alias = "apps")]
    App { name: String },
    #[command(alias = "fn", alias = "functions")]
    Function { app: String, name: String },
    #[command(alias = "triggers")]
    Trigger {
        app: String,
        function: String,
        name: String,
    },
}

#[derive(Args, Default)]
pub struct ConfigArgs {
    /// Configuration entry; an empty value removes the key on update
    #[arg(long = "config", value_name = "KEY=VALUE")]
    pub config: Vec<String>,

    /// Annotation with a JSON value (plain strings are accepted as-is)
    #[arg(long = "annotation", value_name = "KEY=VALUE")]
    pub annotations: Vec<String>,
}

#[derive(Args, Default)]
pub struct FunctionArgs {
    /// Memory in MiB
    #[arg(long)]
    pub memory: Option<u64>,

    /// Maximum run time in seconds
    #[arg(long)]
    pub timeout: Option<u32>,

    /// Seconds an idle container is kept
    #[arg(long)]
    pub idle_timeout: Option<u32>,

    #[command(flatten)]
    pub common: ConfigArgs,
}

#[derive(Subcommand)]
pub enum CreateTarget {
    #[command(alias = "apps")]
    App {
        name: String,
        #[arg(long)]
        syslog_url: Option<String>,
        #[command(flatten)]
        fields: ConfigArgs,
    },
    #[command(alias = "fn", alias = "functions")]
    Function {
        app: String,
        name: String,
        image: String,
        #[command(flatten)]
        fields: FunctionArgs,
    },
    #[command(alias = "triggers")]
    Trigger {
        app: String,
        function: String,
        name: String,
        /// Path the trigger listens on
        #[arg(long)]
        source: String,
        #[arg(long = "type", default_value = "http")]
        trigger_type: TriggerType,
        /// Annotation with a JSON value
        #[arg(long = "annotation", value_name = "KEY=VALUE")]
        annotations: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum UpdateTarget {
    #[command(alias = "apps")]
    App {
        name: String,
        #[arg(long)]
        syslog_url: Option<String>,
        #[command(flatten)]
        fields: ConfigArgs,
    },
    #[command(alias = "fn", alias = "functions")]
    Function {
        app: String,
        name: String,
        #[arg(long)]
        image: Option<String>,
        #[command(flatten)]
        fields: FunctionArgs,
    },
    #[command(alias = "triggers")]
    Trigger {
        app: String,
        function: String,
        name: String,
        #[arg(long)]
        source: Option<String>,
        /// New trigger type; the stored type is kept when omitted
        #[arg(long = "type")]
        trigger_type: Option<TriggerType>,
        #[arg(long = "annotation", value_name = "KEY=VALUE")]
        annotations: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ListTarget {
    #[command(alias = "app")]
    Apps {
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        limit: i64,
    },
    #[command(alias = "fn", alias = "fns", alias = "function")]
    Functions {
        app: String,
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        limit: i64,
    },
    #[command(alias = "trigger")]
    Triggers {
        app: String,
        /// Only triggers of this function
        function: Option<String>,
        #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
        limit: i64,
    },
}

#[derive(Args)]
pub struct InvokeArgs {
    #[arg(required_unless_present_any = ["fn_id", "endpoint"])]
    pub app: Option<String>,

    #[arg(required_unless_present_any = ["fn_id", "endpoint", "route"])]
    pub function: Option<String>,

    /// Invoke the function with this id instead of looking it up by name
    #[arg(long, value_name = "ID", conflicts_with_all = ["app", "function", "endpoint", "route"])]
    pub fn_id: Option<String>,

    /// Call a route of the app through the call URL (`<call-url>/r/<app>/<route>`)
    #[arg(long, conflicts_with_all = ["function", "endpoint"])]
    pub route: Option<String>,

    /// Content type of the request body
    #[arg(long)]
    pub content_type: Option<String>,

    /// Environment variable to forward as a request header
    #[arg(long = "env", value_name = "NAME")]
    pub env: Vec<String>,

    /// Forward the whole environment as request headers
    #[arg(long, conflicts_with = "env")]
    pub inherit_env: bool,

    /// HTTP method (defaults to POST with a body, GET without)
    #[arg(long)]
    pub method: Option<String>,

    /// Print the call id of synchronous calls
    #[arg(long)]
    pub display_call_id: bool,

    /// Invoke this URL instead of looking the function up
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<FnError>() {
        return err.exit_code() as u8;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return 1;
    }
    2
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = fnctl_config::load(cli.context.as_deref())?;
    let client = Client::from_config(
        &config,
        &TerminalPassphraseSource,
        Arc::new(StderrDiagnostics),
    )?;
    debug!(
        provider = client.provider().id(),
        api_url = %client.provider().api_url(),
        "Client ready"
    );

    let ctx = client.context();
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match cli.command {
        Commands::Create { target } => commands::create::handle(&client, &ctx, target).await,
        Commands::Get { target } => commands::get::handle(&client, &ctx, target).await,
        Commands::Update { target } => commands::update::handle(&client, &ctx, target).await,
        Commands::Delete {
            target,
            ignore_missing,
        } => commands::delete::handle(&client, &ctx, target, ignore_missing).await,
        Commands::List { target } => commands::list::handle(&client, &ctx, target).await,
        Commands::Invoke(args) => commands::invoke::handle(&client, &ctx, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            ExitCode::from(exit_code(&err))
        }
    }
}
