use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use composescope_k8s::{KubeClient, KubeLogBackend};
use composescope_logs::{LogOptions, WriterConsumer};
use composescope_metrics::{
    CommandClassifier, NoopTelemetryClient, Status, TelemetryClient, Tracker, has_quiet_flag,
};

mod config;

use config::Config;

/// Namespace used when neither the flag, the context nor the config name one
const DEFAULT_NAMESPACE: &str = "default";

/// Composescope - Service-filtered logs for compose projects on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "composescope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kubernetes context name (defaults to the kubeconfig current-context)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Path to the config file (defaults to ~/.composescope/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only print essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// View output from the services of a project
    Logs(LogsArgs),

    /// Manage contexts
    #[command(subcommand)]
    Context(ContextCommand),
}

#[derive(clap::Args, Debug)]
struct LogsArgs {
    /// Compose project name
    #[arg(value_name = "PROJECT")]
    project: String,

    /// Only show these services (all services if omitted)
    #[arg(value_name = "SERVICE")]
    services: Vec<String>,

    /// Follow log output
    #[arg(short, long)]
    follow: bool,

    /// Number of historical lines to show per container
    #[arg(long)]
    tail: Option<i64>,

    /// Show timestamps
    #[arg(short, long)]
    timestamps: bool,

    /// Don't print the service name prefix
    #[arg(long)]
    no_prefix: bool,

    /// Namespace the project is deployed to
    #[arg(short, long)]
    namespace: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ContextCommand {
    /// List contexts
    #[command(alias = "list")]
    Ls,
}

#[tokio::main]
async fn main() -> ExitCode {
    let argv: Vec<OsString> = std::env::args_os().collect();
    let cli_args = lossy_args(&argv);
    let quiet = has_quiet_flag(&cli_args);

    // Initialize tracing for debugging
    let default_level = if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse_from(&argv) {
        Ok(args) => args,
        Err(e) => {
            // --help and --version end up here as well
            let _ = e.print();
            let status = if e.use_stderr() {
                Status::Failure
            } else {
                Status::Success
            };
            let globals = recover_globals(&argv);
            let config = tracking_config(globals.config.as_deref());
            let context = context_name(globals.context.as_deref());
            track(&config, &context, &cli_args, status).await;
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // Not tracked: the unreadable file may be the one opting out
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    // Run the command
    let result = run_command(&args, &config, quiet, &cancel).await;

    // Handle any errors
    let (status, context) = match &result {
        Ok(context) if cancel.is_cancelled() => (Status::Canceled, context.clone()),
        Ok(context) => (Status::Success, context.clone()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            (Status::Failure, context_name(args.context.as_deref()))
        }
    };

    track(&config, &context, &cli_args, status).await;

    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the selected command, returning the name of the context it used
async fn run_command(
    args: &Args,
    config: &Config,
    quiet: bool,
    cancel: &CancellationToken,
) -> Result<String> {
    let kube_client = KubeClient::new()?;

    match &args.command {
        Command::Logs(logs_args) => {
            let context = kube_client.resolve_context(args.context.as_deref())?;
            run_logs(&kube_client, &context, logs_args, config, quiet, cancel).await?;
            Ok(context)
        }
        Command::Context(ContextCommand::Ls) => {
            list_contexts(&kube_client, quiet);
            Ok(kube_client.current_context().unwrap_or_default().to_string())
        }
    }
}

async fn run_logs(
    kube_client: &KubeClient,
    context: &str,
    args: &LogsArgs,
    config: &Config,
    quiet: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let namespace = args
        .namespace
        .clone()
        .or_else(|| kube_client.namespace_for_context(context))
        .or_else(|| config.logs.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let options = LogOptions::new()
        .with_services(args.services.iter().cloned())
        .follow(args.follow)
        .tail(args.tail.or(config.logs.tail))
        .timestamps(args.timestamps || config.logs.timestamps);

    let client = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        client = kube_client.client_for_context(context) => client?,
    };
    let backend = KubeLogBackend::new(client, namespace.as_str())
        .with_tail_lines(options.tail)
        .with_timestamps(options.timestamps);

    let consumer = WriterConsumer::new(std::io::stdout())
        .with_prefix(!args.no_prefix)
        .with_services(&options.services);

    if options.follow && !quiet {
        eprintln!(
            "Following logs of '{}' in {}/{} (Ctrl-C to stop)",
            args.project, context, namespace
        );
    }

    composescope_logs::logs(&backend, cancel, &args.project, &consumer, &options)
        .await
        .with_context(|| {
            format!(
                "Failed to read logs for project '{}' in namespace '{}'",
                args.project, namespace
            )
        })
}

fn list_contexts(kube_client: &KubeClient, quiet: bool) {
    let contexts = kube_client.contexts();

    if quiet {
        for ctx in &contexts {
            println!("{}", ctx.name);
        }
        return;
    }

    println!("{:<32} {:<32} {}", "NAME", "CLUSTER", "NAMESPACE");
    for ctx in &contexts {
        let name = if ctx.is_current {
            format!("{} *", ctx.name)
        } else {
            ctx.name.clone()
        };
        println!(
            "{:<32} {:<32} {}",
            name,
            ctx.cluster,
            ctx.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
        );
    }
}

/// Arguments after the executable name, lossily decoded for classification
fn lossy_args(argv: &[OsString]) -> Vec<String> {
    argv.iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Global options recovered from an argument vector clap rejected
#[derive(Debug, Default, PartialEq, Eq)]
struct Globals {
    config: Option<PathBuf>,
    context: Option<String>,
}

/// Best-effort parse of `--config` and `--context` after a clap error
///
/// Help and version become plain flags so they do not end the parse, and
/// other errors are skipped where clap allows it.
fn recover_globals(argv: &[OsString]) -> Globals {
    let cmd = Args::command()
        .ignore_errors(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue)
                .global(true),
        );

    let Ok(matches) = cmd.try_get_matches_from(argv) else {
        return Globals::default();
    };
    Globals {
        config: matches.try_get_one::<PathBuf>("config").ok().flatten().cloned(),
        context: matches.try_get_one::<String>("context").ok().flatten().cloned(),
    }
}

/// Config for tracking a run whose own config was never loaded
///
/// A config that cannot be read turns telemetry off rather than falling back
/// to the enabled default.
fn tracking_config(path: Option<&Path>) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "config unreadable, usage tracking disabled");
        Config::without_telemetry()
    })
}

/// Best-effort context name for usage records when the command itself failed
fn context_name(requested: Option<&str>) -> String {
    if let Some(name) = requested {
        return name.to_string();
    }
    KubeClient::new()
        .ok()
        .and_then(|client| client.current_context().map(str::to_string))
        .unwrap_or_default()
}

/// Hand the invocation to telemetry, then give the send a bounded grace period
async fn track(config: &Config, context: &str, args: &[String], status: Status) {
    let http_client = config.telemetry.http_client();
    let client: Arc<dyn TelemetryClient> = match &http_client {
        Some(client) => client.clone(),
        None => Arc::new(NoopTelemetryClient),
    };

    let tracker = Tracker::new(CommandClassifier::new(config.telemetry.command_set()), client);
    tracker.track(context, args, status);

    if let Some(client) = http_client {
        client.wait_for_pending(config.telemetry.timeout()).await;
    }
}
