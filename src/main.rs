use clap::{Parser, Subcommand};
use pii_transform::event::{default_customers, generate_events};
use pii_transform::kafka::KeyStrategy;
use pii_transform::registry::RegistryClient;
use pii_transform::{config::REGISTRY_TIMEOUT, loader, transform, LoaderConfig, Result, TransformConfig};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pii-transform")]
#[command(about = "Avro event loader and PII masking transform", long_about = None)]
struct Args {
    #[arg(short, long, global = true, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, global = true, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write synthetic events to a JSON file
    Generate {
        #[arg(short = 'n', long, default_value_t = 2000)]
        count: usize,

        #[arg(short, long, default_value = "demo_event_data.json")]
        output: PathBuf,

        #[arg(short = 't', long = "type", default_value = "demoEvent")]
        event_type: String,
    },
    /// Publish a JSON event file in one transaction
    Load {
        #[arg(long, value_name = "FILE")]
        filename: PathBuf,

        #[arg(short = 't', long = "type", default_value = "demoEvent")]
        event_type: String,

        #[arg(long, default_value = "message-key", help = "message-key, none or fixed:<key>")]
        key_strategy: KeyStrategy,
    },
    /// Mask names on the input topic into the output topic
    Transform,
    /// Register an Avro schema file under a subject
    RegisterSchema {
        #[arg(long)]
        subject: String,

        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    if let Err(e) = run(args.command).await {
        error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Generate {
            count,
            output,
            event_type,
        } => {
            // Only one kind exists; reject anything else up front.
            event_type.parse::<pii_transform::event::EventKind>()?;
            let events = generate_events(&mut rand::rng(), &default_customers(), count);
            tokio::fs::write(&output, serde_json::to_vec_pretty(&events)?).await?;
            info!(count, output = %output.display(), "Generated events");
        }
        Command::Load {
            filename,
            event_type,
            key_strategy,
        } => {
            let config = LoaderConfig::from_env()?;
            info!(
                topic = %config.destination_topic,
                schema_id = config.destination_schema_id,
                seeds = ?config.seeds,
                "Configuration summary"
            );
            let count = loader::load_file(
                &config,
                &filename,
                &event_type,
                &key_strategy,
                shutdown_token(),
            )
            .await?;
            info!(count, "Load complete");
        }
        Command::Transform => {
            let config = TransformConfig::from_env()?;
            info!(
                input = %config.input_topic,
                output = %config.output_topic,
                group = %config.group_id,
                "Configuration summary"
            );
            transform::run_transform(&config, shutdown_token()).await?;
        }
        Command::RegisterSchema { subject, file } => {
            let registry_url = std::env::var(pii_transform::config::REGISTRY_URL_VAR)
                .map_err(|_| {
                    pii_transform::Error::Config(format!(
                        "{} environment variable is required",
                        pii_transform::config::REGISTRY_URL_VAR
                    ))
                })?;
            let schema = tokio::fs::read_to_string(&file).await?;
            let id = RegistryClient::new(&registry_url, REGISTRY_TIMEOUT)?
                .register(&subject, &schema)
                .await?;
            println!("{}", id);
        }
    }
    Ok(())
}

/// Token cancelled on Ctrl+C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
            cancel.cancel();
        }
    });
    token
}

/// Maps `LOG_LEVEL` (`DEBUG`, `INFO`, `WARNING`, `ERROR`) to a filter level.
fn log_level() -> &'static str {
    match std::env::var("LOG_LEVEL").unwrap_or_default().to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("pii_transform=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("pii_transform={},warn", log_level())))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
