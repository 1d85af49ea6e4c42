use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use provisioner::{
    AppState, build_app,
    config::{self, ProvisionerConfig},
    directory::DirectoryGate,
    observability::{self, audit::TracingAuditSink},
};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "provisioner.toml";

/// CLI arguments for the provisioner
#[derive(Parser, Debug)]
#[command(version, about = "Employee identity provisioning service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./provisioner.toml if it exists,
    /// otherwise configuration comes from the environment alone)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the server (default)
    Serve,
    /// Export the JSON schema for the configuration file
    Schema {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to ./provisioner.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Schema { output }) => {
            #[cfg(feature = "json-schema")]
            run_schema_export(output);
            #[cfg(not(feature = "json-schema"))]
            {
                let _ = output;
                eprintln!("Error: JSON schema export requires the 'json-schema' feature");
                std::process::exit(1);
            }
        }
        Some(Command::Init { output, force }) => {
            run_init(output, force);
        }
        Some(Command::Serve) | None => {
            run_server(args.config.as_deref()).await;
        }
    }
}

fn load_config(explicit_path: Option<&str>) -> Result<(ProvisionerConfig, Option<PathBuf>), config::ConfigError> {
    let path = match explicit_path {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    match path {
        Some(path) => Ok((ProvisionerConfig::from_file(&path)?, Some(path))),
        None => Ok((ProvisionerConfig::from_env()?, None)),
    }
}

/// Initialize a new configuration file
fn run_init(output: Option<String>, force: bool) {
    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, config::default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set directory.domain (or FTD_DOMAIN), then run:");
    println!("  provisioner serve");
}

/// Export JSON schema for the configuration file to file or stdout
#[cfg(feature = "json-schema")]
fn run_schema_export(output: Option<String>) {
    let content = match serde_json::to_string_pretty(&ProvisionerConfig::json_schema()) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to serialize config schema: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &content) {
                eprintln!("Failed to write to {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Config JSON schema written to {}", path);
        }
        None => {
            println!("{}", content);
        }
    }
}

async fn run_server(explicit_config_path: Option<&str>) {
    let (config, config_path) = match load_config(explicit_config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    match &config_path {
        Some(path) => tracing::info!(config_file = %path.display(), "Starting provisioner"),
        None => tracing::info!("Starting provisioner with environment configuration"),
    }

    let http_client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let gate = Arc::new(DirectoryGate::new());
    if let Err(e) = gate.initialize(&config.directory, &http_client) {
        tracing::error!(error = %e, "Failed to initialize directory client");
        std::process::exit(1);
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, gate, Arc::new(TracingAuditSink));
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
