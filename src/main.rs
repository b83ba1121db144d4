//! milvus-mcp: MCP server exposing a Milvus database as tools
//!
//! Speaks MCP over stdio; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use milvus_mcp::config::{self, ConnectionOverrides};
use milvus_mcp::mcp::{McpServer, ToolDispatcher};
use milvus_mcp::milvus::MilvusConnector;

/// MCP server for Milvus.
///
/// Exposes collection listing, collection info, full-text search, filtered
/// query and entity count as tools.
#[derive(Parser, Debug)]
#[command(name = "milvus-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Milvus server URI, e.g. http://localhost:19530
    #[arg(long, env = "MILVUS_URI")]
    milvus_uri: Option<String>,

    /// Milvus authentication token
    #[arg(long, env = "MILVUS_TOKEN", hide_env_values = true)]
    milvus_token: Option<String>,

    /// Milvus database name [default: default]
    #[arg(long, env = "MILVUS_DB")]
    db_name: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. stdout carries MCP traffic, so logs go to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the milvus-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match cfg.milvus_settings(ConnectionOverrides {
        uri: args.milvus_uri,
        token: args.milvus_token,
        db_name: args.db_name,
    }) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting milvus-mcp server"
    );
    info!(
        uri = %settings.uri,
        db_name = %settings.db_name,
        authenticated = settings.token.is_some(),
        "Milvus connection configured"
    );

    let connector = match MilvusConnector::connect(&settings) {
        Ok(connector) => connector,
        Err(e) => {
            error!(error = %e, "Failed to create Milvus client");
            return ExitCode::FAILURE;
        }
    };

    let mut server = McpServer::stdio(ToolDispatcher::new(connector));

    info!("MCP server ready, waiting for client connection...");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
