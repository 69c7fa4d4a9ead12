//! MCP DB Server - Main entry point.
//!
//! This server provides read-only MCP tools for AI assistants to explore
//! and query SQL databases (SQLite, PostgreSQL, MySQL).

use clap::Parser;
use mcp_db_server::config::{Config, TransportMode};
use mcp_db_server::db::ConnectionManager;
use mcp_db_server::gate::QueryGate;
use mcp_db_server::mcp::DbService;
use mcp_db_server::nl::KeywordTranslator;
use mcp_db_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Output goes to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting MCP DB Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let connection_manager = Arc::new(ConnectionManager::new(config.manager_settings()));

    // A bad URL is a configuration error; an unreachable database is not.
    if let Some(descriptor) = config.startup_descriptor()? {
        info!(url = %descriptor.redacted_url(), "Connecting to configured database");
        if let Err(e) = connection_manager.connect(descriptor).await {
            warn!(
                error = %e,
                "Startup connection failed; continuing without a database"
            );
        }
    } else {
        info!("No database configured; waiting for connect_to_database");
    }

    let service = DbService::new(
        connection_manager,
        QueryGate::new(config.row_limits()),
        Arc::new(KeywordTranslator::new()?),
    );

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(service).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
