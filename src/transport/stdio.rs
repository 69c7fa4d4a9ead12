//! Stdio transport: one MCP session over stdin/stdout.
//!
//! Stdout carries protocol frames only; logs go to stderr.

use crate::error::{DbError, DbResult};
use crate::mcp::DbService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Serves a single `DbService` until the client closes stdin or a signal arrives.
pub struct StdioTransport {
    service: DbService,
}

impl StdioTransport {
    pub fn new(service: DbService) -> Self {
        Self { service }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let connection_manager = self.service.connection_manager().clone();
        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Client closed the stdio session");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        connection_manager.disconnect().await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // A second signal skips the disconnect below.
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing database connection");
        connection_manager.disconnect().await;

        if shutdown_requested {
            // tokio::select! cannot interrupt a blocking stdin read
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConnectionManager;
    use crate::gate::QueryGate;
    use crate::nl::KeywordTranslator;
    use std::sync::Arc;

    #[test]
    fn test_stdio_transport_creation() {
        let service = DbService::new(
            Arc::new(ConnectionManager::default()),
            QueryGate::default(),
            Arc::new(KeywordTranslator::new().unwrap()),
        );
        let transport = StdioTransport::new(service);
        assert_eq!(transport.name(), "stdio");
    }
}
