use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use icora_mcp_runtime::{AuthDefaults, McpServer, ToolContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod http;

#[derive(Parser)]
#[command(
    name = "icora-mcp",
    version,
    about = "icora intent MCP server for TMF921 intent management"
)]
struct Cli {
    #[command(flatten)]
    auth: AuthDefaults,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (default)
    Serve,
    /// Serve MCP as JSON-RPC over HTTP
    Http {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icora_mcp=info,icora_mcp_runtime=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let tools = Arc::new(ToolContext::with_startup_config(cli.auth));
    let server = McpServer::new(tools);

    let code = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => match server.serve_stdio().await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(event = "mcp_server_error", error = %err, "MCP server stopped");
                1
            }
        },
        Commands::Http { port } => serve_http(server, port).await,
    };
    std::process::exit(code);
}

async fn serve_http(server: McpServer, port: u16) -> i32 {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(event = "mcp_bind_failed", %addr, error = %err, "Failed to bind");
            return 1;
        }
    };
    tracing::info!("icora MCP server listening on {}", addr);

    match axum::serve(listener, http::router(server)).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(event = "mcp_server_error", error = %err, "HTTP server stopped");
            1
        }
    }
}
