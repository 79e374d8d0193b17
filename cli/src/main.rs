use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod util;

use commands::intent::CreateIntentArgs;
use commands::tools::{CallArgs, ConfigureAuthArgs};

#[derive(Parser)]
#[command(
    name = "icora",
    version,
    about = "icora intent CLI: create TMF921 network intents through the icora MCP server"
)]
struct Cli {
    /// MCP server base URL
    #[arg(long, env = "MCP_FUNCTION_URL", default_value = "http://localhost:8080")]
    mcp_url: String,

    /// WireMock backend URL passed to icoraintent_configure_auth
    #[arg(
        long,
        env = "WIREMOCK_FUNCTION_URL",
        default_value = "https://YOUR_WIREMOCK_FUNCTION_URL"
    )]
    wiremock_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools the MCP server exposes
    Tools,
    /// Check MCP server health
    Status,
    /// Point the MCP server at the WireMock backend
    ConfigureAuth(ConfigureAuthArgs),
    /// Acquire a token through the configured backend
    TestAuth,
    /// Create a network intent
    CreateIntent(CreateIntentArgs),
    /// Check the MCP server's connectivity to WireMock
    Connectivity,
    /// Call any MCP tool with raw JSON arguments
    Call(CallArgs),
    /// Run status check, auth configuration, and a test intent in sequence
    Workflow,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icora_cli=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mcp_url = cli.mcp_url.trim_end_matches('/').to_string();
    let code = match cli.command {
        Commands::Tools => commands::tools::call(&mcp_url, "list_tools", json!({})).await,
        Commands::Status => commands::tools::status(&mcp_url).await,
        Commands::ConfigureAuth(args) => {
            commands::tools::configure_auth(&mcp_url, &cli.wiremock_url, &args).await
        }
        Commands::TestAuth => {
            commands::tools::call(&mcp_url, "icoraintent_test_auth", json!({})).await
        }
        Commands::CreateIntent(args) => commands::intent::create(&mcp_url, &args).await,
        Commands::Connectivity => {
            commands::tools::call(&mcp_url, "check_connectivity", json!({})).await
        }
        Commands::Call(args) => commands::tools::call_raw(&mcp_url, args).await,
        Commands::Workflow => commands::workflow::run(&mcp_url, &cli.wiremock_url).await,
    };
    std::process::exit(code);
}
