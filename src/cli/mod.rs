//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_mcp_schema::{InitializeResult, Tool};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::say::run_say;
use crate::core::app::{build_tool_server, start_tool_link, App};
use crate::core::config::data::Config;
use crate::core::config::defaults::EffectiveConfig;
use crate::mcp::http::serve_http;
use crate::mcp::transport::McpTransport;
use crate::ui::chat_loop::run_chat;

#[derive(Parser, Debug)]
#[command(name = "kratts")]
#[command(about = "A terminal chat assistant for Wild Kratts episodes, products, and places")]
#[command(
    long_about = "kratts answers questions about Wild Kratts episodes and products. The chat \
model calls tools served by an in-process MCP tool server, and catalog results are shown \
as cards below the conversation.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    Your OpenAI API key (required for chat and say)\n\
  OPENAI_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\
  RUST_LOG          Diagnostic log filter written to stderr (defaults to warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to an alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Chat model to use instead of the configured one
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Append the transcript to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and print the reply and cards
    Say {
        /// Prompt text (joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Serve the tools as an MCP server over stdin/stdout, or over HTTP
    Serve {
        /// Listen for JSON-RPC on `POST /mcp` at this address instead of stdio
        #[arg(long, value_name = "ADDR")]
        http: Option<SocketAddr>,
    },
    /// List the tools exposed by the tool server
    Tools,
    /// Print the effective configuration
    Config,
    /// Set a configuration value
    Set {
        /// Configuration key (model, base-url, product-api-url, episode-api-url,
        /// max-tool-rounds, markdown)
        key: String,
        /// Value to set (multiple words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value, restoring its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

/// Diagnostics go to stderr; stdout carries the transcript or the JSON-RPC
/// stream.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_effective_config(args: &Args) -> Result<EffectiveConfig, Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;
    Ok(config.resolve(args.model.as_deref()))
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing();

    let effective = match load_effective_config(&args) {
        Ok(effective) => effective,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    match args.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let app = match App::new(&effective, args.log.clone()).await {
                Ok(app) => app,
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            };
            run_chat(app).await
        }
        Commands::Say { prompt } => run_say(prompt, &effective, args.log.clone()).await,
        Commands::Serve { http: None } => {
            let server = build_tool_server(&effective)?;
            server
                .serve(tokio::io::stdin(), tokio::io::stdout())
                .await
                .map_err(Into::into)
        }
        Commands::Serve { http: Some(addr) } => {
            let server = Arc::new(build_tool_server(&effective)?);
            serve_http(server, addr).await
        }
        Commands::Tools => {
            let client = start_tool_link(&effective).await?;
            let details = client.server_details().await;
            let tools = client.list_tools().await?;
            print!("{}", tool_listing(details.as_ref(), &tools));
            Ok(())
        }
        Commands::Config => {
            effective.print_all();
            Ok(())
        }
        Commands::Set { key, value } => {
            let value = value.join(" ");
            match Config::update(args.config.as_deref(), |config| config.set_key(&key, &value)) {
                Ok(()) => println!("✅ Set {key} to: {value}"),
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            match Config::update(args.config.as_deref(), |config| config.unset_key(&key)) {
                Ok(()) => println!("✅ Unset {key}"),
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}

/// Server banner followed by each tool and the first line of its description.
fn tool_listing(details: Option<&InitializeResult>, tools: &[Tool]) -> String {
    let mut output = String::new();
    if let Some(details) = details {
        output.push_str(&format!(
            "{} {} (protocol {})\n\n",
            details.server_info.name, details.server_info.version, details.protocol_version
        ));
    }
    for tool in tools {
        let description = tool.description.as_deref().unwrap_or_default();
        let summary = description.lines().next().unwrap_or_default();
        output.push_str(&format!("{}\n  {}\n", tool.name, summary));
    }
    output
}
