//! DAO Platform Command Line Interface
//!
//! Usage:
//!   dao start            - Start the API server
//!   dao verify-tx <hash> - Verify a transaction against the chain
//!   dao recount-members  - Recompute DAO member counts
//!   dao status           - Show chain and server status
//!
//! Settings come from the environment (a `.env` file is honoured); flags
//! override them.

use clap::{Parser, Subcommand};
use dao_core::logging::LogLevel;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "dao")]
#[command(about = "DAO platform backend")]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "DAO_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// JSON-RPC endpoint, overrides DAO_CHAIN_RPC_URL
    #[arg(long, env = "DAO_CHAIN_RPC_URL")]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Start {
        /// Host to bind to, overrides DAO_API_HOST
        #[arg(short = 'H', long)]
        host: Option<String>,
        /// Port to listen on, overrides DAO_API_PORT
        #[arg(short, long)]
        port: Option<u16>,
        /// Document snapshot loaded at startup and written back on shutdown
        #[arg(long, env = "DAO_DATA_FILE")]
        data_file: Option<PathBuf>,
        /// Serve payments from the in-process mock provider
        #[arg(long)]
        mock_payments: bool,
    },

    /// Verify a transaction receipt and decode its events
    VerifyTx {
        /// Transaction hash
        tx_hash: String,
        /// Contract module whose event must appear (e.g. ProposalVotingModule)
        #[arg(short, long, requires = "event")]
        module: Option<String>,
        /// Event name
        #[arg(short, long, requires = "module")]
        event: Option<String>,
        /// Required destination contract
        #[arg(short, long)]
        to: Option<String>,
    },

    /// Recompute every DAO's member count from its members
    RecountMembers {
        /// Document snapshot to correct in place
        #[arg(long, env = "DAO_DATA_FILE")]
        data_file: PathBuf,
    },

    /// Show chain and server status
    Status {
        /// API server URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        api_url: String,
    },
}

fn init_logging(level: &str) {
    let level = LogLevel::from_str(level).unwrap_or_default();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run_command(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(cli: Cli) -> commands::CmdResult {
    let rpc_url = cli.rpc_url;
    match cli.command {
        Commands::Start {
            host,
            port,
            data_file,
            mock_payments,
        } => {
            commands::handle_start(commands::StartOptions {
                rpc_url,
                host,
                port,
                data_file,
                mock_payments,
            })
            .await
        }

        Commands::VerifyTx {
            tx_hash,
            module,
            event,
            to,
        } => {
            commands::handle_verify_tx(rpc_url, &tx_hash, module.zip(event), to.as_deref()).await
        }

        Commands::RecountMembers { data_file } => commands::handle_recount_members(&data_file).await,

        Commands::Status { api_url } => commands::handle_status(rpc_url, &api_url).await,
    }
}
