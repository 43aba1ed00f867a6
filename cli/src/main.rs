//! NullIndex CLI — index Bitcoin OP_RETURN payloads and search them.
//!
//! # Commands
//! ```text
//! nullindex run    --network <mainnet|testnet>   walk the chain backward once
//! nullindex serve                                serve GET /opreturn/:data
//! nullindex info                                 print network profiles
//! ```
//!
//! Every flag has an environment fallback; see `nullindex <command> --help`.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use nullindex_core::Network;

mod cmd_run;
mod cmd_serve;
mod config;
mod logging;
mod shutdown;
mod store;

use config::{DatabaseArgs, LogArgs, NodeArgs, ServeArgs};

#[derive(Parser)]
#[command(
    name = "nullindex",
    about = "Resumable Bitcoin OP_RETURN indexer",
    long_about = "
NullIndex walks a Bitcoin Core node's chain from the tip backward, extracts
every OP_RETURN (null-data) payload and stores it idempotently. Progress is
derived from what is already stored, so runs can be stopped and restarted.

ENVIRONMENT VARIABLES:
  NETWORK                       mainnet | testnet
  RPC_URL, RPC_USERNAME, RPC_PASSWORD
  DATABASE_URL                  or DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME
  DEPTH_LIMIT                   override the network's depth limit
  WEB_SERVER_PORT               search API port (default 8080)
  LOG_LEVEL, LOG_JSON
",
    version
)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the chain backward once, from the computed start to the computed end
    Run {
        #[command(flatten)]
        node: NodeArgs,
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Serve the read-only payload search API
    Serve {
        #[command(flatten)]
        db: DatabaseArgs,
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Print the built-in network profiles
    Info,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init_tracing(&cli.log.log_config());

    let result: Result<()> = match &cli.command {
        Commands::Run { node, db } => cmd_run::run(node, db).await,
        Commands::Serve { db, serve } => cmd_serve::serve(db, serve).await,
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "nullindex failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_info() {
    println!("NullIndex v{}", env!("CARGO_PKG_VERSION"));
    for network in Network::ALL {
        println!("  {network}");
        println!("    depth limit:     {}", network.depth_limit());
        println!("    default RPC URL: {}", network.default_rpc_url());
    }
    println!("  Storage backends: postgres (postgres://…), sqlite (sqlite:…)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_flags() {
        let cli = Cli::try_parse_from([
            "nullindex",
            "run",
            "--network",
            "testnet",
            "--database-url",
            "sqlite:./x.db",
            "--depth-limit",
            "2500000",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { node, db } => {
                assert_eq!(node.network, Network::Testnet);
                assert_eq!(node.depth_limit(), 2_500_000);
                assert_eq!(db.target().unwrap().redacted(), "sqlite:./x.db");
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn unknown_network_is_rejected() {
        assert!(Cli::try_parse_from(["nullindex", "run", "--network", "signet"]).is_err());
    }
}
