//! Failsafe control - CLI client for the failsafed control plane.

mod commands;
mod rpc_client;

use anyhow::Result;
use clap::{Parser, Subcommand};

use failsafe_common::state::RecoveryMode;

#[derive(Parser)]
#[command(name = "failsafectl")]
#[command(about = "Failsafe - platform emergency control plane", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the daemon control socket
    #[arg(long, global = true)]
    socket: Option<String>,

    /// Administrator credential (defaults to $FAILSAFE_CREDENTIAL)
    #[arg(long, global = true)]
    credential: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show system status and component states
    Status,

    /// Show the audit log, newest first
    Log {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List available protocols
    Protocols,

    /// Execute an emergency protocol
    Execute {
        /// Protocol id (see `failsafectl protocols`)
        protocol: String,

        /// Why the protocol is being executed
        #[arg(long)]
        reason: String,

        /// Recovery mode: manual, automatic, or progressive
        #[arg(long, default_value = "manual")]
        mode: String,

        /// Recovery window in minutes (automatic/progressive)
        #[arg(long, default_value_t = 15)]
        window: u32,
    },

    /// Recover all components at once
    Recover,

    /// Recover the next component (progressive mode)
    Step,

    /// Reset everything to defaults, clearing incident history
    Reset,

    /// Empty the audit log
    ClearLog,
}

fn require_credential(explicit: Option<String>) -> Result<String> {
    if let Some(credential) = explicit {
        return Ok(credential);
    }
    std::env::var("FAILSAFE_CREDENTIAL").map_err(|_| {
        anyhow::anyhow!("No credential given; pass --credential or set $FAILSAFE_CREDENTIAL")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket = cli.socket.as_deref();

    match cli.command {
        Commands::Status => commands::status(socket).await,
        Commands::Log { limit } => commands::log(socket, limit).await,
        Commands::Protocols => {
            commands::protocols();
            Ok(())
        }
        Commands::Execute {
            protocol,
            reason,
            mode,
            window,
        } => {
            let mode: RecoveryMode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let credential = require_credential(cli.credential)?;
            commands::execute(socket, credential, protocol, reason, mode, window).await
        }
        Commands::Recover => {
            let credential = require_credential(cli.credential)?;
            commands::recover(socket, credential).await
        }
        Commands::Step => {
            let credential = require_credential(cli.credential)?;
            commands::step(socket, credential).await
        }
        Commands::Reset => {
            let credential = require_credential(cli.credential)?;
            commands::reset(socket, credential).await
        }
        Commands::ClearLog => {
            let credential = require_credential(cli.credential)?;
            commands::clear_log(socket, credential).await
        }
    }
}
