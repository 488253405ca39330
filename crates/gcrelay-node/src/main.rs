//! gcrelay -- operator tool for the GC message relay.
//!
//! Usage:
//!   gcrelay                               # Validate the default config
//!   gcrelay --config path.toml check-config
//!   gcrelay decode <hex|base64>           # Print an envelope
//!   gcrelay dry-run                       # Print the synthetic lobby sequence
//!   gcrelay resend match_42.txt           # Post a stored match document

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gcrelay_lifecycle::Delivery;
use gcrelay_node::runtime::build_lobby;
use gcrelay_node::{describe_envelope, parse_envelope_arg, HttpDelivery, RelayConfig};

#[derive(Parser)]
#[command(name = "gcrelay", about = "GC message relay for a dedicated game server")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "gcrelay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the config (default)
    CheckConfig,
    /// Decode an envelope given as hex or base64
    Decode {
        envelope: String,
    },
    /// Stage the configured lobby, inject it and print every envelope
    DryRun {
        /// Connect string placed in the lobby
        #[arg(long, default_value = "127.0.0.1:27015")]
        connect: String,
        /// Server steam id placed in the lobby
        #[arg(long, default_value_t = 0)]
        server_id: u64,
        /// Also finalize the lobby (hibernation end)
        #[arg(long)]
        finalize: bool,
    },
    /// Post a stored match document to the configured endpoint
    Resend {
        file: PathBuf,
        /// Give up waiting for delivery after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gcrelay_node=info,gcrelay_relay=info,gcrelay_lobby=info,gcrelay_lifecycle=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let cfg = RelayConfig::load_or_default(&cli.config)?;

    match cli.command.unwrap_or(Commands::CheckConfig) {
        Commands::CheckConfig => {
            cfg.validate()?;
            let lobby = build_lobby(&cfg)?;
            println!("Config: {}", cli.config.display());
            if cfg.relay.match_post_url.is_empty() {
                println!("Match endpoint: none (results written to {})", cfg.relay.results_dir);
            } else {
                println!("Match endpoint: {}", cfg.relay.match_post_url);
            }
            print!("{}", lobby.describe());
        }
        Commands::Decode { envelope } => {
            let bytes = parse_envelope_arg(&envelope)?;
            println!("{}", describe_envelope(&bytes)?);
        }
        Commands::DryRun {
            connect,
            server_id,
            finalize,
        } => {
            cfg.validate()?;
            let mut lobby = build_lobby(&cfg)?;
            let mut sink: Vec<Vec<u8>> = Vec::new();
            lobby.inject_session(server_id, &connect, &mut sink)?;
            if finalize {
                lobby.finalize(&mut sink)?;
            }

            for (i, envelope) in sink.iter().enumerate() {
                println!("--- envelope {} ({} bytes)", i + 1, envelope.len());
                println!("{}", describe_envelope(envelope)?);
            }
            println!("--- lobby state {} version {}", lobby.state().name(), lobby.version());
        }
        Commands::Resend { file, timeout_secs } => {
            let url = &cfg.relay.match_post_url;
            if url.is_empty() {
                anyhow::bail!("relay.match_post_url is not set in {}", cli.config.display());
            }
            let document = std::fs::read(&file)?;
            serde_json::from_slice::<serde_json::Value>(&document)
                .map_err(|e| anyhow::anyhow!("{} is not a JSON document: {e}", file.display()))?;

            let mut delivery = HttpDelivery::new(url, &cfg.delivery, tokio::runtime::Handle::current())?;
            delivery.submit(document);
            tracing::info!(url = %url, file = %file.display(), "resend: submitted");

            tokio::time::timeout(Duration::from_secs(timeout_secs), delivery.drain())
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "delivery still in flight after {timeout_secs}s ({} attempts pending)",
                        delivery.in_flight()
                    )
                })?;
            println!("Delivery finished for {}", file.display());
        }
    }

    Ok(())
}
