//! Ping/Pong CLI
//!
//! Thin wrapper around pingpong-core for command-line usage. Pings are sent
//! through an in-process loopback gateway to an in-process responder, so the
//! whole exchange can be watched without a real gateway.
//!
//! ## Usage
//!
//! ```bash
//! # Send three pings and wait for their pongs
//! pingpong send --count 3
//!
//! # Show every ping sent so far
//! pingpong list
//!
//! # Forget all pings
//! pingpong clear
//!
//! # Decode a ping payload
//! pingpong inspect ping.json
//!
//! # Run a ping payload through the responder
//! pingpong respond ping.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pingpong_core::config::public_address;
use pingpong_core::{
    deserialize_ping, Dispatcher, LoopbackGateway, Originator, OriginatorConfig, PingCredentials,
    PingRecord, PingStore, RedbBackend, ResponderConfig, PING_CONTENT_TYPE,
};
use tracing::debug;

/// Address of the in-process gateway
const LOOPBACK_GATEWAY: &str = "http://127.0.0.1:276";

/// Private address and identity of the local pinging endpoint
const PINGER_ADDRESS: &str = "0loopback-pinger";
const PINGER_CERT: &[u8] = b"loopback-pinger-identity";

/// Identity of the in-process responder
const RESPONDER_CERT: &[u8] = b"loopback-pong-identity";

/// Demo authorization granted to the responder
const DEMO_PDA: &[u8] = b"loopback-pda";

/// Ping/Pong - store-and-forward ping demo
#[derive(Parser)]
#[command(name = "pingpong")]
#[command(version = "0.1.0")]
#[command(about = "Ping/Pong - store-and-forward ping demo")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: ~/.pingpong/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Public host of the responder endpoint
    #[arg(long, env = "PUBLIC_ADDRESS", default_value = "pong.local", global = true)]
    public_address: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send pings through the loopback gateway and collect the pongs
    Send {
        /// Number of pings to send
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Print a summary every time the store changes
        #[arg(short, long)]
        watch: bool,
    },

    /// List all pings
    List,

    /// Delete all pings
    Clear,

    /// Decode a ping payload file
    Inspect {
        /// Path to a JSON ping payload
        file: PathBuf,
    },

    /// Run a payload file through the responder
    Respond {
        /// Path to the payload
        file: PathBuf,

        /// Service message type to wrap the payload in
        #[arg(long, default_value = PING_CONTENT_TYPE)]
        content_type: String,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.pingpong/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pingpong")
        .join("data")
}

fn open_store(data_dir: &Path) -> Result<Arc<PingStore<RedbBackend>>> {
    let backend = RedbBackend::open(data_dir.join("pings.redb"))
        .with_context(|| format!("Failed to open store in {}", data_dir.display()))?;
    Ok(Arc::new(PingStore::open(backend)?))
}

/// Gateway with both demo endpoints registered
fn loopback_gateway(responder_address: &str) -> Arc<LoopbackGateway> {
    let gateway = Arc::new(LoopbackGateway::new(LOOPBACK_GATEWAY));
    gateway.register_endpoint(responder_address, RESPONDER_CERT.to_vec());
    gateway.register_endpoint(PINGER_ADDRESS, PINGER_CERT.to_vec());
    gateway
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn print_record(record: &PingRecord) {
    let received = match record.received_at {
        Some(at) => format!(
            "{} ({} ms)",
            format_millis(at),
            record.round_trip_millis().unwrap_or_default()
        ),
        None => "pending".to_string(),
    };
    println!(
        "  Ping {} (sent={}) (received={})",
        record.id,
        format_millis(record.sent_at),
        received
    );
}

async fn send(
    store: Arc<PingStore<RedbBackend>>,
    responder_address: &str,
    count: usize,
    watch: bool,
) -> Result<()> {
    let gateway = loopback_gateway(responder_address);

    let mut updates = watch.then(|| store.observe());

    let pinger = Originator::new(
        OriginatorConfig::new(RESPONDER_CERT.to_vec(), LOOPBACK_GATEWAY),
        PingCredentials {
            authorization: DEMO_PDA.to_vec(),
            authorization_chain: vec![PINGER_CERT.to_vec()],
            sender_credential: PINGER_CERT.to_vec(),
        },
        gateway.clone(),
        gateway.clone(),
        store.clone(),
    );
    let responder = Dispatcher::new(
        ResponderConfig {
            public_address: Some(responder_address.to_string()),
            ..ResponderConfig::default()
        },
        gateway.clone(),
        gateway.clone(),
    );

    let mut sent = Vec::with_capacity(count);
    for _ in 0..count {
        let record = pinger.send_ping().await?;
        debug!(ping_id = %record.id, "Ping queued at loopback gateway");
        sent.push(record.id);
    }

    for envelope in gateway.take(responder_address) {
        let outcome = responder.handle_inbound(LOOPBACK_GATEWAY, &envelope).await;
        debug!(%outcome, "Responder handled envelope");
    }
    for envelope in gateway.take(PINGER_ADDRESS) {
        pinger.handle_inbound(&envelope)?;
    }

    if let Some(updates) = updates.as_mut() {
        while let Some(snapshot) = updates.try_next() {
            let pending = snapshot.iter().filter(|r| r.is_pending()).count();
            println!("[store] {} pings, {} pending", snapshot.len(), pending);
        }
    }

    println!("Sent {} ping(s):", sent.len());
    for id in &sent {
        if let Some(record) = store.get(id) {
            print_record(&record);
        }
    }
    Ok(())
}

async fn respond(responder_address: &str, file: &Path, content_type: &str) -> Result<()> {
    let payload =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let gateway = loopback_gateway(responder_address);
    let responder = Dispatcher::new(
        ResponderConfig {
            public_address: Some(responder_address.to_string()),
            ..ResponderConfig::default()
        },
        gateway.clone(),
        gateway.clone(),
    );

    let envelope =
        gateway.envelope_for(responder_address, PINGER_CERT.to_vec(), content_type, payload)?;
    let outcome = responder.handle_inbound(LOOPBACK_GATEWAY, &envelope).await;

    println!("Outcome: {}", outcome);
    println!("HTTP status: {}", outcome.status_code());
    println!("Acknowledged: {}", outcome.is_acknowledged());
    println!("Pongs delivered: {}", gateway.take(PINGER_ADDRESS).len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let responder_address = public_address(&cli.public_address);

    match cli.command {
        Commands::Send { count, watch } => {
            let store = open_store(&data_dir)?;
            send(store, &responder_address, count, watch).await?;
        }

        Commands::List => {
            let store = open_store(&data_dir)?;
            let records = store.list();
            if records.is_empty() {
                println!("No pings yet.");
            } else {
                let pending = records.iter().filter(|r| r.is_pending()).count();
                println!("Pings ({}, {} pending):", records.len(), pending);
                for record in &records {
                    print_record(record);
                }
            }
        }

        Commands::Clear => {
            let store = open_store(&data_dir)?;
            let count = store.list().len();
            store.clear()?;
            println!("Cleared {} ping(s).", count);
        }

        Commands::Inspect { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let ping = deserialize_ping(&bytes)?;
            println!("Ping:");
            println!("  ID: {}", ping.id);
            println!("  PDA: {} bytes", ping.authorization.len());
            println!("  PDA chain: {} certificate(s)", ping.authorization_chain.len());
            for (i, cert) in ping.authorization_chain.iter().enumerate() {
                println!("    [{}] {} bytes", i, cert.len());
            }
        }

        Commands::Respond { file, content_type } => {
            respond(&responder_address, &file, &content_type).await?;
        }
    }

    Ok(())
}
