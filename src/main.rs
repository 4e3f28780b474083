//! VitalWatch CLI
//!
//! Usage:
//!   vitalwatch serve                         # HTTP API server (+ optional poll loop)
//!   vitalwatch once --fixture telemetry.json # Single cycle against a fixture
//!   vitalwatch once --json                   # JSON output
//!   vitalwatch encrypt "210"                 # Produce a field ciphertext
//!   vitalwatch decrypt "<base64>"            # Inspect a field ciphertext

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalwatch::config::Config;
use vitalwatch::core::{
    run_server, Aggregator, HttpTriageProvider, InMemoryTelemetryStore, LogMessenger, Messenger,
    RestTelemetryStore, TelemetryStore, TriageProvider, WebhookMessenger,
};
use vitalwatch::types::{ErrorDocument, ResponseDocument};
use vitalwatch::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "vitalwatch",
    version = VERSION,
    about = "VitalWatch - Emergency decision engine for encrypted patient telemetry",
    long_about = "VitalWatch polls a telemetry store for encrypted vitals, SOS, motion\n\
                  and access-control snapshots, decides whether an emergency is in\n\
                  progress and notifies a caregiver once per episode.\n\n\
                  Emergencies (highest priority first):\n  \
                  SOS Button Pressed\n  \
                  Fall Detected\n  \
                  Critical High / Low Heart Rate\n  \
                  Critical High / Low Temperature\n  \
                  Security Breach (5+ unauthorized attempts in 5 minutes)"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: $VITALWATCH_CONFIG or ./vitalwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read telemetry from a JSON fixture ({path: snapshot}) instead of the store
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Server address (overrides server.addr)
        #[arg(long)]
        addr: Option<String>,

        /// Poll the store in the background every N ms (overrides server.poll_interval_ms)
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
    /// Run a single cycle and print the document
    Once,
    /// Encrypt a plaintext field value
    Encrypt { text: String },
    /// Decrypt a field ciphertext
    Decrypt { text: String },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let (config, source) = match Config::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_ansi(!args.no_color))
        .init();
    source.log();

    let result = match &args.command {
        Command::Serve { addr, poll_interval_ms } => {
            run_serve(&args, &config, addr.clone(), *poll_interval_ms).await
        }
        Command::Once => run_once(&args, &config).await,
        Command::Encrypt { text } => run_encrypt(&config, text),
        Command::Decrypt { text } => run_decrypt(&config, text),
    };

    if let Err(e) = result {
        error!(error = %e, "fatal");
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Wire collaborators from config and flags
async fn build_aggregator(args: &Args, config: &Config) -> Result<Aggregator, Box<dyn std::error::Error>> {
    // In-memory stores also accept device pushes on POST /data
    let (store, ingest): (Arc<dyn TelemetryStore>, Option<Arc<InMemoryTelemetryStore>>) =
        match (&args.fixture, &config.store.base_url) {
            (Some(path), _) => {
                let memory = Arc::new(InMemoryTelemetryStore::load(path).await?);
                (memory.clone() as Arc<dyn TelemetryStore>, Some(memory))
            }
            (None, Some(url)) => {
                let rest = RestTelemetryStore::new(
                    url,
                    config.store.auth_token.clone(),
                    Duration::from_millis(config.store.timeout_ms),
                )?;
                (Arc::new(rest) as Arc<dyn TelemetryStore>, None)
            }
            (None, None) => {
                info!("no store.base_url configured, telemetry is pushed via POST /data");
                let memory = Arc::new(InMemoryTelemetryStore::new());
                (memory.clone() as Arc<dyn TelemetryStore>, Some(memory))
            }
        };

    let messenger: Arc<dyn Messenger> = match &config.messaging.webhook_url {
        Some(url) => Arc::new(WebhookMessenger::new(url, Duration::from_millis(config.messaging.timeout_ms))?),
        None => {
            warn!("no messaging.webhook_url configured, alerts will only be logged");
            Arc::new(LogMessenger)
        }
    };

    let triage: Option<Arc<dyn TriageProvider>> = match &config.triage.endpoint {
        Some(url) => Some(Arc::new(HttpTriageProvider::new(
            url,
            Duration::from_millis(config.triage.timeout_ms),
        )?)),
        None => None,
    };

    let aggregator = Aggregator::new(config, store, messenger, triage)?;
    Ok(match ingest {
        Some(memory) => aggregator.with_ingest(memory),
        None => aggregator,
    })
}

/// Run a single cycle (one-shot)
async fn run_once(args: &Args, config: &Config) -> CliResult {
    let aggregator = build_aggregator(args, config).await?;
    match aggregator.run_cycle().await {
        Ok(doc) => {
            print_document(&doc, args)?;
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ErrorDocument::new(e.to_string()))?);
            }
            Err(e.into())
        }
    }
}

fn print_document(doc: &ResponseDocument, args: &Args) -> CliResult {
    if args.json {
        println!("{}", serde_json::to_string_pretty(doc)?);
    } else if args.no_color {
        println!("{}", doc.to_parseable_string());
    } else {
        println!("{}", doc.to_terminal_string());
        if let Some(brief) = &doc.triage {
            println!(
                "  {} {:?} (priority {}) - {}",
                "triage:".bold(),
                brief.risk_level,
                brief.priority,
                brief.suggested_response
            );
        }
    }
    Ok(())
}

fn run_encrypt(config: &Config, text: &str) -> CliResult {
    println!("{}", config.codec()?.encrypt(text));
    Ok(())
}

fn run_decrypt(config: &Config, text: &str) -> CliResult {
    println!("{}", config.codec()?.decrypt(text)?);
    Ok(())
}

/// Run HTTP API server, plus the background poll loop when enabled
async fn run_serve(args: &Args, config: &Config, addr: Option<String>, poll_interval_ms: Option<u64>) -> CliResult {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let aggregator = Arc::new(build_aggregator(args, config).await?);

    println!();
    println!("{}", format!("🩺 VitalWatch v{}", VERSION).bold());
    println!();

    if let Some(ms) = poll_interval_ms.or(config.server.poll_interval_ms).filter(|ms| *ms > 0) {
        info!(interval_ms = ms, "background polling enabled");
        let poller = aggregator.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = poller.run_cycle().await {
                    warn!(error = %e, "background cycle failed");
                }
            }
        });
    }

    run_server(&addr, aggregator).await
}
