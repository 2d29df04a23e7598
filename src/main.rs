//! Solana vanity keypair CLI
//!
//! Usage:
//!   solvanity grind pump               # Grind an address ending in "pump"
//!   solvanity grind moon -o moon.json  # Write the keypair to a file
//!   solvanity acquire pump             # Claim from the pool, grind if empty
//!   solvanity serve                    # Run the pool HTTP service

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solvanity_pool::web::{create_router, AppState};
use solvanity_pool::{
    AppConfig, CancelToken, ClaimOutcome, GrindEvent, GrindHandle, Keypair, PoolService,
    SuffixTarget,
};

/// Solana vanity keypair grinder and pool service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grind a keypair whose address ends with the suffix
    Grind(GrindArgs),
    /// Claim a pooled keypair, grinding one if the pool has none
    Acquire(GrindArgs),
    /// Serve the donate/claim HTTP API
    Serve,
}

#[derive(Args, Debug)]
struct GrindArgs {
    /// Suffix to match (case-insensitive, up to 8 characters)
    suffix: Option<String>,

    /// Number of worker threads (default: config, then CPU count)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Progress report interval in attempts per worker
    #[arg(short = 'r', long)]
    report_interval: Option<u64>,

    /// Give up after this many seconds (0 = never)
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Write the keypair as JSON to this file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

impl GrindArgs {
    fn apply(&self, config: &mut AppConfig) {
        if self.workers.is_some() {
            config.grind.workers = self.workers;
        }
        if let Some(interval) = self.report_interval {
            config.grind.report_interval = interval;
        }
        if let Some(timeout) = self.timeout {
            config.grind.timeout_secs = timeout;
        }
    }

    fn target(&self, config: &AppConfig) -> SuffixTarget {
        SuffixTarget::normalize_with(
            self.suffix.as_deref(),
            &config.pool.default_suffix,
            config.pool.max_suffix_len,
        )
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solvanity_pool=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Configuration error")?;

    match cli.command {
        Command::Grind(args) => {
            args.apply(&mut config);
            config.validate()?;
            let keypair = grind(&config, &args.target(&config))?;
            print_keypair(&keypair, args.output.as_deref())
        }
        Command::Acquire(args) => {
            args.apply(&mut config);
            config.validate()?;
            let runtime = tokio::runtime::Runtime::new()?;
            let keypair = runtime.block_on(acquire(&config, &args.target(&config)))?;
            print_keypair(&keypair, args.output.as_deref())
        }
        Command::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(config))
        }
    }
}

/// Runs a grind in the foreground, printing progress until it ends.
fn grind(config: &AppConfig, target: &SuffixTarget) -> anyhow::Result<Keypair> {
    let coordinator = config.grind.coordinator()?;

    println!("Solana Vanity Keypair Grinder");
    println!("=============================");
    println!("Suffix:     {}", target);
    println!("Difficulty: {}", target.difficulty_description());
    println!("Workers:    {}", coordinator.workers());
    println!();

    let handle = coordinator.spawn(target.clone())?;
    ctrlc_handler(handle.cancel_token())?;

    println!("Searching... (Press Ctrl+C to stop)\n");

    for event in handle.events().iter() {
        match event {
            GrindEvent::Progress { attempts_so_far } => print_progress(&handle, attempts_so_far),
            GrindEvent::Result { attempts, .. }
            | GrindEvent::Cancelled { attempts }
            | GrindEvent::Exhausted { attempts } => {
                print_summary(&handle, attempts);
                break;
            }
        }
    }

    Ok(handle.wait()?)
}

/// Claims from the pool first; grinds only when nothing usable is pooled.
async fn acquire(config: &AppConfig, target: &SuffixTarget) -> anyhow::Result<Keypair> {
    let claimed = match PoolService::open(config).await {
        Ok(service) => service.claim(Some(target.as_str())).await.map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };

    match claimed {
        Ok(ClaimOutcome::Claimed(keypair)) => {
            info!(suffix = %target, "using pooled keypair");
            return Ok(keypair);
        }
        Ok(ClaimOutcome::NotAvailable) => info!(suffix = %target, "pool empty, grinding"),
        Err(e) => warn!(error = %e, "pool unavailable, grinding"),
    }

    let config = config.clone();
    let target = target.clone();
    tokio::task::spawn_blocking(move || grind(&config, &target))
        .await
        .context("grind task failed")?
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting solvanity v{}", env!("CARGO_PKG_VERSION"));

    let pool = PoolService::open(&config).await?;
    if !pool.is_configured() {
        warn!("Serving with the vanity pool disabled; donate and claim will return 503");
    }

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Vanity pool API listening on http://{}", addr);

    axum::serve(listener, create_router(AppState { pool }))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

fn print_keypair(keypair: &Keypair, output: Option<&Path>) -> anyhow::Result<()> {
    let secret = keypair.secret_material();

    println!("=== Vanity Keypair ===");
    println!("Public Key:");
    println!("{}", keypair.public_identifier());
    println!("\nSecret Key (JSON, importable into Solana wallets):");
    println!("{}", serde_json::to_string(secret.as_slice())?);
    println!("\nSave your secret key securely. Never share it.");

    if let Some(path) = output {
        let body = json!({
            "publicKey": keypair.public_identifier(),
            "secretKey": secret.as_slice(),
        });
        fs::write(path, serde_json::to_string_pretty(&body)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nResult written to {}", path.display());
    }

    Ok(())
}

fn print_progress(handle: &GrindHandle, attempts: u64) {
    let elapsed = handle.elapsed();
    println!(
        "[{:>4}s] Generated {} keys ({}/s)",
        elapsed.as_secs(),
        format_number(attempts),
        format_number(rate(attempts, elapsed) as u64)
    );
}

fn print_summary(handle: &GrindHandle, attempts: u64) {
    let elapsed = handle.elapsed();
    println!("\n--- Final Statistics ---");
    println!("Total keys generated: {}", format_number(attempts));
    println!("Time elapsed:         {:.2}s", elapsed.as_secs_f64());
    println!(
        "Average speed:        {}/s\n",
        format_number(rate(attempts, elapsed) as u64)
    );
}

fn rate(attempts: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        attempts as f64 / secs
    } else {
        0.0
    }
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(cancel: CancelToken) -> anyhow::Result<()> {
    let flag = cancel.flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("Error setting Ctrl-C handler")
}
