//! # Clipwatch — media-mention monitoring scheduler
//!
//! Crawls registered sources on cadence tiers, claims detected mentions for
//! analysis, and sweeps expired state.
//!
//! Usage:
//!   clipwatch                         # Start every scheduler loop
//!   clipwatch cycle 15                # Run one 15-minute tier cycle and exit
//!   clipwatch claim                   # Run one claim cycle and exit
//!   clipwatch sweep                   # Run one sweep and exit
//!   clipwatch source <id>             # Crawl one source immediately
//!   clipwatch add-profile acme        # Register a watch profile
//!   clipwatch status                  # Show due counts per tier

mod collaborators;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clipwatch_core::config::ClipwatchConfig;
use clipwatch_core::types::{Profile, Source, Tier};
use clipwatch_scheduler::{
    BackpressureGate, CrawlOrchestrator, ExpirationSweeper, FastPathRouter, MentionClaimer,
    SchedulerEngine,
};
use clipwatch_store::SqliteStore;

use collaborators::{HttpCrawlExecutor, HttpMentionAnalyzer, LogEventSink, WebhookAlertHandler};

#[derive(Parser)]
#[command(
    name = "clipwatch",
    version,
    about = "📺 Clipwatch — media-mention monitoring scheduler"
)]
struct Cli {
    /// Config file path (default: ~/.clipwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every scheduler loop (the default)
    Run,
    /// Run one crawl cycle for a tier (minutes: 5/10/15/30/60) and exit
    Cycle {
        #[arg(value_parser = parse_tier)]
        tier: Tier,
    },
    /// Run one claim cycle and exit
    Claim,
    /// Run one expiration sweep and exit
    Sweep,
    /// Crawl one source immediately, bypassing the tier guard
    Source { id: String },
    /// Register a watch profile
    AddProfile {
        name: String,
        /// Profile group to join
        #[arg(long)]
        group: Option<String>,
    },
    /// Register a source bound to a profile or a group
    AddSource {
        name: String,
        /// Bind to a single profile ID
        #[arg(long)]
        profile: Option<String>,
        /// Pool across a profile group
        #[arg(long)]
        group: Option<String>,
        /// Cadence tier in minutes (5/10/15/30/60)
        #[arg(long, default_value = "15", value_parser = parse_tier)]
        tier: Tier,
    },
    /// Show due source counts per tier
    Status,
}

fn parse_tier(s: &str) -> std::result::Result<Tier, String> {
    let minutes: i64 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    Tier::from_minutes(minutes).ok_or_else(|| format!("unknown tier {minutes}m (5/10/15/30/60)"))
}

fn build_engine(config: &ClipwatchConfig, store: Arc<SqliteStore>) -> Arc<SchedulerEngine> {
    let gate = Arc::new(BackpressureGate::new(
        config.scheduler.backoff_base_secs,
        config.scheduler.backoff_max_secs,
    ));
    let sink = Arc::new(LogEventSink);

    let crawler = CrawlOrchestrator::new(
        store.clone(),
        store.clone(),
        Arc::new(HttpCrawlExecutor::new(&config.collaborators)),
        gate,
        sink.clone(),
    );
    let fastpath = FastPathRouter::new(
        Arc::new(WebhookAlertHandler::new(&config.collaborators)),
        sink.clone(),
    );
    let claimer = MentionClaimer::new(
        store.clone(),
        store.clone(),
        Arc::new(HttpMentionAnalyzer::new(&config.collaborators)),
        fastpath,
        sink.clone(),
        config.scheduler.claim_batch_limit,
    );
    let sweeper = ExpirationSweeper::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.scheduler.pending_ttl_hours,
        config.scheduler.claim_batch_limit,
    );
    Arc::new(SchedulerEngine::new(store, crawler, claimer, sweeper, sink))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "clipwatch=debug"
    } else {
        "clipwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => ClipwatchConfig::load_from(path)?,
        None => ClipwatchConfig::load()?,
    };
    let store = Arc::new(SqliteStore::open(&config.store.path)?);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            println!("📺 Clipwatch v{}", env!("CARGO_PKG_VERSION"));
            println!("   🗄️  Database: {}", config.store.path.display());
            println!("   🕷️  Crawler:  {}", config.collaborators.crawler_url);
            println!("   🔬 Analyzer: {}", config.collaborators.analyzer_url);
            println!();
            let engine = build_engine(&config, store);
            clipwatch_scheduler::engine::run_forever(engine, config.scheduler).await;
        }
        Commands::Cycle { tier } => {
            let engine = build_engine(&config, store);
            let summary = engine.run_cycle(tier).await?;
            println!(
                "🔄 Cycle {tier}: {}/{} ok, {} failed, {} skipped, {} mentions",
                summary.successful,
                summary.total,
                summary.failed,
                summary.skipped,
                summary.mentions_found
            );
        }
        Commands::Claim => {
            let engine = build_engine(&config, store);
            let summary = engine.run_claim_cycle().await?;
            println!(
                "📋 Claim: {} groups, {} claimed, {} contended, {} accepted, {} rejected, {} failed",
                summary.groups,
                summary.claimed,
                summary.contended,
                summary.accepted,
                summary.rejected,
                summary.failed
            );
        }
        Commands::Sweep => {
            let engine = build_engine(&config, store);
            let summary = engine.run_sweep().await;
            println!(
                "🧹 Sweep: {} clips expired, {} stale mentions expired, {} errors",
                summary.clips_expired, summary.mentions_expired, summary.errors
            );
        }
        Commands::Source { id } => {
            let engine = build_engine(&config, store);
            let result = engine.run_source(&id).await?;
            println!("🕷️ Source {id}: {result:?}");
        }
        Commands::AddProfile { name, group } => {
            let profile = Profile::new(&name, group.as_deref());
            store.insert_profile(&profile)?;
            println!("✅ Profile '{}' registered: {}", profile.name, profile.id);
        }
        Commands::AddSource {
            name,
            profile,
            group,
            tier,
        } => {
            let source = match (profile, group) {
                (Some(profile_id), None) => Source::for_profile(&name, &profile_id, tier),
                (None, Some(group_id)) => Source::for_group(&name, &group_id, tier),
                _ => anyhow::bail!("pass exactly one of --profile or --group"),
            };
            store.insert_source(&source)?;
            println!("✅ Source '{}' registered on {tier}: {}", source.name, source.id);
        }
        Commands::Status => {
            use clipwatch_core::traits::SourceStore;
            let engine = build_engine(&config, store.clone());
            println!("📺 Clipwatch status");
            println!("   🗄️  Database: {}", config.store.path.display());
            let now = chrono::Utc::now();
            for tier in Tier::ALL {
                let due = store.find_due(tier, now).await?;
                println!("   ⏰ Tier {tier}: {} source(s) due", due.len());
            }
            let jobs = engine.status();
            if jobs.is_empty() {
                println!("   💤 No job has run in this process");
            } else {
                for (job, running) in jobs {
                    let state = if running { "running" } else { "idle" };
                    println!("   🔒 Job {job}: {state}");
                }
            }
        }
    }

    Ok(())
}
