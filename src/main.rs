//! # reelgate — code-indexed media catalog bot with scheduled broadcasts
//!
//! Serves catalog entries by numeric code behind a channel-subscription
//! gate, and gives the operator a console for catalog, copy, and durable
//! scheduled broadcasts that survive restarts.
//!
//! Usage:
//!   reelgate                         # run with ~/.reelgate/config.toml
//!   reelgate --config ./dev.toml     # explicit config file
//!   reelgate --init-config           # write a default config and exit

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelgate_bot::BotRuntime;
use reelgate_core::{ReferenceClock, ReelgateConfig};
use reelgate_gateway::TelegramGateway;
use reelgate_scheduler::{BroadcastSupervisor, Console, FanoutEngine};
use reelgate_store::{CatalogStore, ChannelStore, Database, JobStore, TextStore, UserStore};

#[derive(Parser)]
#[command(name = "reelgate", version, about = "🎬 reelgate — catalog bot with scheduled broadcasts")]
struct Cli {
    /// Config file path (default: ~/.reelgate/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path override
    #[arg(long)]
    db: Option<String>,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "reelgate=debug" } else { "reelgate=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    if cli.init_config {
        ReelgateConfig::default().save()?;
        println!("wrote {}", ReelgateConfig::default_path().display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => ReelgateConfig::load_from(Path::new(&expand_path(path)))?,
        None => ReelgateConfig::load()?,
    };
    if config.bot_token.is_empty() {
        anyhow::bail!(
            "bot_token is not set — edit {} (see --init-config)",
            ReelgateConfig::default_path().display()
        );
    }
    if config.operator_chat_id == 0 {
        tracing::warn!("operator_chat_id is not set; admin commands and notices are disabled");
    }

    let db_path = expand_path(cli.db.as_deref().unwrap_or(&config.db_path));
    let db = Database::open(&db_path)?;
    tracing::info!("database ready at {}", db_path.display());

    let gateway = Arc::new(TelegramGateway::new(&config.bot_token, config.poll_timeout_secs));
    match gateway.get_me().await {
        Ok(me) => tracing::info!("authorized as @{}", me.username.as_deref().unwrap_or("unknown")),
        Err(e) => tracing::warn!("getMe failed (bad token or no network?): {e}"),
    }

    let clock = ReferenceClock::new(config.utc_offset_hours);
    let users = UserStore::new(db.clone());
    let jobs = JobStore::new(db.clone());

    let fanout = FanoutEngine::new(gateway.clone(), users.clone(), config.fanout_pace_ms);
    let supervisor = BroadcastSupervisor::new(
        jobs.clone(),
        fanout.clone(),
        clock,
        gateway.clone(),
        config.operator_chat_id,
    );
    // Startup recovery: the pending rows are the durable schedule; anything
    // already due fires in this pass.
    supervisor.restart_all();

    let console = Console::new(jobs, supervisor, fanout);

    let bot = Arc::new(BotRuntime {
        gateway,
        users,
        catalog: CatalogStore::new(db.clone()),
        channels: ChannelStore::new(db.clone()),
        texts: TextStore::new(db),
        console,
        clock,
        operator_chat_id: config.operator_chat_id,
    });
    bot.run().await?;
    Ok(())
}
