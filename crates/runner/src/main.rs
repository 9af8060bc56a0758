use anyhow::{Context, Result};
use auth::ApiCredentials;
use bitget_rest::BitgetRestClient;
use clap::Parser;
use common::TradingMode;
use connector_bitget::StreamingSession;
use ladder_bot::{Bot, BotConfig};
use metrics::create_metrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// How often to check whether every trading process has finished.
const COMPLETION_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Bitget futures ladder bot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the trading mode from the configuration (live or demo).
    #[arg(long)]
    mode: Option<TradingMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    common::init_logging();
    let args = Args::parse();

    let mut config = BotConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(mode) = args.mode.or_else(TradingMode::from_env) {
        config.mode = mode;
    }
    let mode = config.mode;

    info!(
        mode = %mode,
        symbols = ?config.trading_processes.iter().map(|p| p.symbol.as_str()).collect::<Vec<_>>(),
        "Starting ladder bot"
    );

    let credentials = ApiCredentials::from_env().context("reading API credentials")?;
    let gateway = Arc::new(
        BitgetRestClient::new(credentials.clone(), mode).context("building REST client")?,
    );

    let metrics = create_metrics();
    let session = Arc::new(StreamingSession::new(
        config.session.to_session_config(mode.ws_private_url()),
        credentials,
        mode,
        metrics.clone(),
    ));

    let bot = Bot::new(config, gateway).with_session(session);
    bot.start().await.context("starting bot")?;

    let mut health = tokio::time::interval(HEALTH_LOG_INTERVAL);
    let mut completion = tokio::time::interval(COMPLETION_CHECK_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!(error = %e, "Signal handler failed");
                }
                info!("Received Ctrl+C, initiating shutdown");
                break;
            }
            _ = health.tick() => {
                let snapshot = metrics.snapshot();
                info!(
                    status = %snapshot.health_status(),
                    frames = snapshot.frames_received,
                    batches = snapshot.batches_forwarded,
                    errors = snapshot.transport_errors + snapshot.parse_errors,
                    reconnects = snapshot.reconnect_successes,
                    active = ?bot.active_symbols(),
                    "Health check"
                );
            }
            _ = completion.tick() => {
                if bot.active_symbols().is_empty() {
                    info!("All trading processes completed");
                    break;
                }
            }
        }
    }

    for snapshot in bot.snapshots().await {
        info!(
            symbol = %snapshot.symbol,
            cycles = snapshot.completed_cycles,
            filled = snapshot.buy_levels.iter().filter(|l| l.filled).count(),
            sell = ?snapshot.sell_order.as_ref().map(|s| &s.order_id),
            "Final ladder state"
        );
    }

    bot.stop().await;

    println!("\n{}", metrics.snapshot());
    info!("Shutdown complete");
    Ok(())
}
