//! Multi-symbol bot: owns one orchestrator per trading process and routes
//! order updates from the streaming session to them.

use crate::config::BotConfig;
use crate::error::BotError;
use crate::orchestrator::{LadderSettings, LadderSnapshot, TradingOrchestrator, UpdateOutcome};
use connector_bitget::StreamingSession;
use dashmap::DashMap;
use execution_core::{decode_order_batch, GatewayError, OrderUpdate, SharedGateway};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct SymbolWorker {
    orchestrator: Arc<TradingOrchestrator>,
    tx: mpsc::UnboundedSender<OrderUpdate>,
}

type ActiveMap = Arc<DashMap<String, SymbolWorker>>;

/// The ladder bot.
///
/// Each symbol gets a worker task fed through its own channel, so updates for
/// one symbol are handled in arrival order while symbols progress
/// independently. A symbol whose orchestrator completes is dropped from the
/// active set and its later updates are discarded.
pub struct Bot {
    config: BotConfig,
    gateway: SharedGateway,
    session: Option<Arc<StreamingSession>>,
    active: ActiveMap,
    running: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Bot {
    /// Create a bot without a streaming session. Updates must be fed through
    /// [`Bot::dispatch_payload`].
    pub fn new(config: BotConfig, gateway: SharedGateway) -> Self {
        Self {
            config,
            gateway,
            session: None,
            active: Arc::new(DashMap::new()),
            running: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Attach the session that delivers order updates.
    pub fn with_session(mut self, session: Arc<StreamingSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start every trading process.
    ///
    /// The session is opened before any buy order goes out so no fill can be
    /// missed. A symbol that fails to initialize or gets no buy order placed
    /// is dropped; startup fails only when none remain.
    pub async fn start(&self) -> Result<(), BotError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BotError::AlreadyRunning);
        }

        if let Err(e) = self.start_processes().await {
            self.shutdown().await;
            return Err(e);
        }
        Ok(())
    }

    async fn start_processes(&self) -> Result<(), BotError> {
        for process in &self.config.trading_processes {
            let settings = LadderSettings::from_config(process, &self.config.position_settle)?;
            let orchestrator = Arc::new(TradingOrchestrator::new(
                &process.symbol,
                settings,
                self.gateway.clone(),
            ));
            self.spawn_worker(orchestrator);
        }

        if let Some(session) = &self.session {
            let active = self.active.clone();
            session.register_handler(move |payload| {
                route_payload(&active, &payload);
            });
            session.open().await?;
        }

        let orchestrators: Vec<_> = self
            .active
            .iter()
            .map(|entry| entry.orchestrator.clone())
            .collect();

        let results = join_all(
            orchestrators
                .iter()
                .map(|orchestrator| start_symbol(&self.gateway, orchestrator)),
        )
        .await;

        for (orchestrator, result) in orchestrators.iter().zip(results) {
            match result {
                Ok(placed) => info!(symbol = %orchestrator.symbol(), placed, "Trading process started"),
                Err(e) => {
                    error!(symbol = %orchestrator.symbol(), error = %e, "Trading process failed to start");
                    self.active.remove(orchestrator.symbol());
                }
            }
        }

        if self.active.is_empty() {
            return Err(BotError::Startup(
                "no trading process could be started".into(),
            ));
        }
        info!(symbols = self.active.len(), "Bot started");
        Ok(())
    }

    fn spawn_worker(&self, orchestrator: Arc<TradingOrchestrator>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let symbol = orchestrator.symbol().to_string();
        let handle = tokio::spawn(run_worker(orchestrator.clone(), rx, self.active.clone()));

        self.active.insert(symbol, SymbolWorker { orchestrator, tx });
        self.workers.lock().push(handle);
    }

    /// Close the session and wait for the symbol workers to finish. Orders
    /// on the exchange are left untouched.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping bot");
        self.shutdown().await;
        info!("Bot stopped");
    }

    async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(session) = &self.session {
            session.close().await;
        }
        self.active.clear();

        let handles = std::mem::take(&mut *self.workers.lock());
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Symbol worker ended abnormally");
            }
        }
    }

    /// Route a raw order-channel payload to the symbol workers. Returns how
    /// many updates were forwarded.
    pub fn dispatch_payload(&self, payload: &[u8]) -> usize {
        route_payload(&self.active, payload)
    }

    /// Symbols with a live orchestrator.
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.active.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn is_active(&self, symbol: &str) -> bool {
        self.active.contains_key(symbol)
    }

    pub fn orchestrator(&self, symbol: &str) -> Option<Arc<TradingOrchestrator>> {
        self.active.get(symbol).map(|e| e.orchestrator.clone())
    }

    /// State of every active symbol, sorted by symbol.
    pub async fn snapshots(&self) -> Vec<LadderSnapshot> {
        let orchestrators: Vec<_> = self.active.iter().map(|e| e.orchestrator.clone()).collect();
        let mut snapshots = join_all(orchestrators.iter().map(|o| o.snapshot())).await;
        snapshots.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        snapshots
    }
}

impl Drop for Bot {
    fn drop(&mut self) {
        self.active.clear();
    }
}

async fn start_symbol(
    gateway: &SharedGateway,
    orchestrator: &TradingOrchestrator,
) -> Result<usize, GatewayError> {
    let symbol = orchestrator.symbol();

    match gateway.pending_orders(symbol).await {
        Ok(orders) if !orders.is_empty() => warn!(
            symbol = %symbol,
            count = orders.len(),
            "Resting orders found that this bot does not track"
        ),
        Ok(_) => {}
        Err(GatewayError::InvalidSymbol(reason)) => return Err(GatewayError::InvalidSymbol(reason)),
        Err(e) => warn!(symbol = %symbol, error = %e, "Could not list resting orders"),
    }

    orchestrator.initialize().await?;
    match orchestrator.place_buy_orders().await {
        0 => Err(GatewayError::Rejected {
            reason: "no buy order could be placed".into(),
        }),
        placed => Ok(placed),
    }
}

fn route_payload(active: &DashMap<String, SymbolWorker>, payload: &[u8]) -> usize {
    let updates = match decode_order_batch(payload) {
        Ok(updates) => updates,
        Err(e) => {
            warn!(error = %e, "Undecodable order payload");
            return 0;
        }
    };

    let mut forwarded = 0;
    for update in updates {
        let Some(worker) = active.get(&update.inst_id) else {
            debug!(symbol = %update.inst_id, order_id = %update.order_id, "Update for inactive symbol");
            continue;
        };
        if worker.tx.send(update).is_ok() {
            forwarded += 1;
        }
    }
    forwarded
}

async fn run_worker(
    orchestrator: Arc<TradingOrchestrator>,
    mut rx: mpsc::UnboundedReceiver<OrderUpdate>,
    active: ActiveMap,
) {
    while let Some(update) = rx.recv().await {
        match orchestrator.on_order_update(&update).await {
            UpdateOutcome::Completed => {
                info!(symbol = %orchestrator.symbol(), "Trading process completed");
                active.remove(orchestrator.symbol());
                break;
            }
            outcome => debug!(symbol = %orchestrator.symbol(), ?outcome, "Update handled"),
        }
    }
}
