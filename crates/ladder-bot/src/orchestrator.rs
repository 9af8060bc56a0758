//! Per-symbol buy ladder and sell pairing.

use crate::config::{PositionSettleConfig, PriceRule, SellFillPolicy, TradingProcessConfig};
use crate::error::ConfigError;
use crate::pricing::{order_size, price_above, price_below, round_price};
use execution_core::{
    GatewayError, LimitOrderRequest, OrderStatus, OrderUpdate, Position, SharedGateway,
};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// One configured buy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyLevel {
    /// Limit price, resolved once when the ladder is built.
    pub target_price: Decimal,
    /// Quote-currency amount to spend.
    pub amount: Decimal,
    /// Exchange order ID, set once the order is placed.
    pub order_id: Option<String>,
    /// Set once the fill has been answered with a sell order. A failed
    /// attempt leaves it unset so a redelivered fill can retry.
    pub filled: bool,
}

impl BuyLevel {
    fn new(target_price: Decimal, amount: Decimal) -> Self {
        Self {
            target_price,
            amount,
            order_id: None,
            filled: false,
        }
    }

    /// Record the exchange order ID. An ID is never replaced.
    fn assign_order_id(&mut self, order_id: String) -> bool {
        if self.order_id.is_some() {
            return false;
        }
        self.order_id = Some(order_id);
        true
    }
}

/// The open take-profit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellOrder {
    pub order_id: String,
    pub price: Decimal,
    pub size: Decimal,
}

/// What `on_order_update` did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The order ID belongs to neither a buy level nor the sell order.
    Unknown,
    /// Known order, but nothing to do (non-fill status or repeated fill).
    Ignored,
    /// A buy fill produced a new sell order.
    SellPlaced { order_id: String },
    /// A buy fill could not be turned into a sell order.
    SellFailed,
    /// A fresh ladder was placed after the sell order filled.
    Restarted { cycle: u32 },
    /// The symbol is done; the orchestrator should be removed.
    Completed,
}

/// Point-in-time copy of an orchestrator's state.
#[derive(Debug, Clone)]
pub struct LadderSnapshot {
    pub symbol: String,
    pub buy_levels: Vec<BuyLevel>,
    pub sell_order: Option<SellOrder>,
    pub completed_cycles: u32,
}

/// Settings shared by every ladder of one symbol.
#[derive(Debug, Clone)]
pub struct LadderSettings {
    pub sell_target_percent: Decimal,
    pub price_precision: u32,
    pub size_precision: u32,
    pub policy: SellFillPolicy,
    pub buy_orders: Vec<(PriceRule, Decimal)>,
    pub settle_initial_delay: Duration,
    pub settle_poll_interval: Duration,
    pub settle_max_attempts: u32,
}

impl LadderSettings {
    pub fn from_config(
        process: &TradingProcessConfig,
        settle: &PositionSettleConfig,
    ) -> Result<Self, ConfigError> {
        let buy_orders = process
            .buy_orders
            .iter()
            .map(|order| Ok((order.price_rule()?, order.order_amount)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            sell_target_percent: process.sell_target_percent,
            price_precision: process.price_precision,
            size_precision: process.size_precision,
            policy: process.on_sell_fill,
            buy_orders,
            settle_initial_delay: settle.initial_delay(),
            settle_poll_interval: settle.poll_interval(),
            settle_max_attempts: settle.max_attempts.max(1),
        })
    }
}

#[derive(Debug, Default)]
struct LadderState {
    buy_levels: Vec<BuyLevel>,
    sell_order: Option<SellOrder>,
    completed_cycles: u32,
}

/// Drives one symbol: places the buy ladder, answers buy fills with a sell
/// order sized from the exchange position, and ends (or restarts) the cycle
/// when that sell fills.
///
/// All event handling runs under one lock, so two fills for the same symbol
/// never race to place sells.
pub struct TradingOrchestrator {
    symbol: String,
    settings: LadderSettings,
    gateway: SharedGateway,
    state: Mutex<LadderState>,
}

impl TradingOrchestrator {
    pub fn new(symbol: impl Into<String>, settings: LadderSettings, gateway: SharedGateway) -> Self {
        Self {
            symbol: symbol.into(),
            settings,
            gateway,
            state: Mutex::new(LadderState::default()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Resolve the buy ladder prices. Percentage levels use the market price
    /// at this moment and keep it afterwards.
    pub async fn initialize(&self) -> Result<(), GatewayError> {
        let levels = self.resolve_ladder().await?;
        let mut state = self.state.lock().await;
        state.buy_levels = levels;
        Ok(())
    }

    /// Place every buy level that has no order yet. Returns how many were
    /// placed.
    pub async fn place_buy_orders(&self) -> usize {
        let mut state = self.state.lock().await;
        self.place_pending_buys(&mut state).await
    }

    /// Handle one order update for this symbol.
    pub async fn on_order_update(&self, update: &OrderUpdate) -> UpdateOutcome {
        let mut state = self.state.lock().await;

        let is_sell = state
            .sell_order
            .as_ref()
            .is_some_and(|sell| sell.order_id == update.order_id);
        let buy_index = state
            .buy_levels
            .iter()
            .position(|level| level.order_id.as_deref() == Some(update.order_id.as_str()));

        if !is_sell && buy_index.is_none() {
            warn!(
                symbol = %self.symbol,
                order_id = %update.order_id,
                status = ?update.status,
                "Discarding update for unknown order"
            );
            return UpdateOutcome::Unknown;
        }

        match buy_index {
            Some(index) if update.is_buy_fill() => {
                return self.on_buy_filled(&mut state, index, update).await;
            }
            None if update.is_sell_fill() => return self.on_sell_filled(&mut state, update).await,
            _ => {}
        }

        if update.status == OrderStatus::Filled {
            warn!(
                symbol = %self.symbol,
                order_id = %update.order_id,
                side = %update.side,
                "Fill side does not match the tracked order, ignoring"
            );
        } else {
            info!(
                symbol = %self.symbol,
                order_id = %update.order_id,
                side = %update.side,
                status = ?update.status,
                "Order update"
            );
        }
        UpdateOutcome::Ignored
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> LadderSnapshot {
        let state = self.state.lock().await;
        LadderSnapshot {
            symbol: self.symbol.clone(),
            buy_levels: state.buy_levels.clone(),
            sell_order: state.sell_order.clone(),
            completed_cycles: state.completed_cycles,
        }
    }

    async fn resolve_ladder(&self) -> Result<Vec<BuyLevel>, GatewayError> {
        let needs_market = self
            .settings
            .buy_orders
            .iter()
            .any(|(rule, _)| matches!(rule, PriceRule::BelowMarket { .. }));

        let market = if needs_market {
            let price = self.gateway.current_price(&self.symbol).await?;
            info!(symbol = %self.symbol, price = %price, "Market price for ladder");
            Some(price)
        } else {
            None
        };

        let levels = self
            .settings
            .buy_orders
            .iter()
            .map(|(rule, amount)| {
                let raw = match (rule, market) {
                    (PriceRule::Fixed(price), _) => *price,
                    (PriceRule::BelowMarket { percent }, Some(market)) => {
                        price_below(market, *percent)
                    }
                    (PriceRule::BelowMarket { .. }, None) => Decimal::ZERO,
                };
                BuyLevel::new(round_price(raw, self.settings.price_precision), *amount)
            })
            .collect();

        Ok(levels)
    }

    async fn place_pending_buys(&self, state: &mut LadderState) -> usize {
        let mut placed = 0;

        for level in state.buy_levels.iter_mut() {
            if level.order_id.is_some() {
                continue;
            }

            let Some(size) = order_size(level.amount, level.target_price, self.settings.size_precision)
            else {
                error!(
                    symbol = %self.symbol,
                    price = %level.target_price,
                    amount = %level.amount,
                    "Buy level rounds to zero size, skipping"
                );
                continue;
            };

            let request = LimitOrderRequest::buy(&self.symbol, level.target_price, size);
            match self.gateway.place_limit_order(&request).await {
                Ok(order_id) => {
                    info!(
                        symbol = %self.symbol,
                        order_id = %order_id,
                        price = %level.target_price,
                        size = %size,
                        "Buy order placed"
                    );
                    if level.assign_order_id(order_id) {
                        placed += 1;
                    }
                }
                Err(e) => {
                    error!(
                        symbol = %self.symbol,
                        price = %level.target_price,
                        error = %e,
                        "Failed to place buy order"
                    );
                }
            }
        }

        placed
    }

    async fn on_buy_filled(
        &self,
        state: &mut LadderState,
        index: usize,
        update: &OrderUpdate,
    ) -> UpdateOutcome {
        if state.buy_levels[index].filled {
            debug!(symbol = %self.symbol, order_id = %update.order_id, "Repeated buy fill");
            return UpdateOutcome::Ignored;
        }

        info!(
            symbol = %self.symbol,
            order_id = %update.order_id,
            price_avg = %update.price_avg,
            size = %update.filled_size,
            "Buy order filled"
        );

        let position = match self.await_position().await {
            Ok(position) => position,
            Err(e) => {
                error!(symbol = %self.symbol, error = %e, "No position after buy fill, sell not placed");
                return UpdateOutcome::SellFailed;
            }
        };

        if let Some(existing) = state.sell_order.as_ref() {
            if let Err(e) = self.gateway.cancel_order(&self.symbol, &existing.order_id).await {
                error!(
                    symbol = %self.symbol,
                    order_id = %existing.order_id,
                    error = %e,
                    "Failed to cancel previous sell order, keeping it"
                );
                return UpdateOutcome::SellFailed;
            }
            info!(symbol = %self.symbol, order_id = %existing.order_id, "Previous sell order canceled");
            state.sell_order = None;
        }

        let price = round_price(
            price_above(position.open_price_avg, self.settings.sell_target_percent),
            self.settings.price_precision,
        );
        let request = LimitOrderRequest::sell(&self.symbol, price, position.total);

        match self.gateway.place_limit_order(&request).await {
            Ok(order_id) => {
                info!(
                    symbol = %self.symbol,
                    order_id = %order_id,
                    price = %price,
                    size = %position.total,
                    entry = %position.open_price_avg,
                    "Sell order placed"
                );
                state.buy_levels[index].filled = true;
                state.sell_order = Some(SellOrder {
                    order_id: order_id.clone(),
                    price,
                    size: position.total,
                });
                UpdateOutcome::SellPlaced { order_id }
            }
            Err(e) => {
                error!(
                    symbol = %self.symbol,
                    price = %price,
                    size = %position.total,
                    error = %e,
                    "Failed to place sell order"
                );
                UpdateOutcome::SellFailed
            }
        }
    }

    /// Wait for the exchange position to show the fill, polling a bounded
    /// number of times.
    async fn await_position(&self) -> Result<Position, GatewayError> {
        tokio::time::sleep(self.settings.settle_initial_delay).await;

        let attempts = self.settings.settle_max_attempts;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.gateway.position(&self.symbol).await {
                Ok(Some(position)) if !position.is_flat() => return Ok(position),
                Ok(_) => debug!(symbol = %self.symbol, attempt, "Position not reflected yet"),
                Err(e) => {
                    warn!(symbol = %self.symbol, attempt, error = %e, "Position query failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.settle_poll_interval).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GatewayError::NotFound(format!(
                "no open position for {} after {} attempts",
                self.symbol, attempts
            ))
        }))
    }

    async fn on_sell_filled(&self, state: &mut LadderState, update: &OrderUpdate) -> UpdateOutcome {
        let sold = state.sell_order.take();
        state.completed_cycles += 1;

        info!(
            symbol = %self.symbol,
            order_id = %update.order_id,
            price = ?sold.as_ref().map(|s| s.price),
            size = ?sold.as_ref().map(|s| s.size),
            cycle = state.completed_cycles,
            "Sell order filled"
        );

        let max_cycles = match self.settings.policy {
            SellFillPolicy::Terminate => return UpdateOutcome::Completed,
            SellFillPolicy::RestartLadder { max_cycles } => max_cycles,
        };
        if state.completed_cycles >= max_cycles {
            info!(symbol = %self.symbol, cycles = state.completed_cycles, "Cycle limit reached");
            return UpdateOutcome::Completed;
        }

        for level in state.buy_levels.iter().filter(|level| !level.filled) {
            let Some(order_id) = level.order_id.as_deref() else {
                continue;
            };
            if let Err(e) = self.gateway.cancel_order(&self.symbol, order_id).await {
                warn!(symbol = %self.symbol, order_id = %order_id, error = %e, "Failed to cancel stale buy order");
            }
        }

        match self.resolve_ladder().await {
            Ok(levels) => state.buy_levels = levels,
            Err(e) => {
                error!(symbol = %self.symbol, error = %e, "Cannot rebuild ladder, stopping symbol");
                return UpdateOutcome::Completed;
            }
        }

        let placed = self.place_pending_buys(state).await;
        info!(
            symbol = %self.symbol,
            cycle = state.completed_cycles + 1,
            placed,
            "Ladder restarted"
        );
        UpdateOutcome::Restarted {
            cycle: state.completed_cycles + 1,
        }
    }
}

impl std::fmt::Debug for TradingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingOrchestrator")
            .field("symbol", &self.symbol)
            .field("policy", &self.settings.policy)
            .finish()
    }
}
