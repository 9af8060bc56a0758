//! In-memory gateway for orchestrator and bot tests.

use async_trait::async_trait;
use execution_core::{
    GatewayError, LimitOrderRequest, OpenOrder, OrderGateway, OrderSide, Position,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
struct FakeState {
    prices: HashMap<String, Decimal>,
    /// Answers for successive position queries; the last one repeats.
    positions: HashMap<String, VecDeque<Option<Position>>>,
    pending: HashMap<String, Vec<OpenOrder>>,
    placed: Vec<(String, LimitOrderRequest)>,
    cancelled: Vec<(String, String)>,
    position_calls: usize,
    next_id: u64,
    reject_side: Option<OrderSide>,
    reject_cancels: bool,
}

/// Records every command and answers queries from canned data.
#[derive(Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.state.lock().prices.insert(symbol.to_string(), price);
    }

    pub fn set_position(&self, symbol: &str, open_price_avg: Decimal, total: Decimal) {
        self.queue_positions(symbol, vec![Some(position(symbol, open_price_avg, total))]);
    }

    pub fn queue_positions(&self, symbol: &str, answers: Vec<Option<Position>>) {
        self.state
            .lock()
            .positions
            .insert(symbol.to_string(), answers.into());
    }

    pub fn set_pending(&self, symbol: &str, orders: Vec<OpenOrder>) {
        self.state.lock().pending.insert(symbol.to_string(), orders);
    }

    pub fn reject_orders(&self, side: Option<OrderSide>) {
        self.state.lock().reject_side = side;
    }

    pub fn reject_cancels(&self, reject: bool) {
        self.state.lock().reject_cancels = reject;
    }

    pub fn placed(&self) -> Vec<(String, LimitOrderRequest)> {
        self.state.lock().placed.clone()
    }

    pub fn placed_for(&self, symbol: &str, side: OrderSide) -> Vec<(String, LimitOrderRequest)> {
        self.placed()
            .into_iter()
            .filter(|(_, r)| r.symbol == symbol && r.side == side)
            .collect()
    }

    pub fn cancelled(&self) -> Vec<(String, String)> {
        self.state.lock().cancelled.clone()
    }

    pub fn position_calls(&self) -> usize {
        self.state.lock().position_calls
    }
}

pub(crate) fn position(symbol: &str, open_price_avg: Decimal, total: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        hold_side: "long".to_string(),
        open_price_avg,
        total,
        available: total,
    }
}

#[async_trait]
impl OrderGateway for FakeGateway {
    async fn current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        self.state
            .lock()
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::NotFound(format!("no ticker for {}", symbol)))
    }

    async fn position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        let mut state = self.state.lock();
        state.position_calls += 1;
        let Some(answers) = state.positions.get_mut(symbol) else {
            return Ok(None);
        };
        if answers.len() > 1 {
            Ok(answers.pop_front().flatten())
        } else {
            Ok(answers.front().cloned().flatten())
        }
    }

    async fn place_limit_order(&self, request: &LimitOrderRequest) -> Result<String, GatewayError> {
        let mut state = self.state.lock();
        if state.reject_side == Some(request.side) {
            return Err(GatewayError::Rejected {
                reason: "40762: insufficient balance".into(),
            });
        }
        state.next_id += 1;
        let order_id = format!("order-{}", state.next_id);
        state.placed.push((order_id.clone(), request.clone()));
        Ok(order_id)
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if state.reject_cancels {
            return Err(GatewayError::Rejected {
                reason: "cancel refused".into(),
            });
        }
        state
            .cancelled
            .push((symbol.to_string(), order_id.to_string()));
        Ok(())
    }

    async fn pending_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, GatewayError> {
        Ok(self
            .state
            .lock()
            .pending
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }
}
