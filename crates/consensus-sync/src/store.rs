//! The view-model state store.
//!
//! Single owner of all persistent console state. One lock guards the
//! whole view model, so every mutation is atomic with respect to every
//! read: a reader can never observe trading stats from one snapshot next
//! to a status from another.
//!
//! Each producer (channel, router, poll tasks, operator commands) has its
//! own mutation entry points and touches only the slices it owns.

use chrono::{DateTime, Utc};
use consensus_core::{
    CandleSeries, DebateMessage, SessionStatus, StatusSnapshot, Symbol, Trade, TradingStats,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Default bound on the debate log. Old messages fall off the front once
/// the cap is exceeded.
pub const DEFAULT_DEBATE_LOG_CAP: usize = 1000;

/// Where a status snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusOrigin {
    /// Applied locally after a successful start/stop acknowledgment,
    /// ahead of backend confirmation.
    Optimistic,
    /// Reported by the backend itself (status poll or push frame).
    Authoritative,
}

/// Status snapshot tagged with its provenance. An authoritative arrival
/// always replaces whatever is present, so an optimistic value can never
/// outlive the next word from the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedStatus {
    pub value: StatusSnapshot,
    pub origin: StatusOrigin,
    pub received_at: DateTime<Utc>,
}

/// Atomic copy of the full view model, for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub timestamp_ms: i64,
    pub connected: bool,
    pub status: Option<TaggedStatus>,
    pub demo_mode: bool,
    pub selected_symbol: Symbol,
    pub symbols: Vec<Symbol>,
    pub debate_messages: Vec<DebateMessage>,
    pub candles: CandleSeries,
    pub trades: Vec<Trade>,
    pub portfolio: Option<TradingStats>,
}

struct ViewState {
    connected: bool,
    debate_log: VecDeque<DebateMessage>,
    debate_log_cap: usize,
    status: Option<TaggedStatus>,
    demo_mode: bool,
    selected_symbol: Symbol,
    symbols: Vec<Symbol>,
    candles: CandleSeries,
    trades: Vec<Trade>,
    portfolio: Option<TradingStats>,
}

/// The single mutable view model shared by all producers.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<ViewState>>,
}

impl StateStore {
    pub fn new(initial_symbol: Symbol, debate_log_cap: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ViewState {
                connected: false,
                debate_log: VecDeque::new(),
                debate_log_cap,
                status: None,
                demo_mode: false,
                selected_symbol: initial_symbol,
                symbols: Vec::new(),
                candles: CandleSeries::default(),
                trades: Vec::new(),
                portfolio: None,
            })),
        }
    }

    // ---- read accessors ------------------------------------------------

    pub fn connected(&self) -> bool {
        self.inner.read().connected
    }

    pub fn status(&self) -> Option<TaggedStatus> {
        self.inner.read().status.clone()
    }

    /// Current session status; `Unknown` before the first snapshot.
    pub fn session_status(&self) -> SessionStatus {
        self.inner
            .read()
            .status
            .as_ref()
            .map(|s| s.value.status)
            .unwrap_or(SessionStatus::Unknown)
    }

    pub fn demo_mode(&self) -> bool {
        self.inner.read().demo_mode
    }

    pub fn selected_symbol(&self) -> Symbol {
        self.inner.read().selected_symbol.clone()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.inner.read().symbols.clone()
    }

    pub fn debate_log(&self) -> Vec<DebateMessage> {
        self.inner.read().debate_log.iter().cloned().collect()
    }

    pub fn debate_log_len(&self) -> usize {
        self.inner.read().debate_log.len()
    }

    pub fn candles(&self) -> CandleSeries {
        self.inner.read().candles.clone()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.inner.read().trades.clone()
    }

    pub fn portfolio(&self) -> Option<TradingStats> {
        self.inner.read().portfolio.clone()
    }

    /// One consistent copy of everything, taken under a single read lock.
    pub fn view(&self) -> ViewSnapshot {
        let state = self.inner.read();
        ViewSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            connected: state.connected,
            status: state.status.clone(),
            demo_mode: state.demo_mode,
            selected_symbol: state.selected_symbol.clone(),
            symbols: state.symbols.clone(),
            debate_messages: state.debate_log.iter().cloned().collect(),
            candles: state.candles.clone(),
            trades: state.trades.clone(),
            portfolio: state.portfolio.clone(),
        }
    }

    // ---- channel-owned mutations ---------------------------------------

    pub fn set_connected(&self, connected: bool) {
        self.inner.write().connected = connected;
    }

    // ---- router-owned mutations ----------------------------------------

    /// Append one debate message. Insertion order is arrival order; the
    /// log is bounded, dropping the oldest entries past the cap.
    pub fn append_debate_message(&self, msg: DebateMessage) {
        let mut state = self.inner.write();
        state.debate_log.push_back(msg);
        while state.debate_log.len() > state.debate_log_cap {
            state.debate_log.pop_front();
        }
    }

    /// Replace the status snapshot wholesale. No field-level merge: the
    /// previous snapshot is gone entirely. The demo flag tracks the
    /// snapshot when present.
    pub fn apply_status(&self, snapshot: StatusSnapshot, origin: StatusOrigin) {
        let mut state = self.inner.write();
        state.demo_mode = snapshot.demo_mode;
        state.status = Some(TaggedStatus {
            value: snapshot,
            origin,
            received_at: Utc::now(),
        });
    }

    /// Record one trade from a push event. Skipped when a trade with the
    /// same id is already tracked.
    pub fn record_trade(&self, trade: Trade) -> bool {
        let mut state = self.inner.write();
        if state.trades.iter().any(|t| t.id == trade.id) {
            debug!(trade_id = %trade.id, "trade already tracked, skipping");
            return false;
        }
        state.trades.push(trade);
        true
    }

    // ---- poll-owned mutations ------------------------------------------

    /// Replace the candle slice, but only if `for_symbol` is still the
    /// selected symbol. This is the staleness guard: a poll response that
    /// raced a symbol switch is discarded, not applied.
    pub fn replace_candles(&self, for_symbol: &Symbol, series: CandleSeries) -> bool {
        let mut state = self.inner.write();
        if state.selected_symbol != *for_symbol {
            debug!(
                response_symbol = %for_symbol,
                selected_symbol = %state.selected_symbol,
                "discarding stale candle response"
            );
            return false;
        }
        state.candles = series;
        true
    }

    pub fn replace_trades(&self, trades: Vec<Trade>) {
        self.inner.write().trades = trades;
    }

    pub fn replace_portfolio(&self, stats: TradingStats) {
        self.inner.write().portfolio = Some(stats);
    }

    // ---- operator-owned mutations --------------------------------------

    /// Apply an optimistic status transition after a successful command
    /// acknowledgment. Only the status field flips; stats from the last
    /// authoritative snapshot are preserved. The next authoritative
    /// arrival replaces this unconditionally.
    pub fn apply_optimistic_status(&self, status: SessionStatus) {
        let mut state = self.inner.write();
        let mut value = state
            .status
            .as_ref()
            .map(|s| s.value.clone())
            .unwrap_or_default();
        value.status = status;
        state.status = Some(TaggedStatus {
            value,
            origin: StatusOrigin::Optimistic,
            received_at: Utc::now(),
        });
    }

    /// Switch the selected symbol. Returns false when it was already
    /// selected (no candle-task restart needed). The candle slice keeps
    /// its previous contents until the new symbol's poll resolves.
    pub fn select_symbol(&self, symbol: Symbol) -> bool {
        let mut state = self.inner.write();
        if state.selected_symbol == symbol {
            return false;
        }
        debug!(from = %state.selected_symbol, to = %symbol, "symbol selected");
        state.selected_symbol = symbol;
        true
    }

    pub fn set_symbols(&self, symbols: Vec<Symbol>) {
        self.inner.write().symbols = symbols;
    }

    /// Set the demo flag from a toggle acknowledgment.
    pub fn set_demo_mode(&self, demo: bool) {
        self.inner.write().demo_mode = demo;
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(
            Symbol::new("cmt_btcusdt").expect("default symbol is valid"),
            DEFAULT_DEBATE_LOG_CAP,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use consensus_core::{Candle, TradeAction, TradeSide};

    fn symbol(raw: &str) -> Symbol {
        Symbol::new(raw).unwrap()
    }

    fn message(content: &str) -> DebateMessage {
        DebateMessage {
            agent: "Bull".to_string(),
            emoji: String::new(),
            content: content.to_string(),
            confidence: None,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        }
    }

    fn series(open: f64) -> CandleSeries {
        CandleSeries {
            candles: vec![Candle {
                time: 1_700_000_000,
                open,
                high: open + 1.0,
                low: open - 1.0,
                close: open,
                volume: 1.0,
            }],
            ticker: None,
        }
    }

    fn trade(id: &str) -> Trade {
        Trade {
            id: id.to_string(),
            symbol: symbol("cmt_btcusdt"),
            side: TradeSide::Buy,
            action: TradeAction::Open,
            size: 0.01,
            price: 42000.0,
            pnl: None,
            pnl_pct: None,
            executed_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        }
    }

    #[test]
    fn test_debate_log_preserves_arrival_order() {
        let store = StateStore::default();
        for i in 0..5 {
            store.append_debate_message(message(&format!("msg-{i}")));
        }

        let log = store.debate_log();
        let contents: Vec<_> = log.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);
    }

    #[test]
    fn test_debate_log_bounded_retention() {
        let store = StateStore::new(symbol("cmt_btcusdt"), 3);
        for i in 0..5 {
            store.append_debate_message(message(&format!("msg-{i}")));
        }

        let log = store.debate_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].content, "msg-2");
        assert_eq!(log[2].content, "msg-4");
    }

    #[test]
    fn test_status_replaced_wholesale() {
        let store = StateStore::default();
        store.apply_status(
            StatusSnapshot {
                status: SessionStatus::Running,
                demo_mode: true,
                trading: Some(TradingStats::default()),
                debate: None,
            },
            StatusOrigin::Authoritative,
        );

        // A snapshot without stats wipes the previous stats: no merge.
        store.apply_status(
            StatusSnapshot {
                status: SessionStatus::Stopped,
                demo_mode: false,
                trading: None,
                debate: None,
            },
            StatusOrigin::Authoritative,
        );

        let status = store.status().unwrap();
        assert_eq!(status.value.status, SessionStatus::Stopped);
        assert!(status.value.trading.is_none());
        assert!(!store.demo_mode());
    }

    #[test]
    fn test_optimistic_status_then_authoritative_wins() {
        let store = StateStore::default();

        // Command ack: status flips immediately, tagged optimistic.
        store.apply_optimistic_status(SessionStatus::Running);
        let status = store.status().unwrap();
        assert_eq!(status.value.status, SessionStatus::Running);
        assert_eq!(status.origin, StatusOrigin::Optimistic);

        // The next authoritative poll says stopped: it wins.
        store.apply_status(
            StatusSnapshot {
                status: SessionStatus::Stopped,
                ..Default::default()
            },
            StatusOrigin::Authoritative,
        );
        let status = store.status().unwrap();
        assert_eq!(status.value.status, SessionStatus::Stopped);
        assert_eq!(status.origin, StatusOrigin::Authoritative);
    }

    #[test]
    fn test_optimistic_status_preserves_authoritative_stats() {
        let store = StateStore::default();
        store.apply_status(
            StatusSnapshot {
                status: SessionStatus::Stopped,
                trading: Some(TradingStats {
                    account_balance: 9500.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
            StatusOrigin::Authoritative,
        );

        store.apply_optimistic_status(SessionStatus::Running);

        let status = store.status().unwrap();
        assert_eq!(status.value.status, SessionStatus::Running);
        assert_eq!(status.value.trading.unwrap().account_balance, 9500.0);
    }

    #[test]
    fn test_stale_candle_response_discarded() {
        let store = StateStore::new(symbol("cmt_btcusdt"), DEFAULT_DEBATE_LOG_CAP);

        // BTC poll in flight; operator switches to ETH before it lands.
        let btc = symbol("cmt_btcusdt");
        assert!(store.select_symbol(symbol("cmt_ethusdt")));

        // The stale BTC response must not be applied.
        assert!(!store.replace_candles(&btc, series(42000.0)));
        assert!(store.candles().is_empty());

        // ETH's own poll applies normally.
        let eth = symbol("cmt_ethusdt");
        assert!(store.replace_candles(&eth, series(2200.0)));
        assert_eq!(store.candles().len(), 1);

        // A late BTC response after ETH data landed must not clobber it.
        assert!(!store.replace_candles(&btc, series(43000.0)));
        assert_eq!(store.candles().candles[0].open, 2200.0);
    }

    #[test]
    fn test_candles_kept_across_symbol_switch_until_new_poll() {
        let store = StateStore::new(symbol("cmt_btcusdt"), DEFAULT_DEBATE_LOG_CAP);
        let btc = symbol("cmt_btcusdt");
        assert!(store.replace_candles(&btc, series(42000.0)));

        store.select_symbol(symbol("cmt_ethusdt"));
        // Slice unchanged until ETH's poll resolves.
        assert_eq!(store.candles().candles[0].open, 42000.0);
    }

    #[test]
    fn test_select_same_symbol_is_noop() {
        let store = StateStore::new(symbol("cmt_btcusdt"), DEFAULT_DEBATE_LOG_CAP);
        assert!(!store.select_symbol(symbol("cmt_btcusdt")));
        assert!(store.select_symbol(symbol("cmt_ethusdt")));
    }

    #[test]
    fn test_record_trade_dedupes_by_id() {
        let store = StateStore::default();
        assert!(store.record_trade(trade("t-1")));
        assert!(!store.record_trade(trade("t-1")));
        assert!(store.record_trade(trade("t-2")));
        assert_eq!(store.trades().len(), 2);
    }

    #[test]
    fn test_trades_replaced_wholesale_by_poll() {
        let store = StateStore::default();
        store.record_trade(trade("t-1"));

        store.replace_trades(vec![trade("t-7"), trade("t-8")]);
        let trades = store.trades();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "t-7");
    }

    #[test]
    fn test_view_snapshot_is_consistent() {
        let store = StateStore::default();
        store.set_connected(true);
        store.append_debate_message(message("hello"));
        store.apply_status(
            StatusSnapshot {
                status: SessionStatus::Running,
                demo_mode: true,
                ..Default::default()
            },
            StatusOrigin::Authoritative,
        );
        store.replace_portfolio(TradingStats {
            total_trades: 3,
            ..Default::default()
        });

        let view = store.view();
        assert!(view.connected);
        assert!(view.demo_mode);
        assert_eq!(view.debate_messages.len(), 1);
        assert_eq!(view.status.unwrap().value.status, SessionStatus::Running);
        assert_eq!(view.portfolio.unwrap().total_trades, 3);
    }
}
