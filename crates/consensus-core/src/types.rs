//! Domain types for the operator console view model.
//!
//! All wire-facing types mirror the backend's JSON exactly: numbers are
//! plain floats, timestamps are epoch milliseconds (epoch seconds for
//! candle open times), and absent numeric fields default to zero.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instrument identifier selected by the operator (e.g. "cmt_btcusdt").
///
/// Opaque to the engine; it only flows through poll requests and the
/// staleness guard. The display form strips the exchange prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, rejecting empty identifiers.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidSymbol("empty symbol".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable form: "cmt_ethusdt" -> "ETHUSDT".
    pub fn display_name(&self) -> String {
        self.0.trim_start_matches("cmt_").to_uppercase()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the committee's debate narration.
///
/// Append-only: messages are never mutated after arrival and their order
/// in the log is exactly their arrival order on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateMessage {
    /// Authoring agent (e.g. "Bull", "Bear", "Risk Manager").
    pub agent: String,
    /// Agent avatar glyph.
    #[serde(default)]
    pub emoji: String,
    /// Narration body. The wire field is named "message".
    #[serde(rename = "message")]
    pub content: String,
    /// Agent confidence in [0, 1], when the agent states one.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Backend timestamp (epoch milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Trading session status reported by the backend.
///
/// Unrecognized wire values deserialize to `Unknown` so newer backends
/// cannot break older consoles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Stopped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Backend status snapshot. Always replaced wholesale, never field-merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default)]
    pub trading: Option<TradingStats>,
    #[serde(default)]
    pub debate: Option<DebateStats>,
}

impl StatusSnapshot {
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }
}

/// Account-level trading statistics. Absent fields default to zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradingStats {
    #[serde(default)]
    pub account_balance: f64,
    #[serde(default)]
    pub total_pnl: f64,
    /// Win rate in percent (0-100).
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub winning_trades: u64,
    #[serde(default)]
    pub open_positions: u64,
    #[serde(default)]
    pub total_exposure_pct: f64,
}

/// Debate engine statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DebateStats {
    #[serde(default)]
    pub total_debates: u64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub messages_count: u64,
    #[serde(default)]
    pub is_running: bool,
}

/// One OHLCV candle. `time` is the candle open in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Check the OHLC invariant: low <= min(open, close) and
    /// high >= max(open, close).
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// Latest-price ticker delivered alongside a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(default)]
    pub last_price: f64,
    #[serde(default)]
    pub change_pct_24h: f64,
}

/// A full candle series plus its ticker, replaced wholesale on each
/// successful poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandleSeries {
    #[serde(default)]
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub ticker: Option<Ticker>,
}

impl CandleSeries {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Check that open times are monotonically non-decreasing.
    pub fn is_time_ordered(&self) -> bool {
        self.candles.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

/// Order direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether a trade opened or closed a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Open,
    Close,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Close => write!(f, "CLOSE"),
        }
    }
}

/// One executed trade. `pnl` is None while the position is still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: Symbol,
    pub side: TradeSide,
    pub action: TradeAction,
    pub size: f64,
    pub price: f64,
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub pnl_pct: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// The position behind this trade has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.pnl.is_none()
    }

    pub fn is_win(&self) -> bool {
        self.pnl.is_some_and(|pnl| pnl > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_display_name() {
        let symbol = Symbol::new("cmt_ethusdt").unwrap();
        assert_eq!(symbol.display_name(), "ETHUSDT");

        let bare = Symbol::new("BTCUSD").unwrap();
        assert_eq!(bare.display_name(), "BTCUSD");
    }

    #[test]
    fn test_symbol_rejects_empty() {
        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("   ").is_err());
    }

    #[test]
    fn test_debate_message_wire_format() {
        let json = r#"{
            "agent": "Risk",
            "emoji": "!",
            "message": "- Reduce exposure",
            "confidence": 0.82,
            "timestamp": 1700000000000
        }"#;

        let msg: DebateMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.agent, "Risk");
        assert!(msg.content.starts_with("- Reduce exposure"));
        assert_eq!(msg.confidence, Some(0.82));
        assert_eq!(msg.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_session_status_unknown_fallback() {
        let status: SessionStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(status, SessionStatus::Running);

        // Values this console does not know must not fail to parse.
        let status: SessionStatus = serde_json::from_str(r#""paused""#).unwrap();
        assert_eq!(status, SessionStatus::Unknown);
    }

    #[test]
    fn test_status_snapshot_defaults() {
        let snapshot: StatusSnapshot = serde_json::from_str(r#"{"status":"stopped"}"#).unwrap();
        assert_eq!(snapshot.status, SessionStatus::Stopped);
        assert!(!snapshot.demo_mode);
        assert!(snapshot.trading.is_none());
        assert!(snapshot.debate.is_none());
    }

    #[test]
    fn test_trading_stats_absent_fields_zero() {
        let stats: TradingStats = serde_json::from_str(r#"{"account_balance": 9500.0}"#).unwrap();
        assert_eq!(stats.account_balance, 9500.0);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn test_candle_well_formed() {
        let good = Candle {
            time: 1_700_000_000,
            open: 100.0,
            high: 105.0,
            low: 99.0,
            close: 104.0,
            volume: 12.0,
        };
        assert!(good.is_well_formed());

        let bad = Candle {
            high: 103.0, // below close
            ..good
        };
        assert!(!bad.is_well_formed());
    }

    #[test]
    fn test_candle_series_time_order() {
        let candle = |time| Candle {
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0.0,
        };

        let ordered = CandleSeries {
            candles: vec![candle(1), candle(2), candle(2), candle(3)],
            ticker: None,
        };
        assert!(ordered.is_time_ordered());

        let unordered = CandleSeries {
            candles: vec![candle(2), candle(1)],
            ticker: None,
        };
        assert!(!unordered.is_time_ordered());
    }

    #[test]
    fn test_trade_open_and_win() {
        let json = r#"{
            "id": "t-1",
            "symbol": "cmt_btcusdt",
            "side": "BUY",
            "action": "OPEN",
            "size": 0.01,
            "price": 42000.0,
            "pnl": null,
            "pnl_pct": null,
            "executed_at": 1700000000000
        }"#;

        let trade: Trade = serde_json::from_str(json).unwrap();
        assert!(trade.is_open());
        assert!(!trade.is_win());
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.action, TradeAction::Open);

        let closed = Trade {
            pnl: Some(12.5),
            pnl_pct: Some(1.3),
            ..trade
        };
        assert!(!closed.is_open());
        assert!(closed.is_win());
    }
}
