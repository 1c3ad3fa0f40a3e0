//! Core domain types for the Consensus operator console.
//!
//! This crate provides the data model shared by every other crate:
//! - `DebateMessage`: one entry of the committee's decision narration
//! - `StatusSnapshot`, `TradingStats`, `DebateStats`: backend status
//! - `Candle`, `Ticker`, `CandleSeries`: price chart data
//! - `Trade`: one executed trade
//! - `Symbol`: instrument identifier selected by the operator

pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{
    Candle, CandleSeries, DebateMessage, DebateStats, SessionStatus, StatusSnapshot, Symbol,
    Ticker, Trade, TradeAction, TradeSide, TradingStats,
};
