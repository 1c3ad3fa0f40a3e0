//! Push frame types.
//!
//! Frames are a discriminated union keyed by a `type` field. Types this
//! console does not recognize deserialize to `Unknown` and are ignored
//! downstream; only structurally invalid input is treated as malformed.

use crate::error::{ChannelError, ChannelResult};
use consensus_core::{DebateMessage, StatusSnapshot, Trade};
use serde::Deserialize;

/// One inbound frame from the push channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushFrame {
    /// One debate narration entry; appended to the debate log.
    DebateMessage(DebateMessage),
    /// Full status snapshot; replaces the previous one wholesale.
    StatusUpdate(StatusSnapshot),
    /// A trade was executed; notified and recorded.
    TradeExecuted(Trade),
    /// Any frame type introduced after this console was built.
    #[serde(other)]
    Unknown,
}

impl PushFrame {
    /// Frame kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DebateMessage(_) => "debate_message",
            Self::StatusUpdate(_) => "status_update",
            Self::TradeExecuted(_) => "trade_executed",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a raw text frame.
///
/// A frame that is not valid JSON, or whose recognized `type` carries a
/// payload that does not match its schema, is malformed. Malformed frames
/// are dropped by the caller; they never tear down the channel.
pub fn parse_frame(text: &str) -> ChannelResult<PushFrame> {
    serde_json::from_str(text).map_err(|e| ChannelError::MalformedFrame(e.to_string()))
}
