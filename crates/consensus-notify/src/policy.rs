//! Notification policy.
//!
//! Maps domain events onto gateway calls. Dedupe key scheme:
//! - trade events: `trade-{id}`, at most one notification per trade id
//!   no matter how often the event is redelivered
//! - debate decisions: constant `debate-decision`, newer supersedes older
//! - generic alerts: constant `alert`

use crate::gateway::{Notification, NotificationCategory, NotificationGateway};
use consensus_core::{DebateMessage, Trade};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Severity of a generic alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl AlertSeverity {
    fn glyph(self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// The committee's final verdict, extracted from the arbiter's closing
/// debate message. There is no dedicated decision frame on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct DebateDecision {
    /// Verdict line, e.g. "APPROVED" or "REJECTED".
    pub action: String,
    /// Arbiter confidence in [0, 1].
    pub confidence: f64,
}

impl DebateDecision {
    /// Extract a decision from a debate message.
    ///
    /// Only messages authored by the arbiter agent that state a
    /// confidence count as decisions. The verdict is the message's first
    /// line with markdown emphasis stripped.
    pub fn from_message(msg: &DebateMessage, arbiter_agent: &str) -> Option<Self> {
        if msg.agent != arbiter_agent {
            return None;
        }
        let confidence = msg.confidence?;

        let action = msg
            .content
            .lines()
            .next()?
            .replace('*', "")
            .trim()
            .to_string();
        if action.is_empty() {
            return None;
        }

        Some(Self { action, confidence })
    }
}

/// Maps StateStore transitions onto notification gateway calls.
#[derive(Clone)]
pub struct NotificationPolicy {
    gateway: Arc<NotificationGateway>,
    /// Trade ids already notified. Kept beyond the display window so a
    /// redelivered event never produces a second notification.
    seen_trades: Arc<Mutex<HashSet<String>>>,
}

impl NotificationPolicy {
    pub fn new(gateway: Arc<NotificationGateway>) -> Self {
        Self {
            gateway,
            seen_trades: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// A trade was executed.
    pub fn on_trade_executed(&self, trade: &Trade) {
        if !self.seen_trades.lock().insert(trade.id.clone()) {
            debug!(trade_id = %trade.id, "duplicate trade event, notification suppressed");
            return;
        }

        let title = format!("Trade Executed: {}", trade.symbol.display_name());
        let mut body = format!("{} {} @ ${:.2}", trade.action, trade.side, trade.price);
        match trade.pnl {
            Some(pnl) if pnl >= 0.0 => body.push_str(&format!("\n✅ Profit: +{pnl:.2}")),
            Some(pnl) => body.push_str(&format!("\n❌ Loss: {pnl:.2}")),
            None => {}
        }

        self.gateway.show(Notification {
            category: NotificationCategory::Trade,
            title,
            body,
            dedupe_key: format!("trade-{}", trade.id),
        });
    }

    /// The committee reached a decision.
    pub fn on_debate_decision(&self, decision: &DebateDecision) {
        let body = format!(
            "Action: {}\nConfidence: {:.0}%",
            decision.action,
            decision.confidence * 100.0
        );

        self.gateway.show(Notification {
            category: NotificationCategory::Decision,
            title: "🏛️ Committee Decision".to_string(),
            body,
            dedupe_key: "debate-decision".to_string(),
        });
    }

    /// A generic operator alert.
    pub fn on_alert(&self, message: &str, severity: AlertSeverity) {
        self.gateway.show(Notification {
            category: NotificationCategory::Alert,
            title: format!("{} Alert", severity.glyph()),
            body: message.to_string(),
            dedupe_key: "alert".to_string(),
        });
    }
}
