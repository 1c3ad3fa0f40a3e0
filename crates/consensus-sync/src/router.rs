//! Push frame router.
//!
//! Classifies inbound frames by their `type` discriminator and applies
//! them to the store, strictly in arrival order. Routing is synchronous;
//! frames are never reordered or batched. Unrecognized types are counted
//! and ignored so newer backends cannot break older consoles.

use crate::store::{StateStore, StatusOrigin};
use consensus_channel::PushFrame;
use consensus_notify::{DebateDecision, NotificationPolicy};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Routes typed push frames into the state store and notification policy.
pub struct EventRouter {
    store: StateStore,
    policy: NotificationPolicy,
    /// Agent whose closing message constitutes the committee decision.
    arbiter_agent: String,
    unknown_frames: AtomicU64,
}

impl EventRouter {
    pub fn new(store: StateStore, policy: NotificationPolicy, arbiter_agent: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            arbiter_agent: arbiter_agent.into(),
            unknown_frames: AtomicU64::new(0),
        }
    }

    /// Route one frame. Never fails: every frame either mutates exactly
    /// the slices its type owns or is ignored.
    pub fn route(&self, frame: PushFrame) {
        match frame {
            PushFrame::DebateMessage(msg) => {
                if let Some(decision) = DebateDecision::from_message(&msg, &self.arbiter_agent) {
                    self.policy.on_debate_decision(&decision);
                }
                self.store.append_debate_message(msg);
            }
            PushFrame::StatusUpdate(snapshot) => {
                self.store.apply_status(snapshot, StatusOrigin::Authoritative);
            }
            PushFrame::TradeExecuted(trade) => {
                self.policy.on_trade_executed(&trade);
                self.store.record_trade(trade);
            }
            PushFrame::Unknown => {
                self.unknown_frames.fetch_add(1, Ordering::Relaxed);
                debug!("ignoring unrecognized frame type");
            }
        }
    }

    /// Number of frames ignored for carrying an unrecognized type.
    pub fn unknown_frame_count(&self) -> u64 {
        self.unknown_frames.load(Ordering::Relaxed)
    }
}
