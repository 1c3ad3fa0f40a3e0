//! Notification gateway.
//!
//! Owns the platform seam (`NotifySink`), the permission state, and the
//! set of currently visible notifications. Constructed once by the
//! composition root and shared by reference; there is no global instance.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default display window before a notification self-dismisses.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(5);

/// Notification category, used for per-category deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Trade,
    Decision,
    Alert,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trade => write!(f, "trade"),
            Self::Decision => write!(f, "decision"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

/// One notification to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    /// Notifications sharing a dedupe key supersede each other instead
    /// of stacking.
    pub dedupe_key: String,
}

/// Record of a currently visible notification. Ephemeral: dropped when
/// the display window elapses or a newer notification supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub category: NotificationCategory,
    pub dedupe_key: String,
}

/// Platform notification capability.
///
/// The production sink logs through `tracing`; tests inject a mock.
#[cfg_attr(test, mockall::automock)]
pub trait NotifySink: Send + Sync {
    /// Ask the platform for permission to show notifications.
    fn request_permission(&self) -> bool;
    /// Present a notification.
    fn deliver(&self, notification: &Notification);
    /// Dismiss the notification with the given dedupe key, if visible.
    fn retract(&self, dedupe_key: &str);
}

/// Sink that renders notifications into the structured log. The console
/// is a terminal process; the log stream is its notification surface.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotifySink for TracingSink {
    fn request_permission(&self) -> bool {
        true
    }

    fn deliver(&self, notification: &Notification) {
        info!(
            category = %notification.category,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
    }

    fn retract(&self, dedupe_key: &str) {
        debug!(dedupe_key, "notification dismissed");
    }
}

/// Permission state of the notification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked. Notifications are suppressed.
    Unrequested,
    Granted,
    /// Asked and refused. Notifications stay suppressed; the platform is
    /// not asked again.
    Denied,
}

struct ActiveEntry {
    record: NotificationRecord,
    seq: u64,
}

/// Permission-gated notification gateway.
pub struct NotificationGateway {
    sink: Arc<dyn NotifySink>,
    permission: RwLock<Permission>,
    active: Arc<Mutex<HashMap<String, ActiveEntry>>>,
    display_window: Duration,
    seq: AtomicU64,
}

impl NotificationGateway {
    pub fn new(sink: Arc<dyn NotifySink>, display_window: Duration) -> Self {
        Self {
            sink,
            permission: RwLock::new(Permission::Unrequested),
            active: Arc::new(Mutex::new(HashMap::new())),
            display_window,
            seq: AtomicU64::new(0),
        }
    }

    /// Ask the platform for permission. The platform is consulted at most
    /// once; later calls return the remembered outcome.
    pub fn request_permission(&self) -> bool {
        let current = *self.permission.read();
        if current != Permission::Unrequested {
            return current == Permission::Granted;
        }

        let granted = self.sink.request_permission();
        *self.permission.write() = if granted {
            Permission::Granted
        } else {
            Permission::Denied
        };
        info!(granted, "notification permission requested");
        granted
    }

    pub fn permission(&self) -> Permission {
        *self.permission.read()
    }

    /// Show a notification. Returns whether it was actually presented.
    ///
    /// Without granted permission this is a silent no-op. A visible
    /// notification with the same dedupe key is superseded, and the new
    /// one self-dismisses once the display window elapses.
    ///
    /// Must be called from within a tokio runtime (the dismiss timer is a
    /// spawned task).
    pub fn show(&self, notification: Notification) -> bool {
        if *self.permission.read() != Permission::Granted {
            debug!(
                dedupe_key = %notification.dedupe_key,
                "notification suppressed, permission not granted"
            );
            return false;
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = notification.dedupe_key.clone();

        let superseded = {
            let mut active = self.active.lock();
            let superseded = active.contains_key(&key);
            active.insert(
                key.clone(),
                ActiveEntry {
                    record: NotificationRecord {
                        category: notification.category,
                        dedupe_key: key.clone(),
                    },
                    seq,
                },
            );
            superseded
        };

        if superseded {
            self.sink.retract(&key);
        }
        self.sink.deliver(&notification);

        // Self-dismiss after the display window, unless a newer
        // notification took over the key in the meantime.
        let active = self.active.clone();
        let sink = self.sink.clone();
        let window = self.display_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let expired = {
                let mut guard = active.lock();
                match guard.get(&key) {
                    Some(entry) if entry.seq == seq => {
                        guard.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if expired {
                sink.retract(&key);
            }
        });

        true
    }

    /// Number of currently visible notifications.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Record of the visible notification under `dedupe_key`, if any.
    pub fn active_record(&self, dedupe_key: &str) -> Option<NotificationRecord> {
        self.active
            .lock()
            .get(dedupe_key)
            .map(|entry| entry.record.clone())
    }
}
