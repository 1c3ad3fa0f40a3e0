//! Standard poll tasks.
//!
//! Each task is an idempotent fetch-and-merge unit: pull one endpoint,
//! replace one store slice wholesale on success, keep the previous slice
//! on failure. Cadence and wiring live here so the composition root only
//! decides *when* to (re)schedule.

use crate::error::SyncResult;
use crate::poller::{PollTask, PollingScheduler};
use crate::store::{StateStore, StatusOrigin};
use consensus_api::BackendClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cadence plan for the standard task set.
#[derive(Debug, Clone)]
pub struct PollPlan {
    /// Portfolio stats cadence.
    pub portfolio_interval: Duration,
    /// Trade log cadence.
    pub trades_interval: Duration,
    /// Candle series cadence (restarted on every symbol switch).
    pub candles_interval: Duration,
    /// Trade log page size.
    pub trades_limit: usize,
}

impl Default for PollPlan {
    fn default() -> Self {
        Self {
            portfolio_interval: Duration::from_secs(10),
            trades_interval: Duration::from_secs(30),
            candles_interval: Duration::from_secs(10),
            trades_limit: 50,
        }
    }
}

/// One on-demand authoritative status refresh (startup, reconnect).
pub async fn refresh_status(client: &BackendClient, store: &StateStore) -> SyncResult<()> {
    let snapshot = client.fetch_status().await?;
    store.apply_status(snapshot, StatusOrigin::Authoritative);
    Ok(())
}

/// Schedule the portfolio and trade-log tasks, and the candle task for
/// the currently selected symbol.
pub fn spawn_standard_tasks(
    scheduler: &PollingScheduler,
    client: &Arc<BackendClient>,
    store: &StateStore,
    plan: &PollPlan,
) {
    {
        let client = client.clone();
        let store = store.clone();
        scheduler.spawn(
            PollTask::Portfolio,
            plan.portfolio_interval,
            true,
            move || {
                let client = client.clone();
                let store = store.clone();
                async move {
                    let snapshot = client.fetch_status().await?;
                    // This task owns only the portfolio slice; the status
                    // slice is fed by the on-demand refresh and the push
                    // channel.
                    if let Some(trading) = snapshot.trading {
                        store.replace_portfolio(trading);
                    }
                    Ok(())
                }
            },
        );
    }

    {
        let client = client.clone();
        let store = store.clone();
        let limit = plan.trades_limit;
        scheduler.spawn(PollTask::Trades, plan.trades_interval, true, move || {
            let client = client.clone();
            let store = store.clone();
            async move {
                let trades = client.fetch_trades(limit).await?;
                store.replace_trades(trades);
                Ok(())
            }
        });
    }

    spawn_candle_task(scheduler, client, store, plan.candles_interval);
}

/// (Re)schedule the candle task against the currently selected symbol.
///
/// Respawning supersedes the previous task, cancelling its timer and any
/// in-flight fetch for the old symbol. The symbol is captured at request
/// time; the store discards a response whose symbol is no longer
/// selected.
pub fn spawn_candle_task(
    scheduler: &PollingScheduler,
    client: &Arc<BackendClient>,
    store: &StateStore,
    interval: Duration,
) {
    let client = client.clone();
    let store = store.clone();
    scheduler.spawn(PollTask::Candles, interval, true, move || {
        let client = client.clone();
        let store = store.clone();
        async move {
            let requested = store.selected_symbol();
            let series = client.fetch_candles(&requested).await?;
            if !store.replace_candles(&requested, series) {
                debug!(symbol = %requested, "candle response discarded, symbol deselected");
            }
            Ok(())
        }
    });
}
