//! Main application orchestration.
//!
//! Composition root for the console:
//! - push channel -> event router -> state store
//! - polling scheduler -> state store
//! - operator commands -> backend API + optimistic store mutations
//! - state store transitions -> notification policy -> gateway
//!
//! All long-lived resources (poll timers, the push socket) are released
//! deterministically on shutdown.

use crate::config::AppConfig;
use crate::error::AppResult;
use consensus_api::BackendClient;
use consensus_channel::{ChannelEvent, ConnectionManager};
use consensus_core::{SessionStatus, Symbol};
use consensus_notify::{AlertSeverity, NotificationGateway, NotificationPolicy, TracingSink};
use consensus_sync::{
    refresh_status, spawn_candle_task, spawn_standard_tasks, EventRouter, PollingScheduler,
    StateStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Operator actions, issued by the presentation layer.
#[derive(Debug, Clone)]
pub enum OperatorCommand {
    StartTrading,
    StopTrading,
    TriggerDebate,
    ToggleDemo,
    SelectSymbol(Symbol),
    EnableNotifications,
    Shutdown,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    store: StateStore,
    client: Arc<BackendClient>,
    scheduler: Arc<PollingScheduler>,
    gateway: Arc<NotificationGateway>,
    policy: NotificationPolicy,
    router: EventRouter,
    connection: Arc<ConnectionManager>,
    event_rx: mpsc::Receiver<ChannelEvent>,
    command_tx: mpsc::Sender<OperatorCommand>,
    command_rx: mpsc::Receiver<OperatorCommand>,
}

impl Application {
    /// Wire up all components. Nothing connects or polls until `run`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let initial_symbol = Symbol::new(config.default_symbol.clone())?;
        let store = StateStore::new(initial_symbol, config.debate_log_cap);

        let client = Arc::new(BackendClient::new(config.backend_url.clone())?);
        let scheduler = Arc::new(PollingScheduler::new());

        let gateway = Arc::new(NotificationGateway::new(
            Arc::new(TracingSink),
            Duration::from_millis(config.notifications.display_window_ms),
        ));
        let policy = NotificationPolicy::new(gateway.clone());
        let router = EventRouter::new(store.clone(), policy.clone(), config.arbiter_agent.clone());

        let (event_tx, event_rx) = mpsc::channel(256);
        let connection = Arc::new(ConnectionManager::new(config.channel_config(), event_tx));

        let (command_tx, command_rx) = mpsc::channel(64);

        Ok(Self {
            config,
            store,
            client,
            scheduler,
            gateway,
            policy,
            router,
            connection,
            event_rx,
            command_tx,
            command_rx,
        })
    }

    /// Handle for the presentation layer to read the view model.
    pub fn store(&self) -> StateStore {
        self.store.clone()
    }

    /// Handle for the presentation layer to issue operator commands.
    pub fn command_sender(&self) -> mpsc::Sender<OperatorCommand> {
        self.command_tx.clone()
    }

    /// Run the console until shutdown.
    pub async fn run(mut self) -> AppResult<()> {
        info!(
            backend_url = %self.config.backend_url,
            ws_url = %self.config.ws_url,
            symbol = %self.store.selected_symbol(),
            "Starting console"
        );

        // Push channel task. A permanent loss (reconnect budget spent) is
        // the one channel failure worth an operator alert.
        let connection = self.connection.clone();
        let policy = self.policy.clone();
        let channel_handle = tokio::spawn(async move {
            if let Err(e) = connection.connect().await {
                error!(error = %e, "push channel terminated");
                policy.on_alert("Push channel lost, no longer reconnecting", AlertSeverity::Error);
            }
        });

        if self.config.notifications.request_permission_on_start {
            let granted = self.gateway.request_permission();
            info!(granted, "notification permission requested at startup");
        }

        // Startup pulls: one authoritative status, the symbol list.
        if let Err(e) = refresh_status(&self.client, &self.store).await {
            warn!(error = %e, "initial status fetch failed");
        }
        match self.client.fetch_symbols().await {
            Ok(symbols) if !symbols.is_empty() => self.store.set_symbols(symbols),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "symbol list fetch failed"),
        }

        // Periodic pulls.
        let plan = self.config.poll_plan();
        spawn_standard_tasks(&self.scheduler, &self.client, &self.store, &plan);

        // Main event loop.
        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.handle_channel_event(event);
                }

                Some(command) = self.command_rx.recv() => {
                    if matches!(command, OperatorCommand::Shutdown) {
                        info!("shutdown command received");
                        break;
                    }
                    self.handle_command(command).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Teardown: no timer or socket survives this point.
        self.scheduler.shutdown();
        self.connection.shutdown();
        if tokio::time::timeout(Duration::from_secs(2), channel_handle)
            .await
            .is_err()
        {
            warn!("push channel task did not stop in time, aborting");
        }

        info!("Console stopped");
        Ok(())
    }

    /// Apply one channel transition. Frames are routed synchronously and
    /// strictly in arrival order.
    fn handle_channel_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                self.store.set_connected(true);
                // Every (re)connect warrants a fresh authoritative status.
                let client = self.client.clone();
                let store = self.store.clone();
                tokio::spawn(async move {
                    if let Err(e) = refresh_status(&client, &store).await {
                        warn!(error = %e, "status refresh after connect failed");
                    }
                });
            }
            ChannelEvent::Closed => {
                self.store.set_connected(false);
            }
            ChannelEvent::Errored { detail } => {
                // Reported only; the connected flag flips on the Closed
                // that follows.
                warn!(%detail, "push channel error");
            }
            ChannelEvent::Frame(frame) => {
                self.router.route(frame);
            }
        }
    }

    /// Execute one operator command. A failed command leaves the store
    /// untouched; optimistic mutations happen only on explicit success.
    async fn handle_command(&self, command: OperatorCommand) {
        match command {
            OperatorCommand::StartTrading => {
                let symbol = self.store.selected_symbol();
                match self.client.start_trading(Some(&symbol)).await {
                    Ok(ack) if ack.success => {
                        info!(symbol = %symbol, "trading started");
                        self.store.apply_optimistic_status(SessionStatus::Running);
                    }
                    Ok(ack) => warn!(message = %ack.message, "start command rejected"),
                    Err(e) => warn!(error = %e, "start command failed"),
                }
            }

            OperatorCommand::StopTrading => match self.client.stop_trading().await {
                Ok(ack) if ack.success => {
                    info!("trading stopped");
                    self.store.apply_optimistic_status(SessionStatus::Stopped);
                }
                Ok(ack) => warn!(message = %ack.message, "stop command rejected"),
                Err(e) => warn!(error = %e, "stop command failed"),
            },

            OperatorCommand::TriggerDebate => match self.client.trigger_debate().await {
                // Fire-and-acknowledge; results arrive over the push
                // channel.
                Ok(_) => info!("debate cycle triggered"),
                Err(e) => warn!(error = %e, "debate trigger failed"),
            },

            OperatorCommand::ToggleDemo => match self.client.toggle_demo().await {
                Ok(ack) if ack.success => {
                    info!(demo_mode = ack.demo_mode, "demo mode toggled");
                    self.store.set_demo_mode(ack.demo_mode);
                }
                Ok(_) => warn!("demo toggle rejected"),
                Err(e) => warn!(error = %e, "demo toggle failed"),
            },

            OperatorCommand::SelectSymbol(symbol) => {
                if self.store.select_symbol(symbol.clone()) {
                    // Restart the candle poll against the new symbol,
                    // superseding any in-flight fetch for the old one.
                    spawn_candle_task(
                        &self.scheduler,
                        &self.client,
                        &self.store,
                        self.config.poll_plan().candles_interval,
                    );
                    info!(symbol = %symbol, "candle poll restarted for new symbol");
                }
            }

            OperatorCommand::EnableNotifications => {
                let granted = self.gateway.request_permission();
                info!(granted, "notification permission");
            }

            OperatorCommand::Shutdown => {
                // Handled in the run loop.
            }
        }
    }
}
