//! Session: the single event loop that owns all domain state.
//!
//! ```text
//! ConnectionManager ──ConnectionEvent──┐
//!                                      ▼
//! SessionHandle ──Command──▶ session loop ──reduce──▶ RwLock<RealtimeState>
//!                                      │                      ▲
//!                         CacheBridge ◀┤                      │ selectors
//!                      UiEffect bus   ◀┘              SessionHandle (Clone)
//! ```
//!
//! Inbound events and consumer commands are applied one at a time, in
//! receipt order, each under a single write lock. Readers therefore see
//! either the state before an action or the state after it, never a mix.

use std::{mem, sync::Arc};

use chrono::Utc;
use parking_lot::RwLock;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, trace};

use crate::{
    cache::{CacheBridge, SnapshotCache},
    config::RealtimeConfig,
    connection::{
        ConnectionEvent, ConnectionManager, ConnectionState, Connector, Generation,
        WebSocketConnector,
    },
    effects::{UiEffect, effects_for},
    error::{RealtimeError, RealtimeResult},
    event::{EventRouter, InboundEvent},
    selectors::Selectors,
    state::{Action, Command, RealtimeState, reduce},
    store::BudgetAlert,
};

#[derive(Debug)]
enum Request {
    Command {
        command: Command,
        ack: oneshot::Sender<()>,
    },
    FlushCache {
        ack: oneshot::Sender<()>,
    },
}

/// A session-scoped real-time engine.
///
/// Owns the connection, the event loop and the cache bridge. Dropping the
/// session stops all of them. Must be created inside a Tokio runtime.
pub struct RealtimeSession {
    manager: ConnectionManager,
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl RealtimeSession {
    pub fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        cache: Arc<dyn SnapshotCache>,
    ) -> RealtimeResult<Self> {
        config.validate().map_err(RealtimeError::config)?;
        let config = Arc::new(config);

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (request_tx, request_rx) = mpsc::channel(config.command_channel_capacity);
        let (revision_tx, revision_rx) = watch::channel(0u64);
        let (effects_tx, _) = broadcast::channel(config.effect_channel_capacity);

        let manager = ConnectionManager::new(Arc::clone(&config), connector, event_tx);
        let state = Arc::new(RwLock::new(RealtimeState::default()));

        let session_loop = SessionLoop {
            state: Arc::clone(&state),
            status_rx: manager.subscribe_status(),
            revision_tx,
            effects_tx: effects_tx.clone(),
            router: EventRouter::new(),
            bridge: CacheBridge::spawn(cache),
        };
        let task = tokio::spawn(session_loop.run(event_rx, request_rx));

        let handle = SessionHandle {
            requests: request_tx,
            state,
            status_rx: manager.subscribe_status(),
            revision_rx,
            effects_tx,
            preview_len: config.budget_alert_preview_len,
        };

        Ok(Self {
            manager,
            handle,
            task,
        })
    }

    /// Session over the production WebSocket transport.
    pub fn with_websocket(
        config: RealtimeConfig,
        cache: Arc<dyn SnapshotCache>,
    ) -> RealtimeResult<Self> {
        Self::new(config, Arc::new(WebSocketConnector), cache)
    }

    /// Open the push connection, replacing any existing one.
    pub fn connect(
        &self,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> RealtimeResult<Generation> {
        self.manager.connect(url, token)
    }

    /// Close the connection and stop retrying. Store contents are kept.
    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    /// Close the connection and stop the session.
    pub async fn shutdown(self) {
        self.manager.disconnect().await;
        info!("Realtime session shut down");
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Cheap, cloneable access to a session for UI consumers.
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    state: Arc<RwLock<RealtimeState>>,
    status_rx: watch::Receiver<ConnectionState>,
    revision_rx: watch::Receiver<u64>,
    effects_tx: broadcast::Sender<UiEffect>,
    preview_len: usize,
}

impl SessionHandle {
    /// Apply a command through the session loop. Resolves once it is
    /// visible to selectors.
    pub async fn command(&self, command: Command) -> RealtimeResult<()> {
        let (ack, done) = oneshot::channel();
        self.requests
            .send(Request::Command { command, ack })
            .await
            .map_err(|_| RealtimeError::SessionClosed)?;
        done.await.map_err(|_| RealtimeError::SessionClosed)
    }

    pub async fn mark_transactions_seen(&self) -> RealtimeResult<()> {
        self.command(Command::MarkTransactionsSeen).await
    }

    pub async fn clear_old_transactions(&self, retain: usize) -> RealtimeResult<()> {
        self.command(Command::ClearOldTransactions { retain }).await
    }

    pub async fn mark_notification_read(&self, id: impl Into<String>) -> RealtimeResult<()> {
        self.command(Command::MarkNotificationRead { id: id.into() })
            .await
    }

    pub async fn mark_notification_unread(&self, id: impl Into<String>) -> RealtimeResult<()> {
        self.command(Command::MarkNotificationUnread { id: id.into() })
            .await
    }

    pub async fn dismiss_notification(&self, id: impl Into<String>) -> RealtimeResult<()> {
        self.command(Command::DismissNotification { id: id.into() })
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> RealtimeResult<()> {
        self.command(Command::MarkAllNotificationsRead).await
    }

    pub async fn clear_old_notifications(&self, retain: usize) -> RealtimeResult<()> {
        self.command(Command::ClearOldNotifications { retain }).await
    }

    pub async fn dismiss_budget_alert(&self, budget_id: impl Into<String>) -> RealtimeResult<()> {
        self.command(Command::DismissBudgetAlert {
            budget_id: budget_id.into(),
        })
        .await
    }

    /// Wait until the cache bridge has handled every invalidation queued by
    /// actions applied before this call.
    pub async fn flush_cache(&self) -> RealtimeResult<()> {
        let (ack, done) = oneshot::channel();
        self.requests
            .send(Request::FlushCache { ack })
            .await
            .map_err(|_| RealtimeError::SessionClosed)?;
        done.await.map_err(|_| RealtimeError::SessionClosed)
    }

    /// Revision counter bumped after every applied action or status change.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision_rx.clone()
    }

    pub fn revision(&self) -> u64 {
        *self.revision_rx.borrow()
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<UiEffect> {
        self.effects_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_rx.clone()
    }

    /// Budget alert preview using the configured length.
    pub fn budget_alert_summary(&self) -> Vec<BudgetAlert> {
        self.budget_alert_preview(self.preview_len)
    }
}

impl Selectors for SessionHandle {
    fn with_state<R>(&self, f: impl FnOnce(&RealtimeState) -> R) -> R {
        f(&self.state.read())
    }

    fn connection_status(&self) -> ConnectionState {
        self.status_rx.borrow().clone()
    }
}

struct SessionLoop {
    state: Arc<RwLock<RealtimeState>>,
    status_rx: watch::Receiver<ConnectionState>,
    revision_tx: watch::Sender<u64>,
    effects_tx: broadcast::Sender<UiEffect>,
    router: EventRouter,
    bridge: CacheBridge,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut event_rx: mpsc::Receiver<ConnectionEvent>,
        mut request_rx: mpsc::Receiver<Request>,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(request) = request_rx.recv() => self.handle_request(request),
                Some(event) = event_rx.recv() => self.handle_connection_event(event),
                else => break,
            }
        }
        debug!(
            decoded = self.router.decoded(),
            dropped = self.router.dropped(),
            "Session loop stopped"
        );
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Command { command, ack } => {
                trace!(?command, "Applying command");
                self.dispatch(&Action::Command(command));
                let _ = ack.send(());
            }
            Request::FlushCache { ack } => self.bridge.notify_when_flushed(ack),
        }
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        let current = self.status_rx.borrow().generation;
        if event.generation() != current {
            trace!(
                generation = %event.generation(),
                %current,
                "Discarding event from superseded connection"
            );
            return;
        }

        match event {
            ConnectionEvent::Status(state) => {
                if state.requires_reauth() {
                    let message = state
                        .last_error
                        .map(|err| err.message)
                        .unwrap_or_default();
                    info!(%message, "Re-authentication required");
                    self.emit(UiEffect::AuthRequired { message });
                }
                self.bump();
            }
            ConnectionEvent::Opened { resync, generation } => {
                if resync {
                    info!(%generation, "Reconnected, resyncing snapshot cache");
                    self.bridge.resync();
                }
            }
            ConnectionEvent::Frame { text, .. } => {
                if let Some(inbound) = self.router.route(&text) {
                    self.apply_event(inbound);
                }
            }
        }
    }

    fn apply_event(&mut self, inbound: InboundEvent) {
        let kind = inbound.kind();
        let effects = {
            let mut state = self.state.write();
            let effects = effects_for(&state, &inbound.event);
            let action = Action::event(inbound, Utc::now());
            *state = reduce(mem::take(&mut *state), &action);
            effects
        };
        debug!(%kind, "Applied event");

        self.bump();
        self.bridge.invalidate(kind);
        for effect in effects {
            self.emit(effect);
        }
    }

    fn dispatch(&mut self, action: &Action) {
        {
            let mut state = self.state.write();
            *state = reduce(mem::take(&mut *state), action);
        }
        self.bump();
    }

    fn bump(&self) {
        self.revision_tx.send_modify(|revision| *revision += 1);
    }

    fn emit(&self, effect: UiEffect) {
        // No subscribers is fine; effects are fire-and-forget.
        let _ = self.effects_tx.send(effect);
    }
}
