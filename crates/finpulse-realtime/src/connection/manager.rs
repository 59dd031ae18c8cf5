//! Lifecycle of the single live push connection.
//!
//! [`ConnectionManager`] owns at most one background driver task at a time.
//! The driver opens the transport through a [`Connector`], forwards text
//! frames to the session as [`ConnectionEvent`]s, answers heartbeats, and on
//! unexpected loss schedules reconnects with capped exponential backoff.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, sleep, timeout},
};
use tracing::{debug, error, info, warn};

use super::{
    status::{ConnectionError, ConnectionState, ConnectionStatus, Generation},
    transport::{Connector, Frame, FrameStream, FrameWriter, Target},
};
use crate::{
    config::RealtimeConfig,
    error::{RealtimeError, RealtimeResult},
    reconnect::calculate_backoff,
};

/// Output of the connection manager, consumed by the session loop.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    /// A status transition. Delivered in order, unlike the coalescing
    /// `watch` channel.
    Status(ConnectionState),
    /// The transport opened. `resync` is set for every open after the
    /// manager's first, across generations: events during the outage are not
    /// replayed.
    Opened { generation: Generation, resync: bool },
    /// A decoded text frame.
    Frame { generation: Generation, text: String },
}

impl ConnectionEvent {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Status(state) => state.generation,
            Self::Opened { generation, .. } | Self::Frame { generation, .. } => *generation,
        }
    }
}

#[derive(Debug)]
enum ControlCommand {
    Close,
}

struct ActiveConnection {
    generation: Generation,
    ctrl_tx: mpsc::Sender<ControlCommand>,
    task: JoinHandle<()>,
}

/// Writes status for one generation only. Once a newer generation has been
/// installed every write from an older driver is silently rejected.
#[derive(Clone)]
struct StatusPublisher {
    generation: Generation,
    status_tx: Arc<watch::Sender<ConnectionState>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
}

impl StatusPublisher {
    async fn publish(&self, update: impl FnOnce(&mut ConnectionState)) -> bool {
        let mut published = None;
        self.status_tx.send_if_modified(|state| {
            if state.generation != self.generation {
                return false;
            }
            update(state);
            published = Some(state.clone());
            true
        });

        match published {
            Some(state) => self.event_tx.send(ConnectionEvent::Status(state)).await.is_ok(),
            None => false,
        }
    }
}

/// Manages the session's single transport connection.
pub struct ConnectionManager {
    config: Arc<RealtimeConfig>,
    connector: Arc<dyn Connector>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    status_tx: Arc<watch::Sender<ConnectionState>>,
    active: Mutex<Option<ActiveConnection>>,
    opened_once: Arc<AtomicBool>,
}

impl ConnectionManager {
    pub fn new(
        config: Arc<RealtimeConfig>,
        connector: Arc<dyn Connector>,
        event_tx: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionState::default());
        Self {
            config,
            connector,
            event_tx,
            status_tx: Arc::new(status_tx),
            active: Mutex::new(None),
            opened_once: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a connection to `url`, superseding any existing one.
    ///
    /// Returns the generation assigned to the new connection. Frames still in
    /// flight from a superseded connection carry an older generation.
    pub fn connect(
        &self,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> RealtimeResult<Generation> {
        let target = Target::new(url, token);
        if target.url.is_empty() {
            return Err(RealtimeError::config("URL cannot be empty"));
        }

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            info!(generation = %previous.generation, "Superseding active connection");
            let _ = previous.ctrl_tx.try_send(ControlCommand::Close);
            previous.task.abort();
        }

        let generation = self.status_tx.borrow().generation.next();
        self.status_tx.send_replace(ConnectionState {
            status: ConnectionStatus::Connecting,
            reconnect_attempts: 0,
            last_error: None,
            generation,
        });

        let (ctrl_tx, ctrl_rx) = mpsc::channel(1);
        let publisher = StatusPublisher {
            generation,
            status_tx: Arc::clone(&self.status_tx),
            event_tx: self.event_tx.clone(),
        };
        let task = tokio::spawn(connection_driver(
            Arc::clone(&self.config),
            Arc::clone(&self.connector),
            target,
            publisher,
            Arc::clone(&self.opened_once),
            ctrl_rx,
        ));

        *active = Some(ActiveConnection {
            generation,
            ctrl_tx,
            task,
        });

        Ok(generation)
    }

    /// Close the connection and stop retrying.
    ///
    /// Cancels any pending reconnect timer, waits up to `close_timeout` for
    /// the close handshake, and leaves the manager `Disconnected`.
    pub async fn disconnect(&self) {
        let (previous, retired) = {
            let mut active = self.active.lock();
            let previous = active.take();
            let mut retired = None;
            self.status_tx.send_modify(|state| {
                state.generation = state.generation.next();
                state.status = ConnectionStatus::Disconnected;
                state.reconnect_attempts = 0;
                retired = Some(state.clone());
            });
            (previous, retired)
        };

        if let Some(previous) = previous {
            let _ = previous.ctrl_tx.try_send(ControlCommand::Close);
            let mut task = previous.task;
            if timeout(self.config.close_timeout, &mut task).await.is_err() {
                warn!(
                    generation = %previous.generation,
                    "Close handshake timed out, aborting driver"
                );
                task.abort();
            }
            info!(generation = %previous.generation, "Disconnected");
        }

        if let Some(state) = retired {
            let _ = self.event_tx.send(ConnectionEvent::Status(state)).await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status_tx.borrow().clone()
    }

    /// Generation of the current (or most recently retired) connection.
    pub fn generation(&self) -> Generation {
        self.status_tx.borrow().generation
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.task.abort();
        }
    }
}

async fn connection_driver(
    config: Arc<RealtimeConfig>,
    connector: Arc<dyn Connector>,
    target: Target,
    publisher: StatusPublisher,
    opened_once: Arc<AtomicBool>,
    mut ctrl_rx: mpsc::Receiver<ControlCommand>,
) {
    let generation = publisher.generation;
    let backoff = config.backoff();
    let mut attempts: u32 = 0;

    if !publisher
        .publish(|state| state.status = ConnectionStatus::Connecting)
        .await
    {
        return;
    }

    loop {
        info!(url = %target.url, %generation, attempt = attempts, "Connecting");

        let connection = tokio::select! {
            biased;
            _ = ctrl_rx.recv() => return,
            result = connector.connect(&target, config.connect_timeout) => result,
        };

        let failure = match connection {
            Ok((reader, writer)) => {
                attempts = 0;
                if !publisher
                    .publish(|state| {
                        state.status = ConnectionStatus::Connected;
                        state.reconnect_attempts = 0;
                        state.last_error = None;
                    })
                    .await
                {
                    return;
                }

                let resync = opened_once.swap(true, Ordering::SeqCst);
                info!(%generation, resync, "Connection established");
                if publisher
                    .event_tx
                    .send(ConnectionEvent::Opened { generation, resync })
                    .await
                    .is_err()
                {
                    return;
                }

                match connection_task(&config, &publisher, &mut ctrl_rx, reader, writer).await {
                    Ok(()) => return,
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };

        if !failure.is_retryable() {
            error!(%generation, error = %failure, "Connection rejected, not retrying");
            publisher
                .publish(|state| {
                    state.status = ConnectionStatus::Disconnected;
                    state.last_error = Some(ConnectionError::from(&failure));
                })
                .await;
            return;
        }

        attempts = attempts.saturating_add(1);
        let delay = calculate_backoff(backoff, attempts - 1);
        warn!(
            %generation,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Connection lost, reconnecting after backoff"
        );
        if !publisher
            .publish(|state| {
                state.status = ConnectionStatus::Reconnecting;
                state.reconnect_attempts = attempts;
                state.last_error = Some(ConnectionError::from(&failure));
            })
            .await
        {
            return;
        }

        tokio::select! {
            biased;
            _ = ctrl_rx.recv() => return,
            _ = sleep(delay) => {}
        }

        if !publisher
            .publish(|state| state.status = ConnectionStatus::Connecting)
            .await
        {
            return;
        }
    }
}

/// Pump one open transport until it fails or a close is requested.
///
/// `Ok(())` means the driver should stop; `Err` means the link was lost.
async fn connection_task(
    config: &RealtimeConfig,
    publisher: &StatusPublisher,
    ctrl_rx: &mut mpsc::Receiver<ControlCommand>,
    mut reader: FrameStream,
    mut writer: Box<dyn FrameWriter>,
) -> RealtimeResult<()> {
    let generation = publisher.generation;
    let start = tokio::time::Instant::now() + config.ping_interval;
    let mut ping_interval = interval_at(start, config.ping_interval);
    let mut ping_outstanding: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = ctrl_rx.recv() => {
                debug!(%generation, "Close requested");
                let _ = timeout(config.close_timeout, writer.send_frame(Frame::Close(None))).await;
                return Ok(());
            }
            frame = reader.next() => {
                let text = match frame {
                    Some(Ok(Frame::Text(text))) => text,
                    Some(Ok(Frame::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!(%generation, "Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Frame::Ping(data))) => {
                        let _ = writer.send_frame(Frame::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Frame::Pong(_))) => {
                        ping_outstanding = None;
                        continue;
                    }
                    Some(Ok(Frame::Close(reason))) => {
                        return Err(match reason {
                            Some(reason) if reason.is_auth_rejection() => RealtimeError::auth(
                                format!("closed by server ({}): {}", reason.code, reason.reason),
                            ),
                            Some(reason) => RealtimeError::connection_closed(Some(format!(
                                "{} {}",
                                reason.code, reason.reason
                            ))),
                            None => RealtimeError::connection_closed(None),
                        });
                    }
                    Some(Err(err)) => {
                        warn!(%generation, error = %err, "Transport read error");
                        return Err(err);
                    }
                    None => return Err(RealtimeError::connection_closed(None)),
                };

                if text.len() > config.max_message_size {
                    warn!(
                        %generation,
                        size = text.len(),
                        max = config.max_message_size,
                        "Dropping oversized frame"
                    );
                    continue;
                }

                let frame = ConnectionEvent::Frame { generation, text };
                if publisher.event_tx.send(frame).await.is_err() {
                    // Session loop is gone; nobody is left to consume frames.
                    return Ok(());
                }
            }
            _ = ping_interval.tick() => {
                if let Some(sent) = ping_outstanding
                    && sent.elapsed() > config.pong_timeout
                {
                    return Err(RealtimeError::connection_closed(Some("Pong timeout".to_string())));
                }
                if writer.send_frame(Frame::Ping(Vec::new())).await.is_ok()
                    && ping_outstanding.is_none()
                {
                    ping_outstanding = Some(Instant::now());
                }
            }
        }
    }
}
