//! In-memory transport for unit tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    cache::{CacheKey, SnapshotCache},
    config::RealtimeConfig,
    connection::{
        ConnectionEvent, ConnectionState,
        transport::{CloseReason, Connector, Frame, FrameStream, FrameWriter, Target},
    },
    error::{RealtimeError, RealtimeResult},
};

pub(crate) fn test_config() -> RealtimeConfig {
    RealtimeConfig::new()
        .reconnect_initial_delay(Duration::from_millis(5))
        .reconnect_max_delay(Duration::from_millis(20))
        .reconnect_jitter(0.0)
        .close_timeout(Duration::from_millis(200))
}

pub(crate) async fn next_status(events: &mut mpsc::Receiver<ConnectionEvent>) -> ConnectionState {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for status")
            .expect("event channel closed");
        if let ConnectionEvent::Status(state) = event {
            return state;
        }
    }
}

#[derive(Clone, Copy)]
enum Refusal {
    Transport,
    Auth,
}

/// Server side of an accepted in-memory connection.
pub(crate) struct MockPeer {
    frames: mpsc::UnboundedSender<RealtimeResult<Frame>>,
    pub(crate) written: mpsc::UnboundedReceiver<Frame>,
}

impl MockPeer {
    pub(crate) fn send(&self, frame: Frame) {
        let _ = self.frames.send(Ok(frame));
    }

    pub(crate) fn send_text(&self, text: impl Into<String>) {
        self.send(Frame::Text(text.into()));
    }

    pub(crate) fn close_with(&self, code: u16, reason: &str) {
        self.send(Frame::Close(Some(CloseReason {
            code,
            reason: reason.to_string(),
        })));
    }
}

struct ChannelWriter {
    written: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl FrameWriter for ChannelWriter {
    async fn send_frame(&mut self, frame: Frame) -> RealtimeResult<()> {
        self.written
            .send(frame)
            .map_err(|_| RealtimeError::connection_closed(None))
    }
}

/// Accepts every attempt unless refusals have been queued.
pub(crate) struct ScriptedConnector {
    refusals: Mutex<Vec<Refusal>>,
    attempts: AtomicUsize,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, peers_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            refusals: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            peers,
        });
        (connector, peers_rx)
    }

    pub(crate) fn refuse_next(&self, count: usize) {
        self.refusals
            .lock()
            .extend(std::iter::repeat_n(Refusal::Transport, count));
    }

    pub(crate) fn reject_auth_next(&self) {
        self.refusals.lock().push(Refusal::Auth);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        _target: &Target,
        _timeout: Duration,
    ) -> RealtimeResult<(FrameStream, Box<dyn FrameWriter>)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let refusal = {
            let mut refusals = self.refusals.lock();
            if refusals.is_empty() {
                None
            } else {
                Some(refusals.remove(0))
            }
        };
        match refusal {
            Some(Refusal::Transport) => return Err(RealtimeError::transport("connection refused")),
            Some(Refusal::Auth) => return Err(RealtimeError::auth("handshake rejected with 401")),
            None => {}
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = mpsc::unbounded_channel();
        let reader = futures_util::stream::unfold(frames_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
        .boxed();

        let _ = self.peers.send(MockPeer {
            frames: frames_tx,
            written: written_rx,
        });

        Ok((reader, Box::new(ChannelWriter { written: written_tx })))
    }
}

/// Snapshot cache that records what it was asked to refetch.
#[derive(Default)]
pub(crate) struct RecordingCache {
    pub(crate) invalidated: Mutex<Vec<Vec<CacheKey>>>,
    pub(crate) resyncs: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingCache {
    /// Records every call but reports each invalidation as failed.
    pub(crate) fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub(crate) fn resyncs(&self) -> usize {
        self.resyncs.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidated_keys(&self) -> Vec<CacheKey> {
        self.invalidated.lock().iter().flatten().copied().collect()
    }
}

#[async_trait]
impl SnapshotCache for RecordingCache {
    async fn invalidate(&self, keys: &[CacheKey]) -> RealtimeResult<()> {
        self.invalidated.lock().push(keys.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RealtimeError::transport("refetch failed"));
        }
        Ok(())
    }

    async fn resync(&self) -> RealtimeResult<()> {
        self.resyncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
