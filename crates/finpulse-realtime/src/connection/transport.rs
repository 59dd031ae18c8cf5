//! Transport abstraction between the connection manager and the socket.
//!
//! The manager only sees [`Frame`]s. [`WebSocketConnector`] is the production
//! implementation; tests plug in an in-memory connector.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::BoxStream};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

use crate::error::{RealtimeError, RealtimeResult};

/// Close codes the server uses to reject a session's credentials.
pub(crate) const AUTH_CLOSE_CODES: [u16; 3] = [1008, 4001, 4003];

/// A single transport frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseReason>),
}

impl Frame {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn is_auth_rejection(&self) -> bool {
        AUTH_CLOSE_CODES.contains(&self.code)
    }
}

/// Endpoint and credentials for one `connect()` call.
#[derive(Clone)]
pub struct Target {
    pub url: String,
    pub token: String,
}

impl Target {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub type FrameStream = BoxStream<'static, RealtimeResult<Frame>>;

/// Write half of an open transport.
#[async_trait]
pub trait FrameWriter: Send {
    async fn send_frame(&mut self, frame: Frame) -> RealtimeResult<()>;
}

/// Opens transports. One call per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> RealtimeResult<(FrameStream, Box<dyn FrameWriter>)>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// The session token is sent as a bearer `Authorization` header on the
/// upgrade request. A 401/403 handshake response is an auth failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketConnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsSinkWriter {
    sink: futures_util::stream::SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameWriter for WsSinkWriter {
    async fn send_frame(&mut self, frame: Frame) -> RealtimeResult<()> {
        self.sink
            .send(into_message(frame))
            .await
            .map_err(RealtimeError::from)
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        target: &Target,
        timeout: Duration,
    ) -> RealtimeResult<(FrameStream, Box<dyn FrameWriter>)> {
        let mut request = target.url.as_str().into_client_request()?;
        if !target.token.is_empty() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", target.token))
                .map_err(|_| RealtimeError::config("token is not a valid header value"))?;
            request.headers_mut().insert(AUTHORIZATION, bearer);
        }

        let (ws, _response) = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| RealtimeError::timeout(timeout))??;

        let (sink, stream) = ws.split();
        let reader = stream
            .filter_map(|item| async move {
                match item {
                    Ok(message) => from_message(message).map(Ok),
                    Err(err) => Some(Err(RealtimeError::from(err))),
                }
            })
            .boxed();

        Ok((reader, Box::new(WsSinkWriter { sink })))
    }
}

fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(data) => Some(Frame::Binary(data)),
        Message::Ping(data) => Some(Frame::Ping(data)),
        Message::Pong(data) => Some(Frame::Pong(data)),
        Message::Close(close) => Some(Frame::Close(close.map(|frame| CloseReason {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }))),
        Message::Frame(_) => None,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(reason) => Message::Close(reason.map(|r| CloseFrame {
            code: CloseCode::from(r.code),
            reason: r.reason.into(),
        })),
    }
}
