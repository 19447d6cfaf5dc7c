use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

use crate::stream::{ConnectionEvent, SocketEvent, StreamError};

/// Handle to a socket owned by the connection manager.
pub struct SocketHandle {
    outgoing: UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl SocketHandle {
    pub fn new(outgoing: UnboundedSender<String>, task: Option<JoinHandle<()>>) -> Self {
        Self { outgoing, task }
    }

    pub fn send(&self, text: String) -> Result<(), StreamError> {
        self.outgoing.send(text).map_err(|_| StreamError::Closed)
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Constructs sockets without waiting for the handshake.
///
/// `open` returns as soon as the socket exists; the handshake outcome arrives
/// later as `Opened` or `Error`/`Closed` on `events`, tagged with `generation`.
/// An `Err` here means the socket could not even be constructed.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        url: &Url,
        generation: u64,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Result<SocketHandle, StreamError>;
}

#[derive(Debug, Default, Clone)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn open(
        &self,
        url: &Url,
        generation: u64,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Result<SocketHandle, StreamError> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(StreamError::InvalidEndpoint(url.to_string()));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let target = url.to_string();

        let emit = move |event: SocketEvent| {
            let _ = events.send(ConnectionEvent::Socket { generation, event });
        };

        let task = tokio::spawn(async move {
            let stream = match tokio_tungstenite::connect_async(target.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("WebSocket connect to {} failed: {}", target, e);
                    emit(SocketEvent::Error(e.to_string()));
                    emit(SocketEvent::Closed);
                    return;
                }
            };

            info!("WebSocket connected to {}", target);
            emit(SocketEvent::Opened);

            let (mut ws_write, mut ws_read) = stream.split();

            loop {
                tokio::select! {
                    outgoing = rx.recv() => match outgoing {
                        Some(text) => {
                            if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                                warn!("WebSocket send failed: {}", e);
                                emit(SocketEvent::Error(e.to_string()));
                                break;
                            }
                        }
                        None => {
                            let _ = ws_write.close().await;
                            break;
                        }
                    },
                    incoming = ws_read.next() => match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            emit(SocketEvent::Message(text.to_string()))
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            debug!("WebSocket closed by server: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("WebSocket error: {}", e);
                            emit(SocketEvent::Error(e.to_string()));
                            break;
                        }
                        None => break,
                    },
                }
            }

            emit(SocketEvent::Closed);
        });

        Ok(SocketHandle::new(tx, Some(task)))
    }
}
