use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::stream::{
    ConnectionEvent, ConnectionState, Connector, SocketEvent, SocketHandle, StreamError,
};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` keeps reconnecting for as long as the manager lives.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Derives the WebSocket endpoint from the page origin: `https` pages use
/// `wss`, everything else `ws`, on the same host and port.
pub fn endpoint_for(origin: &Url, path: &str) -> Result<Url, StreamError> {
    let scheme = if origin.scheme() == "https" { "wss" } else { "ws" };
    let host = origin
        .host_str()
        .ok_or_else(|| StreamError::InvalidEndpoint(origin.to_string()))?;

    let authority = match origin.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    Url::parse(&format!("{}://{}{}", scheme, authority, path))
        .map_err(|e| StreamError::InvalidEndpoint(e.to_string()))
}

/// Sole owner of the socket handle, the connection state and the reconnect timer.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    endpoint: Url,
    policy: ReconnectPolicy,
    state: ConnectionState,
    generation: u64,
    socket: Option<SocketHandle>,
    /// The armed reconnect timer and its tag. Due events carrying any other tag are stale.
    reconnect: Option<(u64, JoinHandle<()>)>,
    timers: u64,
    attempts: u32,
    events: UnboundedSender<ConnectionEvent>,
    status: watch::Sender<ConnectionState>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        endpoint: Url,
        policy: ReconnectPolicy,
    ) -> (Self, UnboundedReceiver<ConnectionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ConnectionState::Disconnected);

        let manager = Self {
            connector,
            endpoint,
            policy,
            state: ConnectionState::Disconnected,
            generation: 0,
            socket: None,
            reconnect: None,
            timers: 0,
            attempts: 0,
            events,
            status,
        };
        (manager, rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Consecutive reconnects since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect
            .as_ref()
            .is_some_and(|(_, timer)| !timer.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    /// Opens a socket unless one is already connecting or open.
    ///
    /// Returns `Ok(true)` when a new socket was constructed.
    pub fn ensure_connected(&mut self) -> Result<bool, StreamError> {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            return Ok(false);
        }

        let generation = self.generation + 1;
        let socket = self
            .connector
            .open(&self.endpoint, generation, self.events.clone())?;

        debug!("Opening socket #{} to {}", generation, self.endpoint);
        self.cancel_reconnect();
        self.generation = generation;
        self.socket = Some(socket);
        self.set_state(ConnectionState::Connecting);
        Ok(true)
    }

    pub fn send(&self, text: String) -> Result<(), StreamError> {
        match (&self.socket, self.state) {
            (Some(socket), ConnectionState::Open) => socket.send(text),
            _ => Err(StreamError::NotOpen),
        }
    }

    /// Applies a connection event. Returns the text of an incoming frame, if any,
    /// for the caller to dispatch.
    pub fn on_event(&mut self, event: ConnectionEvent) -> Option<String> {
        match event {
            ConnectionEvent::ReconnectDue { timer } => {
                if self.reconnect.as_ref().map(|(tag, _)| *tag) != Some(timer) {
                    debug!("Ignoring stale reconnect timer #{}", timer);
                    return None;
                }
                self.reconnect = None;
                if self.state != ConnectionState::Disconnected {
                    return None;
                }
                self.attempts += 1;
                info!("Reconnecting (attempt {})", self.attempts);
                if let Err(e) = self.ensure_connected() {
                    warn!("Reconnect failed: {}", e);
                    self.arm_reconnect();
                }
                None
            }
            ConnectionEvent::Socket { generation, event } => {
                if generation != self.generation {
                    debug!("Ignoring event from stale socket #{}", generation);
                    return None;
                }
                match event {
                    SocketEvent::Opened => {
                        self.attempts = 0;
                        self.set_state(ConnectionState::Open);
                        None
                    }
                    SocketEvent::Message(text) => Some(text),
                    SocketEvent::Error(reason) => {
                        debug!("Socket #{} error: {}", generation, reason);
                        // Status fires; the state itself changes on Closed.
                        self.status.send_replace(self.state);
                        None
                    }
                    SocketEvent::Closed => {
                        self.socket = None;
                        self.set_state(ConnectionState::Disconnected);
                        self.arm_reconnect();
                        None
                    }
                }
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.status.send_replace(state);
    }

    fn cancel_reconnect(&mut self) {
        if let Some((_, timer)) = self.reconnect.take() {
            timer.abort();
        }
    }

    fn arm_reconnect(&mut self) {
        self.cancel_reconnect();

        if !self.policy.allows(self.attempts) {
            warn!("Giving up reconnecting after {} attempts", self.attempts);
            return;
        }

        self.timers += 1;
        let timer = self.timers;
        let delay = self.policy.delay;
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnectionEvent::ReconnectDue { timer });
        });
        self.reconnect = Some((timer, handle));
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.cancel_reconnect();
    }
}
