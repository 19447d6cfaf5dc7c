//! Streaming side of the chat client: the socket connector, the connection
//! manager with its reconnect timer, and the typing buffer that assembles
//! partial replies.

pub mod connection;
pub mod connector;
pub mod draft;

pub use connection::{endpoint_for, ConnectionManager, ReconnectPolicy};
pub use connector::{Connector, SocketHandle, TungsteniteConnector};
pub use draft::{Finalized, TypingBuffer};

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "desconectado",
            ConnectionState::Connecting => "conectando",
            ConnectionState::Open => "conectado",
        };
        f.write_str(label)
    }
}

/// Lifecycle of a single socket, as reported by its I/O task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// Everything the session's event loop receives from the connection layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Socket { generation: u64, event: SocketEvent },
    /// Fired by the reconnect timer tagged `timer`.
    ReconnectDue { timer: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Socket is not open")]
    NotOpen,
    #[error("Socket closed")]
    Closed,
    #[error("Encode Error: {0}")]
    Encode(String),
}
