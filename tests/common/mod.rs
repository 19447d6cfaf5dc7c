#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

use lucy_client::api::models::{
    ChatReply, ChatRequest, LanguageReply, LoginRequest, RegisterRequest,
};
use lucy_client::api::{ApiError, ChatBackend};
use lucy_client::config::StorageConfig;
use lucy_client::db::{get_connection, DbPool};
use lucy_client::session::{ChatSession, ChatView, Role, SessionIdStore, SessionOptions};
use lucy_client::stream::{
    ConnectionEvent, ConnectionState, Connector, ReconnectPolicy, SocketEvent, SocketHandle,
    StreamError,
};

// --- Connector ---

pub struct OpenedSocket {
    pub generation: u64,
    pub events: UnboundedSender<ConnectionEvent>,
    pub outgoing: UnboundedReceiver<String>,
}

#[derive(Default)]
pub struct ConnectorState {
    pub sockets: Vec<OpenedSocket>,
    pub fail: bool,
}

/// Records every socket it constructs; tests drive the socket lifecycle by hand.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn failing() -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().fail = true;
        connector
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().sockets.len()
    }

    /// Emits `event` as if it came from the most recently opened socket.
    pub fn emit(&self, event: SocketEvent) {
        let state = self.state.lock().unwrap();
        let socket = state.sockets.last().expect("no socket was opened");
        socket
            .events
            .send(ConnectionEvent::Socket {
                generation: socket.generation,
                event,
            })
            .unwrap();
    }

    pub fn emit_frame(&self, frame: Value) {
        self.emit(SocketEvent::Message(frame.to_string()));
    }

    /// Every frame written so far, across all sockets, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        let mut state = self.state.lock().unwrap();
        let mut frames = Vec::new();
        for socket in state.sockets.iter_mut() {
            while let Ok(text) = socket.outgoing.try_recv() {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }
        frames
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        url: &Url,
        generation: u64,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Result<SocketHandle, StreamError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(StreamError::InvalidEndpoint(url.to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.sockets.push(OpenedSocket {
            generation,
            events,
            outgoing: rx,
        });
        Ok(SocketHandle::new(tx, None))
    }
}

// --- Backend ---

#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply { session_id: String, response: String },
    /// A 200 reply whose body carries no `session_id`.
    Anonymous(String),
    Unauthorized(Option<String>),
    Rejected(u16, Option<String>),
    Offline,
}

#[derive(Debug)]
pub struct BackendState {
    pub calls: Vec<String>,
    pub chat_requests: Vec<(ChatRequest, Option<String>)>,
    pub chat_outcome: ChatOutcome,
    pub csrf: Option<String>,
    pub register_outcome: Option<ChatOutcome>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            chat_requests: Vec::new(),
            chat_outcome: ChatOutcome::Reply {
                session_id: "s1".to_string(),
                response: "hi".to_string(),
            },
            csrf: Some("tok".to_string()),
            register_outcome: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn with_chat_outcome(outcome: ChatOutcome) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().chat_outcome = outcome;
        backend
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn chat_requests(&self) -> Vec<(ChatRequest, Option<String>)> {
        self.state.lock().unwrap().chat_requests.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn outcome_to_result(outcome: ChatOutcome) -> Result<ChatReply, ApiError> {
    match outcome {
        ChatOutcome::Reply {
            session_id,
            response,
        } => Ok(ChatReply {
            session_id: Some(session_id),
            response,
        }),
        ChatOutcome::Anonymous(response) => Ok(ChatReply {
            session_id: None,
            response,
        }),
        ChatOutcome::Unauthorized(message) => Err(ApiError::Unauthorized(message)),
        ChatOutcome::Rejected(status, message) => Err(ApiError::Rejected { status, message }),
        ChatOutcome::Offline => Err(ApiError::Network("connection refused".to_string())),
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn csrf_token(&self) -> Result<String, ApiError> {
        self.record("csrf".to_string());
        self.state
            .lock()
            .unwrap()
            .csrf
            .clone()
            .ok_or_else(|| ApiError::Network("unreachable".to_string()))
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        csrf_token: Option<&str>,
    ) -> Result<ChatReply, ApiError> {
        self.record("chat".to_string());
        let mut state = self.state.lock().unwrap();
        state
            .chat_requests
            .push((request.clone(), csrf_token.map(str::to_string)));
        outcome_to_result(state.chat_outcome.clone())
    }

    async fn stats(&self) -> Result<Value, ApiError> {
        self.record("stats".to_string());
        Ok(json!({ "engine": { "messages": 1 } }))
    }

    async fn context(&self, session_id: &str) -> Result<Value, ApiError> {
        self.record(format!("context:{}", session_id));
        Ok(json!({ "session_id": session_id, "history": [] }))
    }

    async fn clear(&self, session_id: Option<&str>) -> Result<(), ApiError> {
        self.record(format!("clear:{}", session_id.unwrap_or_default()));
        Ok(())
    }

    async fn set_language(
        &self,
        code: &str,
        _session_id: Option<&str>,
    ) -> Result<LanguageReply, ApiError> {
        self.record(format!("lang:{}", code));
        if code == "xx" {
            Ok(LanguageReply::Refused("Idioma no soportado".to_string()))
        } else {
            Ok(LanguageReply::Changed(code.to_string()))
        }
    }

    async fn register(
        &self,
        request: &RegisterRequest,
        _csrf_token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.record(format!("register:{}", request.username));
        match self.state.lock().unwrap().register_outcome.clone() {
            None => Ok(()),
            Some(outcome) => outcome_to_result(outcome).map(|_| ()),
        }
    }

    async fn login(
        &self,
        request: &LoginRequest,
        _csrf_token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.record(format!("login:{}", request.identifier));
        if request.password == "Abcdef12" {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(Some("Usuario/contraseña inválidos".to_string())))
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record("logout".to_string());
        Ok(())
    }
}

// --- View ---

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message(Role, String),
    Draft(String),
    Finished(String),
    Cleared,
    Status(ConnectionState),
    Streaming(bool),
    Stats(Value),
    Notice(String),
    Navigate(String),
}

#[derive(Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn bot_messages(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Message(Role::Bot, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has(&self, event: &ViewEvent) -> bool {
        self.events.contains(event)
    }

    pub fn last(&self) -> Option<&ViewEvent> {
        self.events.last()
    }
}

impl ChatView for RecordingView {
    fn append_message(&mut self, role: Role, text: &str) {
        self.events.push(ViewEvent::Message(role, text.to_string()));
    }

    fn render_draft(&mut self, text: &str) {
        self.events.push(ViewEvent::Draft(text.to_string()));
    }

    fn finish_draft(&mut self, text: &str) {
        self.events.push(ViewEvent::Finished(text.to_string()));
    }

    fn clear_messages(&mut self) {
        self.events.push(ViewEvent::Cleared);
    }

    fn connection_status(&mut self, state: ConnectionState) {
        self.events.push(ViewEvent::Status(state));
    }

    fn streaming_status(&mut self, streaming: bool) {
        self.events.push(ViewEvent::Streaming(streaming));
    }

    fn show_stats(&mut self, snapshot: &Value) {
        self.events.push(ViewEvent::Stats(snapshot.clone()));
    }

    fn notify(&mut self, message: &str) {
        self.events.push(ViewEvent::Notice(message.to_string()));
    }

    fn navigate(&mut self, path: &str) {
        self.events.push(ViewEvent::Navigate(path.to_string()));
    }
}

// --- Fixtures ---

pub fn memory_pool() -> DbPool {
    get_connection(&StorageConfig {
        path: ":memory:".to_string(),
    })
    .unwrap()
}

pub fn endpoint() -> Url {
    Url::parse("ws://localhost:8000/ws/chat").unwrap()
}

pub type TestSession = ChatSession<MockConnector, MockBackend, RecordingView>;

pub fn session_with(
    connector: MockConnector,
    backend: MockBackend,
    pool: DbPool,
    streaming: bool,
) -> TestSession {
    let store = SessionIdStore::load(pool).unwrap();
    let options = SessionOptions {
        endpoint: endpoint(),
        reconnect: ReconnectPolicy::default(),
        streaming,
        greeting: None,
    };
    ChatSession::new(connector, backend, RecordingView::default(), store, options)
}

/// A started session whose socket is already open.
pub async fn open_session(connector: &MockConnector, backend: &MockBackend) -> TestSession {
    let mut session = session_with(connector.clone(), backend.clone(), memory_pool(), true);
    session.start().await;
    connector.emit(SocketEvent::Opened);
    session.drain_events().await;
    assert_eq!(session.connection_state(), ConnectionState::Open);
    session
}
