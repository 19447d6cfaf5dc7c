//! The streaming chat session: one object owning the session id, the CSRF
//! token, the connection manager and the draft, driven by a single event loop.

pub mod commands;
pub mod session_id;
pub mod view;

pub use commands::{ControlCommand, HELP_TEXT};
pub use session_id::{generate_session_id, SessionIdStore, SESSION_KEY};
pub use view::{ChatView, Role};

use serde_json::json;
use tokio::sync::mpsc::{Receiver, UnboundedReceiver};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::models::{ChatRequest, LanguageReply};
use crate::api::models_ws::{WsClientFrame, WsServerFrame};
use crate::api::{ApiError, ChatBackend};
use crate::stream::{
    ConnectionEvent, ConnectionManager, ConnectionState, Connector, ReconnectPolicy, SocketEvent,
    StreamError, TypingBuffer,
};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

const UNAUTHORIZED_TEXT: &str = "No autorizado";
const CLEARED_TEXT: &str = "Contexto limpiado";
const BUSY_TEXT: &str = "Espera a que termine la respuesta actual o cancélala";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub endpoint: Url,
    pub reconnect: ReconnectPolicy,
    /// Prefer the socket for chat turns.
    pub streaming: bool,
    pub greeting: Option<String>,
}

/// How a submitted line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Empty,
    Control,
    Streamed,
    Direct,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Submit(String),
    Cancel,
    ToggleStats,
    Logout,
    Quit,
}

pub struct ChatSession<C: Connector, B: ChatBackend, V: ChatView> {
    session_id: SessionIdStore,
    csrf_token: Option<String>,
    connection: ConnectionManager<C>,
    events: UnboundedReceiver<ConnectionEvent>,
    draft: TypingBuffer,
    streaming: bool,
    streaming_enabled: bool,
    greeting: Option<String>,
    /// Set once the view has been sent elsewhere; the session is over.
    navigation: Option<&'static str>,
    backend: B,
    view: V,
}

impl<C: Connector, B: ChatBackend, V: ChatView> ChatSession<C, B, V> {
    pub fn new(
        connector: C,
        backend: B,
        view: V,
        session_id: SessionIdStore,
        options: SessionOptions,
    ) -> Self {
        let (connection, events) =
            ConnectionManager::new(connector, options.endpoint, options.reconnect);

        Self {
            session_id,
            csrf_token: None,
            connection,
            events,
            draft: TypingBuffer::new(),
            streaming: false,
            streaming_enabled: options.streaming,
            greeting: options.greeting,
            navigation: None,
            backend,
            view,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.current()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn draft(&self) -> &TypingBuffer {
        &self.draft
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Where the session navigated to, if it ended that way.
    pub fn navigation(&self) -> Option<&'static str> {
        self.navigation
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Page-load sequence: session id, CSRF token, socket, greeting.
    pub async fn start(&mut self) {
        self.session_id.ensure(None);
        self.fetch_csrf().await;
        if self.streaming_enabled {
            if let Err(e) = self.ensure_connected() {
                warn!("Streaming unavailable: {}", e);
            }
        }
        if let Some(greeting) = self.greeting.clone() {
            self.view.append_message(Role::Bot, &greeting);
        }
    }

    pub async fn fetch_csrf(&mut self) {
        match self.backend.csrf_token().await {
            Ok(token) => self.csrf_token = Some(token),
            // Requests go out without the header; the server decides.
            Err(e) => debug!("CSRF token unavailable: {}", e),
        }
    }

    pub fn ensure_connected(&mut self) -> Result<bool, StreamError> {
        let opened = self.connection.ensure_connected();
        if let Ok(true) = opened {
            self.view.connection_status(self.connection.state());
        }
        opened
    }

    pub async fn submit(&mut self, text: &str) -> Dispatch {
        let text = text.trim();
        if text.is_empty() {
            return Dispatch::Empty;
        }

        if let Some(command) = ControlCommand::parse(text) {
            self.run_control(command, text).await;
            return Dispatch::Control;
        }

        if self.draft.is_accumulating() {
            self.view.notify(BUSY_TEXT);
            return Dispatch::Busy;
        }

        self.view.append_message(Role::User, text);

        if self.streaming_enabled {
            match self.send_streaming(text) {
                Ok(()) => return Dispatch::Streamed,
                Err(e) => debug!("Streaming unavailable ({}), using plain request", e),
            }
        }

        self.send_direct(text).await;
        Dispatch::Direct
    }

    fn send_streaming(&mut self, text: &str) -> Result<(), StreamError> {
        self.ensure_connected()?;
        let frame = WsClientFrame::message(text, self.session_id.current())
            .to_json()
            .map_err(|e| StreamError::Encode(e.to_string()))?;
        self.connection.send(frame)
    }

    async fn send_direct(&mut self, text: &str) {
        let request = ChatRequest {
            message: text.to_string(),
            session_id: self.session_id.current().map(str::to_string),
        };

        match self.backend.chat(&request, self.csrf_token.as_deref()).await {
            Ok(reply) => {
                self.session_id.ensure(reply.session_id.as_deref());
                self.view.append_message(Role::Bot, &reply.response);
                self.refresh_stats().await;
            }
            Err(ApiError::Unauthorized(message)) => {
                let message = message.as_deref().unwrap_or(UNAUTHORIZED_TEXT);
                self.view.append_message(Role::Bot, message);
                info!("Chat request unauthorized, redirecting to {}", LOGIN_PATH);
                self.navigate(LOGIN_PATH);
            }
            Err(e @ ApiError::Rejected { .. }) => {
                let message = e.server_message().unwrap_or(UNAUTHORIZED_TEXT);
                self.view.append_message(Role::Bot, message);
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.view.notify(&e.to_string());
            }
        }
    }

    async fn run_control(&mut self, command: ControlCommand, text: &str) {
        self.view.append_message(Role::User, text);

        match command {
            ControlCommand::Help => self.view.append_message(Role::Bot, HELP_TEXT),
            ControlCommand::Clear => match self.backend.clear(self.session_id.current()).await {
                Ok(()) => {
                    self.view.clear_messages();
                    self.view.append_message(Role::Bot, CLEARED_TEXT);
                }
                Err(e) => {
                    warn!("Clearing context failed: {}", e);
                    self.view.notify(&e.to_string());
                }
            },
            ControlCommand::Lang(code) => {
                match self
                    .backend
                    .set_language(&code, self.session_id.current())
                    .await
                {
                    Ok(LanguageReply::Changed(language)) => {
                        self.view
                            .append_message(Role::Bot, &format!("Idioma: {}", language));
                    }
                    Ok(LanguageReply::Refused(error)) => {
                        self.view.append_message(Role::Bot, &error);
                    }
                    Err(e) => {
                        warn!("Changing language failed: {}", e);
                        self.view.notify(&e.to_string());
                    }
                }
            }
        }
    }

    /// Asks the server to abort the reply in flight. The draft is only
    /// cleared once the server acknowledges with a `cancelled` frame.
    pub fn cancel(&mut self) -> Result<(), StreamError> {
        if !self.connection.is_open() {
            return Err(StreamError::NotOpen);
        }
        let frame = WsClientFrame::cancel(self.session_id.current())
            .to_json()
            .map_err(|e| StreamError::Encode(e.to_string()))?;
        self.connection.send(frame)
    }

    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        let errored = matches!(
            &event,
            ConnectionEvent::Socket {
                event: SocketEvent::Error(_),
                ..
            }
        );
        let before = self.connection.state();
        let frame = self.connection.on_event(event);
        let after = self.connection.state();
        if before != after || errored {
            self.view.connection_status(after);
        }

        if let Some(raw) = frame {
            self.handle_frame(&raw).await;
        }
    }

    /// Handles every connection event that is already queued.
    pub async fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event).await;
        }
    }

    async fn handle_frame(&mut self, raw: &str) {
        match WsServerFrame::parse(raw) {
            WsServerFrame::Cancelled => {
                let done = self.draft.cancel();
                if done.had_draft {
                    self.view.finish_draft(&done.text);
                }
                self.set_streaming(false);
            }
            WsServerFrame::Partial { delta } => {
                let text = self.draft.push(&delta);
                self.view.render_draft(text);
                self.set_streaming(true);
            }
            WsServerFrame::Final { response } => {
                let done = self.draft.finalize(&response);
                if done.had_draft {
                    self.view.finish_draft(&done.text);
                } else if !done.text.is_empty() {
                    self.view.append_message(Role::Bot, &done.text);
                }
                self.set_streaming(false);
                self.refresh_stats().await;
            }
            WsServerFrame::Plain {
                response,
                session_id,
            } => {
                if let Some(id) = session_id {
                    self.session_id.ensure(Some(id.as_str()));
                }
                self.view.append_message(Role::Bot, &response);
                self.refresh_stats().await;
            }
            WsServerFrame::Unknown(raw) => {
                debug!("Ignoring unrecognized frame: {}", raw);
            }
        }
    }

    fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
        self.view.streaming_status(streaming);
    }

    /// Fetches server stats and this session's context and renders both.
    pub async fn refresh_stats(&mut self) {
        let session_id = self.session_id.current().map(str::to_string);
        let backend = &self.backend;

        let (stats, context) = tokio::join!(backend.stats(), async {
            match session_id.as_deref() {
                Some(id) => backend.context(id).await,
                None => Ok(json!({})),
            }
        });

        match (stats, context) {
            (Ok(stats), Ok(context)) => {
                self.view
                    .show_stats(&json!({ "stats": stats, "context": context }));
            }
            (Err(e), _) | (_, Err(e)) => debug!("Stats refresh failed: {}", e),
        }
    }

    pub async fn logout(&mut self) -> Result<(), ApiError> {
        self.backend.logout().await?;
        self.session_id.clear();
        self.navigate(HOME_PATH);
        Ok(())
    }

    fn navigate(&mut self, path: &'static str) {
        self.navigation = Some(path);
        self.view.navigate(path);
    }

    /// Event loop: socket events and user actions, one at a time.
    pub async fn run(&mut self, mut input: Receiver<UserAction>) {
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.handle_event(event).await,
                action = input.recv() => match action {
                    Some(UserAction::Submit(text)) => {
                        self.submit(&text).await;
                    }
                    Some(UserAction::Cancel) => {
                        if let Err(e) = self.cancel() {
                            self.view.notify(&e.to_string());
                        }
                    }
                    Some(UserAction::ToggleStats) => {
                        if self.view.toggle_stats() {
                            self.refresh_stats().await;
                        }
                    }
                    Some(UserAction::Logout) => {
                        if let Err(e) = self.logout().await {
                            self.view.notify(&e.to_string());
                        }
                    }
                    Some(UserAction::Quit) | None => break,
                },
            }
            if let Some(path) = self.navigation {
                debug!("Leaving chat for {}", path);
                break;
            }
        }
        info!("Chat session {:?} finished", self.session_id.current());
    }
}
