use serde_json::Value;

use crate::stream::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// Where the session renders its observable effects.
pub trait ChatView {
    fn append_message(&mut self, role: Role, text: &str);

    /// Re-renders the in-progress reply with its full current text.
    fn render_draft(&mut self, text: &str);

    /// Replaces the in-progress reply with `text` and marks it complete.
    fn finish_draft(&mut self, text: &str);

    fn clear_messages(&mut self);

    fn connection_status(&mut self, state: ConnectionState);

    fn streaming_status(&mut self, streaming: bool);

    fn show_stats(&mut self, snapshot: &Value);

    /// Flips the stats panel; returns whether it is now visible.
    fn toggle_stats(&mut self) -> bool {
        true
    }

    /// Transient notice (toast / alert).
    fn notify(&mut self, message: &str);

    /// Hard navigation away from the chat, e.g. to `/login`.
    fn navigate(&mut self, path: &str);
}
