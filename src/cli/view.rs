use serde_json::Value;
use std::io::{self, Write};

use crate::session::{ChatView, Role, LOGIN_PATH};
use crate::stream::ConnectionState;

/// Renders the chat transcript on stdout.
pub struct TerminalView {
    stats_visible: bool,
    streaming: bool,
    /// Draft text already printed, so growth is printed as a suffix.
    printed_draft: Option<String>,
}

impl TerminalView {
    pub fn new(stats_visible: bool) -> Self {
        Self {
            stats_visible,
            streaming: false,
            printed_draft: None,
        }
    }

    fn prompt(&self) {
        print!("\nUser> ");
        let _ = io::stdout().flush();
    }
}

impl ChatView for TerminalView {
    fn append_message(&mut self, role: Role, text: &str) {
        match role {
            // The user's own line is already on screen.
            Role::User => {}
            Role::Bot => {
                println!("\nLucy> {}", text);
                self.prompt();
            }
        }
    }

    fn render_draft(&mut self, text: &str) {
        match &self.printed_draft {
            Some(printed) if text.starts_with(printed.as_str()) => {
                print!("{}", &text[printed.len()..]);
            }
            _ => print!("\nLucy> {}", text),
        }
        let _ = io::stdout().flush();
        self.printed_draft = Some(text.to_string());
    }

    fn finish_draft(&mut self, text: &str) {
        match self.printed_draft.take() {
            Some(printed) if text.starts_with(printed.as_str()) => {
                println!("{}", &text[printed.len()..]);
            }
            Some(_) if text.is_empty() => println!(" [cancelado]"),
            _ => println!("\nLucy> {}", text),
        }
        self.prompt();
    }

    fn clear_messages(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    fn connection_status(&mut self, state: ConnectionState) {
        eprintln!("[WS: {}]", state);
    }

    fn streaming_status(&mut self, streaming: bool) {
        if streaming && !self.streaming {
            eprintln!("\n[/cancel para detener la respuesta]");
        }
        self.streaming = streaming;
    }

    fn show_stats(&mut self, snapshot: &Value) {
        if !self.stats_visible {
            return;
        }
        match serde_json::to_string_pretty(snapshot) {
            Ok(text) => println!("\n{}", text),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    fn toggle_stats(&mut self) -> bool {
        self.stats_visible = !self.stats_visible;
        self.stats_visible
    }

    fn notify(&mut self, message: &str) {
        eprintln!("! {}", message);
    }

    fn navigate(&mut self, path: &str) {
        if path == LOGIN_PATH {
            eprintln!("! Sesión no válida: ejecuta `lucy-client login` y vuelve a entrar.");
        }
    }
}
