pub const HELP_TEXT: &str = "Comandos: /help (ayuda), /clear (limpiar contexto), /lang es|en (cambiar idioma)";

/// Slash commands answered over plain HTTP, never over the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Help,
    Clear,
    Lang(String),
}

impl ControlCommand {
    /// Prefix match, as typed: `/helpme` is still help, `/lang` needs a space.
    pub fn parse(text: &str) -> Option<Self> {
        if text.starts_with("/help") {
            Some(ControlCommand::Help)
        } else if text.starts_with("/clear") {
            Some(ControlCommand::Clear)
        } else if text.starts_with("/lang ") {
            let code = text.split_whitespace().nth(1).unwrap_or_default();
            Some(ControlCommand::Lang(code.to_string()))
        } else {
            None
        }
    }
}
