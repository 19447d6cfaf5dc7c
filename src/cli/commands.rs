use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lucy-client", version, about = "Lucy chat client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter the interactive streaming chat
    Chat {
        /// Always use plain HTTP requests instead of the WebSocket stream
        #[arg(long)]
        no_stream: bool,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Date of birth as YYYY-MM-DD
        #[arg(long)]
        dob: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign in and keep the session cookie
    Login {
        /// Email or username
        #[arg(short, long)]
        identifier: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session id
    Logout,

    /// Print server statistics
    Stats,

    /// Print the server-side context of the current session
    Context,

    /// Inspect the locally stored session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the stored session id and local storage contents
    Show,

    /// Forget the stored session id; a new one is generated on next chat
    Reset,
}
