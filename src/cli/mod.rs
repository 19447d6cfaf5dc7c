pub mod commands;
pub mod view;

use anyhow::{Context, Result};
use chrono::Local;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, Sender};
use url::Url;

use crate::api::{ApiClient, ChatBackend};
use crate::cli::commands::{Commands, SessionAction};
use crate::cli::view::TerminalView;
use crate::config::AppConfig;
use crate::db::{get_connection, service::DbService, DbPool};
use crate::forms::{self, FormOutcome, LoginForm, RegistrationForm};
use crate::session::{ChatSession, SessionIdStore, SessionOptions, UserAction, HOME_PATH};
use crate::stream::{endpoint_for, ReconnectPolicy, TungsteniteConnector};

pub const COOKIE_KEY: &str = "lucy_cookies";

pub async fn run_cli(command: Commands, config_path: String) -> Result<()> {
    let config = AppConfig::load(&config_path).context("Failed to load config")?;
    let pool = get_connection(&config.storage).context("Failed to open local storage")?;

    let base_url = Url::parse(&config.server.base_url)
        .with_context(|| format!("Invalid server.base_url {}", config.server.base_url))?;
    let client = ApiClient::new(
        base_url,
        Duration::from_secs(config.server.request_timeout_secs),
    )?;
    restore_cookies(&pool, &client);

    match command {
        Commands::Chat { no_stream } => {
            run_repl(config, pool, client, !no_stream).await?;
        }
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            dob,
            password,
        } => {
            let form = RegistrationForm {
                username,
                email,
                first_name,
                last_name,
                dob,
                password: read_secret(password)?,
            };
            let csrf = client.csrf_token().await.ok();
            let today = Local::now().date_naive();
            let outcome =
                forms::submit_registration(&client, &form, csrf.as_deref(), today).await;
            report(outcome, "Registro completado");
        }
        Commands::Login {
            identifier,
            password,
        } => {
            let form = LoginForm {
                identifier,
                password: read_secret(password)?,
            };
            let csrf = client.csrf_token().await.ok();
            let outcome = forms::submit_login(&client, &form, csrf.as_deref()).await;
            if matches!(outcome, FormOutcome::Accepted { .. }) {
                save_cookies(&pool, &client);
            }
            report(outcome, "Sesión iniciada");
        }
        Commands::Logout => {
            client.logout().await?;
            SessionIdStore::load(pool.clone())?.clear();
            forget_cookies(&pool);
            println!("Sesión cerrada.");
        }
        Commands::Stats => {
            let stats = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Context => {
            let store = SessionIdStore::load(pool.clone())?;
            match store.current() {
                Some(id) => {
                    let context = client.context(id).await?;
                    println!("{}", serde_json::to_string_pretty(&context)?);
                }
                None => println!("No session stored yet."),
            }
        }
        Commands::Session { action } => match action {
            SessionAction::Show => {
                let conn = pool.lock().unwrap_or_else(|e| e.into_inner());
                let items = DbService::list_items(&conn)?;
                if items.is_empty() {
                    println!("Local storage is empty.");
                } else {
                    println!("{:<20} | {:<26} | {}", "Key", "Updated At", "Value");
                    println!("{:-<20}-+-{:-<26}-+-{:-<20}", "", "", "");
                    for item in items {
                        println!("{:<20} | {:<26} | {}", item.key, item.updated_at, item.value);
                    }
                }
            }
            SessionAction::Reset => {
                SessionIdStore::load(pool.clone())?.clear();
                println!("Stored session id removed.");
            }
        },
    }

    Ok(())
}

async fn run_repl(
    config: AppConfig,
    pool: DbPool,
    client: ApiClient,
    streaming: bool,
) -> Result<()> {
    let endpoint = endpoint_for(client.base_url(), &config.stream.endpoint_path)?;
    let store = SessionIdStore::load(pool.clone())?;

    let options = SessionOptions {
        endpoint,
        reconnect: ReconnectPolicy {
            delay: config.stream.reconnect_delay(),
            max_attempts: config.stream.max_reconnect_attempts,
        },
        streaming: streaming && config.stream.enabled,
        greeting: Some(config.chat.greeting.clone()),
    };

    let view = TerminalView::new(config.chat.show_stats);
    let mut session = ChatSession::new(TungsteniteConnector::new(), client, view, store, options);

    println!("--- Lucy Terminal Chat ---");
    println!("Server: {}", config.server.base_url);
    println!("Commands: /help /clear /lang <code> /cancel /stats /logout /exit");
    println!("--------------------------");

    session.start().await;
    if let Some(id) = session.session_id() {
        eprintln!("[Sesión: {}]", id);
    }

    let (tx, rx) = mpsc::channel::<UserAction>(32);
    tokio::spawn(read_input(tx));

    session.run(rx).await;

    if session.navigation() == Some(HOME_PATH) {
        forget_cookies(&pool);
    }
    Ok(())
}

async fn read_input(tx: Sender<UserAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let action = match line.trim() {
            "/exit" | "/quit" => UserAction::Quit,
            "/cancel" => UserAction::Cancel,
            "/stats" => UserAction::ToggleStats,
            "/logout" => UserAction::Logout,
            _ => UserAction::Submit(line),
        };
        let quit = action == UserAction::Quit;
        if tx.send(action).await.is_err() || quit {
            break;
        }
    }
}

fn read_secret(value: Option<String>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn report(outcome: FormOutcome, success: &str) {
    match outcome {
        FormOutcome::Invalid(errors) => {
            for (field, message) in errors.iter() {
                eprintln!("{}: {}", field, message);
            }
        }
        FormOutcome::Rejected(message) => eprintln!("Error: {}", message),
        FormOutcome::Accepted { next } => println!("{} (siguiente: {})", success, next),
    }
}

fn restore_cookies(pool: &DbPool, client: &ApiClient) {
    let conn = pool.lock().unwrap_or_else(|e| e.into_inner());
    if let Ok(Some(header)) = DbService::get_item(&conn, COOKIE_KEY) {
        client.import_cookies(&header);
    }
}

fn save_cookies(pool: &DbPool, client: &ApiClient) {
    if let Some(header) = client.export_cookies() {
        let conn = pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = DbService::set_item(&conn, COOKIE_KEY, &header) {
            tracing::warn!("Failed to persist cookies: {}", e);
        }
    }
}

fn forget_cookies(pool: &DbPool) {
    let conn = pool.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = DbService::remove_item(&conn, COOKIE_KEY) {
        tracing::warn!("Failed to forget cookies: {}", e);
    }
}
