use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_GREETING: &str = "Hola, soy Lucy. Tu asistente de I.A de escritorio. Puedo conversar, mantener contexto y ayudarte con funciones del sistema. ¿En qué puedo ayudarte hoy?";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    pub enabled: bool,
    pub endpoint_path: String,
    pub reconnect_delay_ms: u64,
    /// Unset means reconnect forever.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub greeting: String,
    pub show_stats: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub stream: StreamConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("server.base_url", "http://127.0.0.1:8000")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("storage.path", "lucy_client.duckdb")?
            .set_default("stream.enabled", true)?
            .set_default("stream.endpoint_path", "/ws/chat")?
            .set_default("stream.reconnect_delay_ms", 1500)?
            .set_default("chat.greeting", DEFAULT_GREETING)?
            .set_default("chat.show_stats", false)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LUCY").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${LUCY_SERVER}
        app_config.server.base_url = expand_env(&app_config.server.base_url);
        app_config.storage.path = expand_env(&app_config.storage.path);

        Ok(app_config)
    }
}

fn expand_env(val: &str) -> String {
    if val.starts_with("${") && val.ends_with('}') {
        let var_name = &val[2..val.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else {
        val.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load("does-not-exist.yaml").unwrap();
        assert_eq!(config.stream.endpoint_path, "/ws/chat");
        assert_eq!(config.stream.reconnect_delay(), Duration::from_millis(1500));
        assert!(config.stream.max_reconnect_attempts.is_none());
    }

    #[test]
    fn test_expand_env() {
        std::env::set_var("LUCY_TEST_EXPAND", "http://example.test");
        assert_eq!(expand_env("${LUCY_TEST_EXPAND}"), "http://example.test");
        assert_eq!(expand_env("plain"), "plain");
        assert_eq!(expand_env("${LUCY_TEST_MISSING_VAR}"), "");
    }
}
