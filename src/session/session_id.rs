use chrono::Utc;
use tracing::{info, warn};

use crate::db::{service::DbService, DbPool};

pub const SESSION_KEY: &str = "lucy_session_id";

pub fn generate_session_id() -> String {
    format!("web_{}", Utc::now().timestamp_millis())
}

/// The conversation id, mirrored into local storage.
pub struct SessionIdStore {
    pool: DbPool,
    current: Option<String>,
}

impl SessionIdStore {
    pub fn load(pool: DbPool) -> Result<Self, duckdb::Error> {
        let current = {
            let conn = pool.lock().unwrap_or_else(|e| e.into_inner());
            DbService::get_item(&conn, SESSION_KEY)?
        };
        Ok(Self { pool, current })
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Makes sure an id exists. A missing id is taken from `assigned` or
    /// generated; a server-assigned id that differs from the held one wins.
    pub fn ensure(&mut self, assigned: Option<&str>) -> &str {
        let assigned = assigned.filter(|id| !id.is_empty());
        let next = match (&self.current, assigned) {
            (None, Some(id)) => Some(id.to_string()),
            (None, None) => Some(generate_session_id()),
            (Some(held), Some(id)) if held != id => Some(id.to_string()),
            _ => None,
        };

        if let Some(id) = next {
            info!("Using session {}", id);
            self.persist(&id);
            self.current = Some(id);
        }
        self.current.as_deref().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.current = None;
        let conn = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = DbService::remove_item(&conn, SESSION_KEY) {
            warn!("Failed to clear stored session id: {}", e);
        }
    }

    fn persist(&self, id: &str) {
        let conn = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = DbService::set_item(&conn, SESSION_KEY, id) {
            warn!("Failed to persist session id: {}", e);
        }
    }
}
