use crate::db::models::StoredItem;
use duckdb::{params, Connection, Result as DbResult, Row};

pub struct DbService;

impl DbService {
    fn row_to_item(row: &Row) -> DbResult<StoredItem> {
        Ok(StoredItem {
            key: row.get::<_, String>(0)?,
            value: row.get::<_, String>(1)?,
            updated_at: row.get::<_, String>(2)?,
        })
    }

    pub fn get_item(conn: &Connection, key: &str) -> DbResult<Option<String>> {
        let mut stmt = conn.prepare("SELECT value FROM local_storage WHERE key = ?")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn set_item(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO local_storage (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_item(conn: &Connection, key: &str) -> DbResult<()> {
        conn.execute("DELETE FROM local_storage WHERE key = ?", params![key])?;
        Ok(())
    }

    pub fn list_items(conn: &Connection) -> DbResult<Vec<StoredItem>> {
        // Timestamps are read back as text; we do not enable duckdb's chrono feature.
        let mut stmt = conn.prepare(
            "SELECT key, value, CAST(updated_at AS VARCHAR) FROM local_storage ORDER BY key ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}
