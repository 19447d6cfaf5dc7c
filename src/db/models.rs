use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StoredItem {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
