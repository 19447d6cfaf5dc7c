use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub session_id: Option<String>,
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct CsrfReply {
    pub csrf_token: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ErrorBody {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LanguageBody {
    pub language: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageReply {
    Changed(String),
    Refused(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}
