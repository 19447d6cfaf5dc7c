pub mod client;
pub mod models;
pub mod models_ws;

pub use client::{ApiClient, ApiError, ChatBackend};
