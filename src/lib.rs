pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod forms;
pub mod session;
pub mod stream;
