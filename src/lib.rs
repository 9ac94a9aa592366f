pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod pdf;
pub mod planner;
pub mod service;
pub mod storage;

pub use api::AppState;
pub use client::ApiClient;
pub use config::Config;
pub use error::{IonixError, Result};
pub use storage::SqliteStore;
