use crate::WatcherError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One watched careers page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSource {
    pub url: String,
    pub company: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub jobs: Vec<JobSource>,
}

impl WatcherConfig {
    pub fn from_json(s: &str) -> Result<WatcherConfig, WatcherError> {
        Ok(serde_json::from_str(s)?)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<WatcherConfig, WatcherError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }
}

const DEFAULT_DATABASE: &str = "seen_jobs.db";

/// Secrets and locations provided by the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Settings {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env loaded: {}", e);
        }

        Settings {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            telegram_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
        }
    }

    pub fn telegram(&self) -> Result<(&str, &str), WatcherError> {
        let token = self
            .telegram_token
            .as_deref()
            .ok_or(WatcherError::MissingEnv("TELEGRAM_BOT_TOKEN"))?;
        let chat_id = self
            .telegram_chat_id
            .as_deref()
            .ok_or(WatcherError::MissingEnv("TELEGRAM_CHAT_ID"))?;
        Ok((token, chat_id))
    }
}
