//! Process configuration, read from the environment after `.env` is loaded.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    /// Emails that get the admin role when they sign up.
    pub admin_emails: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let bind = var_or("BIND_ADDR", "127.0.0.1:3000");
        let bind_addr = bind
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {bind}"))?;

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://./budget_tracker.db?mode=rwc"),
            bind_addr,
            storage_root: PathBuf::from(var_or("STORAGE_ROOT", "./storage")),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://127.0.0.1:3000"),
            admin_emails: parse_list(&var_or("ADMIN_EMAILS", "")),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: var_or("API_URL", "http://127.0.0.1:3000"),
            session_file: PathBuf::from(var_or("SESSION_FILE", "./.budget_session.json")),
            log_file: PathBuf::from(var_or("LOG_FILE", "./budget_tracker.log")),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
