//! Client-side session: persisted across restarts, changes broadcast on a
//! watch channel so the app can react to sign-in and sign-out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::database::models::Session;

pub struct SessionStore {
    path: PathBuf,
    tx: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Restores the session saved at `path`, if any. An unreadable file is
    /// treated as signed out.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let saved = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Session>(&raw).ok());
        if saved.is_some() {
            tracing::debug!(path = %path.display(), "restored saved session");
        }
        let (tx, _rx) = watch::channel(saved);
        Self { path, tx }
    }

    pub fn get_session(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn set(&self, session: Option<Session>) -> Result<()> {
        match &session {
            Some(s) => {
                let raw = serde_json::to_string_pretty(s)?;
                std::fs::write(&self.path, raw)
                    .with_context(|| format!("cannot save session to {}", self.path.display()))?;
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        self.tx.send_replace(session);
        Ok(())
    }
}
