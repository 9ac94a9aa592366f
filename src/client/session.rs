//! Client-side session persisted as `{token, ...user}` JSON.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::auth::token::peek_expiry;
use crate::entity::{AuthResponse, UserProfile};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub token: String,
    pub user: UserProfile,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ActiveSession {
    fn from_response(response: AuthResponse) -> Self {
        Self {
            expires_at: peek_expiry(&response.token),
            token: response.token,
            user: response.user,
        }
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// `LoggedOut -> Active -> (LoggedOut | Expired)`
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    LoggedOut,
    Active(ActiveSession),
    Expired,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    path: Option<PathBuf>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session that lives only in memory.
    pub fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
            path: None,
        }
    }

    /// Restore a session from `path` if one was saved there.
    pub fn restore(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let stored: AuthResponse = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            let active = ActiveSession::from_response(stored);
            if active.is_expired_at(Utc::now()) {
                SessionState::Expired
            } else {
                SessionState::Active(active)
            }
        } else {
            SessionState::LoggedOut
        };

        let mut session = Self {
            state,
            path: Some(path),
        };
        if session.state == SessionState::Expired {
            session.forget()?;
        }
        Ok(session)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Active(active) => Some(&active.user),
            _ => None,
        }
    }

    /// Bearer token for the next request. Ages out a session whose token
    /// has passed its expiry.
    pub fn bearer(&mut self) -> Result<Option<String>> {
        self.bearer_at(Utc::now())
    }

    pub fn bearer_at(&mut self, now: DateTime<Utc>) -> Result<Option<String>> {
        if matches!(&self.state, SessionState::Active(a) if a.is_expired_at(now)) {
            self.expire()?;
            return Ok(None);
        }
        match &self.state {
            SessionState::Active(active) => Ok(Some(active.token.clone())),
            _ => Ok(None),
        }
    }

    /// Enter `Active` with a fresh auth response and save it.
    pub fn activate(&mut self, response: AuthResponse) -> Result<()> {
        if let Some(path) = &self.path {
            write_file(path, &response)?;
        }
        self.state = SessionState::Active(ActiveSession::from_response(response));
        Ok(())
    }

    /// The server rejected the token.
    pub fn expire(&mut self) -> Result<()> {
        if self.is_active() {
            tracing::info!("session expired");
        }
        self.state = SessionState::Expired;
        self.forget()
    }

    pub fn logout(&mut self) -> Result<()> {
        self.state = SessionState::LoggedOut;
        self.forget()
    }

    fn forget(&self) -> Result<()> {
        match &self.path {
            Some(path) if path.exists() => Ok(std::fs::remove_file(path)?),
            _ => Ok(()),
        }
    }
}

fn write_file(path: &Path, response: &AuthResponse) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(response)?)?;
    Ok(())
}
