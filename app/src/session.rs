use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

/// The opaque token handed out by the backend at login.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

/// Keeps the current session in a small JSON file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn login(&self, username: &str, token: &str) -> Result<Session> {
        let session = Session {
            token: token.to_string(),
            username: username.to_string(),
            issued_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&session).context("encode session")?;
        fs::write(&self.path, json)
            .with_context(|| format!("write session to {:?}", self.path))?;
        info!("Logged in as {}", username);
        Ok(session)
    }

    pub fn current(&self) -> Result<Option<Session>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read session from {:?}", self.path))
            }
        };
        let session = serde_json::from_str(&json)
            .with_context(|| format!("decode session from {:?}", self.path))?;
        Ok(Some(session))
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.current()?.map(|s| s.token))
    }

    /// Forgets the token. Returns whether there was one.
    pub fn logout(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Logged out");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("remove session {:?}", self.path)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn store(name: &str) -> SessionStore {
        let path = std::env::temp_dir().join(format!(
            "backoffice-session-{}-{}.json",
            std::process::id(),
            name
        ));
        let _ = fs::remove_file(&path);
        SessionStore::new(path)
    }

    #[test]
    fn no_session_before_login() {
        let store = store("fresh");
        assert_eq!(store.current().expect("current"), None);
        assert_eq!(store.logout().expect("logout"), false);
    }

    #[test]
    fn login_then_logout() {
        env_logger::try_init().unwrap_or_default();
        let store = store("cycle");
        let session = store.login("asha", "tok-123").expect("login");
        assert_eq!(store.current().expect("current"), Some(session));
        assert_eq!(store.token().expect("token").as_deref(), Some("tok-123"));

        assert!(store.logout().expect("logout"));
        assert_eq!(store.token().expect("token"), None);
    }

    #[test]
    fn corrupt_session_files_are_errors() {
        let store = store("corrupt");
        fs::write(store.path(), "not json").expect("write");
        assert!(store.current().is_err());
        store.logout().expect("logout");
    }
}
