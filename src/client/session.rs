use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{api::ApiClient, ClientError};
use crate::auth::dto::PublicUser;

/// Cached display profile, as shown in the header without a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl From<&PublicUser> for Profile {
    fn from(u: &PublicUser) -> Self {
        let name = if u.name.trim().is_empty() {
            "User".to_string()
        } else {
            u.name.clone()
        };
        Self {
            avatar: avatar_url(&name),
            name,
            email: u.email.clone(),
        }
    }
}

pub fn avatar_url(name: &str) -> String {
    Url::parse_with_params(
        "https://ui-avatars.com/api/",
        &[("name", name), ("background", "random")],
    )
    .map(String::from)
    .unwrap_or_default()
}

/// Everything the client keeps between runs. Serialized under the same keys the web
/// client used in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "currentUser")]
    pub user: Profile,
}

impl Session {
    pub fn new(token: String, user: &PublicUser) -> Self {
        Self {
            token,
            user_id: user.id,
            user: Profile::from(user),
        }
    }
}

/// File-backed session storage. Loaded once at startup and written back explicitly.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/workpilot/session.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("workpilot").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ClientError {
        ClientError::Session {
            path: self.path.clone(),
            source,
        }
    }

    /// Missing or unreadable content yields `None`; only I/O failures are errors.
    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "ignoring malformed session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let body = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, body).map_err(|e| self.io_err(e))
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Loads the stored session and checks its token against `/api/user/me`. A rejected
    /// token clears the store; transport failures are returned without touching it.
    pub async fn restore(&self, api: &mut ApiClient) -> Result<Option<Session>, ClientError> {
        let Some(mut session) = self.load()? else {
            return Ok(None);
        };
        api.set_token(Some(session.token.clone()));

        match api.me().await {
            Ok(user) => {
                session.user_id = user.id;
                session.user = Profile::from(&user);
                self.save(&session)?;
                info!(user_id = %session.user_id, "session restored");
                Ok(Some(session))
            }
            Err(ClientError::Api { status, message }) => {
                warn!(status, %message, "stored session rejected");
                api.set_token(None);
                self.clear()?;
                Ok(None)
            }
            Err(e) => {
                api.set_token(None);
                Err(e)
            }
        }
    }
}
