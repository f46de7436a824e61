//! Client side of WorkPilot: HTTP access to the API, the persisted session, and the
//! dashboard state (task list, filter, edit modal, notifications).

use std::path::PathBuf;

use thiserror::Error;

pub mod api;
pub mod dashboard;
pub mod filter;
pub mod session;

pub use api::ApiClient;
pub use dashboard::{Dashboard, Modal, Notice, NoticeKind};
pub use filter::{TaskFilter, TaskStats};
pub use session::{Profile, Session, SessionStore};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with `success: false` or a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session file {}: {source}", path.display())]
    Session {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not logged in")]
    NotLoggedIn,
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}
