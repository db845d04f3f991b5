use std::path::PathBuf;

use serde::Deserialize;

use crate::auth::Authenticator;
use crate::repo::SchoolRepository;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub repo: Option<SchoolRepository>,
    /// `None` disables the login gate.
    pub auth: Option<Box<dyn Authenticator>>,
    pub authenticated: bool,
}

impl AppState {
    pub fn new(auth: Option<Box<dyn Authenticator>>) -> Self {
        Self {
            workspace: None,
            repo: None,
            auth,
            authenticated: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.auth.is_some() && !self.authenticated
    }
}
