use crate::auth::Credentials;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::repo::SchoolRepository;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "dbPath": state.repo.as_ref().map(|r| r.db_path().to_string_lossy().to_string()),
            "loginRequired": state.is_locked(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SchoolRepository::open_workspace(&path) {
        Ok(repo) => {
            state.workspace = Some(path.clone());
            state.repo = Some(repo);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(auth) = state.auth.as_ref() else {
        return ok(&req.id, json!({ "authenticated": true }));
    };
    let creds: Credentials = match serde_json::from_value(req.params.clone()) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if auth.authenticate(&creds) {
        info!(user = %creds.username, "login accepted");
        state.authenticated = true;
        ok(&req.id, json!({ "authenticated": true }))
    } else {
        warn!(user = %creds.username, "login rejected");
        err(&req.id, "bad_credentials", "wrong username or password", None)
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        _ => None,
    }
}
