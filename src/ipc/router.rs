use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

/// Methods reachable before login.
const OPEN_METHODS: &[&str] = &["health", "auth.login"];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if state.is_locked() && !OPEN_METHODS.contains(&req.method.as_str()) {
        return err(&req.id, "unauthenticated", "log in first", None);
    }

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::teachers::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::fees::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::performance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::backup::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
