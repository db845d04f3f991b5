use crate::backup::{self, InvalidBundle};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{path_param, school_err};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn backup_err(req: &Request, e: anyhow::Error) -> serde_json::Value {
    let code = if InvalidBundle::is_cause_of(&e) {
        "invalid_bundle"
    } else {
        "io_failed"
    };
    err(&req.id, code, format!("{e:#}"), None)
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match path_param(req, "outPath") {
        Ok(p) => p,
        Err(e) => return school_err(req, e),
    };
    match backup::export_workspace_bundle(&workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({ "path": out_path.to_string_lossy(), "summary": summary }),
        ),
        Err(e) => backup_err(req, e),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let in_path = match path_param(req, "inPath") {
        Ok(p) => p,
        Err(e) => return school_err(req, e),
    };
    match backup::import_workspace_bundle(&in_path, &workspace) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary })),
        Err(e) => backup_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_export(state, req)),
        "backup.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
