use crate::error::{SchoolError, SchoolResult};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{self, Fields};
use crate::repo::SchoolRepository;
use tracing::warn;

pub fn fields(req: &Request) -> Fields<'_> {
    Fields(&req.params)
}

/// Required integer id parameter, coerced the same way as form fields.
pub fn id_param(req: &Request, key: &str) -> SchoolResult<i64> {
    match req.params.get(key) {
        Some(v) if !v.is_null() => model::parse_int(key, v),
        _ => Err(SchoolError::validation(key, "missing value")),
    }
}

pub fn path_param(req: &Request, key: &str) -> SchoolResult<std::path::PathBuf> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(std::path::PathBuf::from)
        .ok_or_else(|| SchoolError::validation(key, "missing path"))
}

/// Zero affected rows means the target id was not there.
pub fn require_affected(affected: usize, entity: &'static str, id: i64) -> SchoolResult<()> {
    if affected == 0 {
        return Err(SchoolError::not_found(entity, id));
    }
    Ok(())
}

pub fn school_err(req: &Request, e: SchoolError) -> serde_json::Value {
    warn!(method = %req.method, code = e.code(), "{e}");
    err(&req.id, e.code(), e.to_string(), e.details())
}

/// Runs `f` against the open workspace and renders the outcome.
pub fn with_repo(
    state: &AppState,
    req: &Request,
    f: impl FnOnce(&SchoolRepository) -> SchoolResult<serde_json::Value>,
) -> serde_json::Value {
    let Some(repo) = state.repo.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(repo) {
        Ok(result) => ok(&req.id, result),
        Err(e) => school_err(req, e),
    }
}
