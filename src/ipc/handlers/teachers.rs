use crate::ipc::helpers::{fields, id_param, require_affected, with_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::Teacher;
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "teachers.list" => with_repo(state, req, |repo| {
            Ok(json!({ "teachers": repo.list_teachers()? }))
        }),
        "teachers.create" => with_repo(state, req, |repo| {
            let teacher = Teacher::from_fields(fields(req))?;
            let id = repo.add_teacher(&teacher)?;
            Ok(json!({ "teacherId": id }))
        }),
        "teachers.update" => with_repo(state, req, |repo| {
            let id = id_param(req, "teacherId")?;
            let teacher = Teacher::from_fields(fields(req))?;
            require_affected(repo.update_teacher(id, &teacher)?, "teacher", id)?;
            Ok(json!({ "teacherId": id }))
        }),
        "teachers.delete" => with_repo(state, req, |repo| {
            let id = id_param(req, "teacherId")?;
            require_affected(repo.delete_teacher(id)?, "teacher", id)?;
            Ok(json!({ "deleted": id }))
        }),
        _ => return None,
    };
    Some(resp)
}
