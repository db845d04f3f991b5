use crate::ipc::helpers::{fields, id_param, require_affected, with_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "students.list" => with_repo(state, req, |repo| {
            Ok(json!({ "students": repo.list_students()? }))
        }),
        "students.create" => with_repo(state, req, |repo| {
            let student = Student::from_fields(fields(req))?;
            let id = repo.add_student(&student)?;
            Ok(json!({ "studentId": id }))
        }),
        "students.update" => with_repo(state, req, |repo| {
            let id = id_param(req, "studentId")?;
            let student = Student::from_fields(fields(req))?;
            require_affected(repo.update_student(id, &student)?, "student", id)?;
            Ok(json!({ "studentId": id }))
        }),
        "students.delete" => with_repo(state, req, |repo| {
            let id = id_param(req, "studentId")?;
            require_affected(repo.delete_student(id)?, "student", id)?;
            Ok(json!({ "deleted": id }))
        }),
        _ => return None,
    };
    Some(resp)
}
