use crate::ipc::helpers::{fields, id_param, with_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::Performance;
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "performance.add" => with_repo(state, req, |repo| {
            let p = Performance::from_fields(fields(req))?;
            let id = repo.add_performance(&p)?;
            Ok(json!({ "performanceId": id, "grade": p.calculate_grade() }))
        }),
        "performance.list" => with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            let rows: Vec<_> = repo
                .list_performance_for_student(student_id)?
                .iter()
                .map(|row| {
                    let mut v = json!(row);
                    v["grade"] = json!(row.record.calculate_grade());
                    v
                })
                .collect();
            Ok(json!({ "studentId": student_id, "performance": rows }))
        }),
        "performance.report" => with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            Ok(json!({
                "studentId": student_id,
                "lines": repo.generate_performance_report(student_id)?,
            }))
        }),
        _ => return None,
    };
    Some(resp)
}
