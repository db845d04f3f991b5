use crate::export;
use crate::ipc::helpers::{id_param, path_param, with_repo};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.exportCsv" => Some(with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            let out_path = path_param(req, "outPath")?;
            let report = repo.generate_performance_report(student_id)?;
            export::write_report_csv(&out_path, student_id, &report)?;
            Ok(json!({
                "studentId": student_id,
                "path": out_path.to_string_lossy(),
                "rows": report.len(),
            }))
        })),
        _ => None,
    }
}
