use crate::calc;
use crate::ipc::helpers::{fields, id_param, with_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceRecord;
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "attendance.add" => with_repo(state, req, |repo| {
            let rec = AttendanceRecord::from_fields(fields(req))?;
            let id = repo.add_attendance(&rec)?;
            Ok(json!({ "attendanceId": id }))
        }),
        "attendance.list" => with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            Ok(json!({
                "studentId": student_id,
                "records": repo.list_attendance_for_student(student_id)?,
            }))
        }),
        "attendance.percentage" => with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            let (present, total) = repo.attendance_counts(student_id)?;
            let percent = calc::attendance_percentage(present, total);
            Ok(json!({
                "studentId": student_id,
                "present": present,
                "total": total,
                "percent": percent,
                "display": format!("{:.2}%", calc::round_off_2_decimals(percent)),
            }))
        }),
        _ => return None,
    };
    Some(resp)
}
