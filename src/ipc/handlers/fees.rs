use crate::calc;
use crate::ipc::helpers::{fields, id_param, require_affected, with_repo};
use crate::ipc::types::{AppState, Request};
use crate::model::{self, FeeRecord};
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "fees.add" => with_repo(state, req, |repo| {
            let fee = FeeRecord::from_fields(fields(req))?;
            let id = repo.add_fee(&fee)?;
            Ok(json!({
                "feeId": id,
                "dueDate": model::format_date(fee.due_date),
            }))
        }),
        "fees.list" => with_repo(state, req, |repo| {
            let student_id = id_param(req, "studentId")?;
            let rows = repo.list_fees_for_student(student_id)?;
            let today = model::today();
            let fees: Vec<_> = rows
                .iter()
                .map(|row| {
                    let mut v = json!(row);
                    v["overdue"] = json!(row.record.is_overdue_on(today));
                    v
                })
                .collect();
            Ok(json!({
                "studentId": student_id,
                "fees": fees,
                "summary": calc::fee_summary(&rows, today),
            }))
        }),
        "fees.setPaid" => with_repo(state, req, |repo| {
            let fee_id = id_param(req, "feeId")?;
            let paid = fields(req).flag_or("paid", true)?;
            require_affected(repo.set_fee_paid(fee_id, paid)?, "fee", fee_id)?;
            Ok(json!({ "feeId": fee_id, "paid": paid }))
        }),
        _ => return None,
    };
    Some(resp)
}
