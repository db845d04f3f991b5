use crate::model::{FeeRecord, Grade, Performance, Stored};
use chrono::NaiveDate;
use serde::Serialize;

/// Share of present days, as a percentage. An empty record set is 0%.
pub fn attendance_percentage(present: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    present as f64 / total as f64 * 100.0
}

/// VB-style 2-decimal display rounding for percentages shown in the UI.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub subject: String,
    pub marks: f64,
    pub grade: Grade,
}

/// One line per performance row, in row order. Grades are derived here and
/// never read from the store.
pub fn performance_report(rows: &[Stored<Performance>]) -> Vec<ReportLine> {
    rows.iter()
        .map(|row| ReportLine {
            subject: row.record.subject.clone(),
            marks: row.record.marks,
            grade: row.record.calculate_grade(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub total_due: f64,
    pub total_paid: f64,
    pub overdue_count: usize,
    pub overdue_amount: f64,
}

pub fn fee_summary(rows: &[Stored<FeeRecord>], today: NaiveDate) -> FeeSummary {
    let mut summary = FeeSummary::default();
    for fee in rows.iter().map(|r| &r.record) {
        if fee.paid {
            summary.total_paid += fee.amount;
        } else {
            summary.total_due += fee.amount;
        }
        if fee.is_overdue_on(today) {
            summary.overdue_count += 1;
            summary.overdue_amount += fee.amount;
        }
    }
    summary
}
