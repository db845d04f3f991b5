use crate::calc::ReportLine;
use crate::error::SchoolResult;
use std::path::Path;
use tracing::info;

pub const REPORT_HEADER: [&str; 3] = ["Subject", "Marks", "Grade"];

/// Writes a performance report as CSV:
///
/// ```text
/// Student ID,<id>
/// Subject,Marks,Grade
/// <subject>,<marks>,<grade>
/// ```
pub fn write_report_csv(
    out_path: &Path,
    student_id: i64,
    report: &[ReportLine],
) -> SchoolResult<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // The leading id row is shorter than the data rows.
    let mut w = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(out_path)?;
    w.write_record(["Student ID", student_id.to_string().as_str()])?;
    w.write_record(REPORT_HEADER)?;
    for line in report {
        w.write_record([
            line.subject.as_str(),
            line.marks.to_string().as_str(),
            line.grade.as_str(),
        ])?;
    }
    w.flush()?;

    info!(student_id, rows = report.len(), path = %out_path.display(), "report exported");
    Ok(())
}
