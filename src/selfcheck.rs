use crate::calc;
use crate::db;
use crate::model::{self, FeeRecord, Fields, Grade, Student};
use crate::repo::SchoolRepository;
use anyhow::{ensure, Context};
use chrono::Duration;
use rusqlite::Connection;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

type Check = fn() -> anyhow::Result<()>;

const CHECKS: &[(&str, Check)] = &[
    ("grade_boundaries", check_grade_boundaries),
    ("fee_overdue", check_fee_overdue),
    ("attendance_percentage", check_attendance_percentage),
    ("empty_report", check_empty_report),
    ("schema_idempotent", check_schema_idempotent),
    ("student_round_trip", check_student_round_trip),
];

/// Runs every check, writing one `ok`/`FAIL` line each. Returns whether all passed.
pub fn run(out: &mut impl Write) -> bool {
    let mut failed = 0;
    for (name, check) in CHECKS {
        match check() {
            Ok(()) => {
                let _ = writeln!(out, "ok   {}", name);
            }
            Err(e) => {
                failed += 1;
                error!(check = *name, "self-check failed: {e:#}");
                let _ = writeln!(out, "FAIL {}: {:#}", name, e);
            }
        }
    }
    let _ = writeln!(out, "{} passed, {} failed", CHECKS.len() - failed, failed);
    info!(failed, "self-check finished");
    failed == 0
}

fn check_grade_boundaries() -> anyhow::Result<()> {
    for (marks, want) in [
        (95.0, "A+"),
        (85.0, "A"),
        (75.0, "B"),
        (65.0, "C"),
        (55.0, "D"),
        (45.0, "F"),
    ] {
        let got = Grade::from_marks(marks);
        ensure!(got.as_str() == want, "grade({}) = {}, want {}", marks, got, want);
    }
    ensure!(Grade::from_marks(f64::NAN) == Grade::F, "NaN must grade F");
    Ok(())
}

fn check_fee_overdue() -> anyhow::Result<()> {
    let today = model::today();
    let unpaid = FeeRecord {
        student_id: 1,
        amount: 100.0,
        paid: false,
        due_date: today - Duration::days(10),
    };
    let paid = FeeRecord {
        paid: true,
        ..unpaid.clone()
    };
    let due_today = FeeRecord {
        due_date: today,
        ..unpaid.clone()
    };
    ensure!(unpaid.is_overdue_on(today), "unpaid past-due fee not overdue");
    ensure!(unpaid.is_overdue(), "unpaid past-due fee not overdue by the clock");
    ensure!(!paid.is_overdue_on(today), "paid fee reported overdue");
    ensure!(!due_today.is_overdue_on(today), "fee due today reported overdue");
    Ok(())
}

fn check_attendance_percentage() -> anyhow::Result<()> {
    ensure!(calc::attendance_percentage(0, 0) == 0.0, "empty set must be 0%");
    let pct = calc::attendance_percentage(2, 3);
    ensure!((pct - 200.0 / 3.0).abs() < 1e-9, "2 of 3 gave {}", pct);
    Ok(())
}

fn check_empty_report() -> anyhow::Result<()> {
    ensure!(calc::performance_report(&[]).is_empty(), "report over no rows not empty");
    Ok(())
}

fn scratch_workspace(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "schoold-selfcheck-{}-{}-{}",
        tag,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn check_schema_idempotent() -> anyhow::Result<()> {
    let ws = scratch_workspace("schema");
    let result = (|| -> anyhow::Result<()> {
        let path = db::open_workspace(&ws)?;
        {
            let conn = Connection::open(&path)?;
            conn.execute(
                "INSERT INTO teachers(name, subject) VALUES(?, ?)",
                ("Grace", "CS"),
            )?;
        }
        let before = db::list_tables(&Connection::open(&path)?)?;
        db::open_workspace(&ws)?;
        let conn = Connection::open(&path)?;
        let after = db::list_tables(&conn)?;
        ensure!(before == after, "tables changed: {:?} -> {:?}", before, after);
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM teachers", [], |r| r.get(0))?;
        ensure!(rows == 1, "expected 1 teacher after re-init, found {}", rows);
        Ok(())
    })();
    let _ = std::fs::remove_dir_all(&ws);
    result
}

fn check_student_round_trip() -> anyhow::Result<()> {
    let ws = scratch_workspace("roundtrip");
    let result = (|| -> anyhow::Result<()> {
        let repo = SchoolRepository::open_workspace(&ws)?;
        let params = json!({ "name": "Ada", "age": "15", "grade": "10B" });
        let student = Student::from_fields(Fields(&params))?;
        let id = repo.add_student(&student)?;
        let rows = repo.list_students()?;
        let row = rows
            .iter()
            .find(|r| r.id == id)
            .context("added student not listed")?;
        ensure!(row.record == student, "stored {:?}, read {:?}", student, row.record);
        ensure!(row.record.age == 15, "age not coerced");
        let pct = repo.attendance_percentage(id)?;
        ensure!(pct == 0.0, "student without attendance has {}%", pct);
        Ok(())
    })();
    let _ = std::fs::remove_dir_all(&ws);
    result
}
