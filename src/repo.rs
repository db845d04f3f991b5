use crate::calc::{self, ReportLine};
use crate::db;
use crate::error::SchoolResult;
use crate::model::{
    AttendanceRecord, FeeRecord, Performance, Stored, Student, Teacher, DATE_FORMAT,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CRUD access to the school store.
///
/// Holds only the database location. Every operation opens its own connection,
/// runs a single statement and drops the connection before returning, so no
/// connection outlives a call, error paths included.
#[derive(Debug, Clone)]
pub struct SchoolRepository {
    db_path: PathBuf,
}

impl SchoolRepository {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Initializes the workspace schema and returns a repository over it.
    pub fn open_workspace(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_workspace(workspace)?))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn with_conn<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> SchoolResult<T> {
        debug!(op, "store call");
        // No CREATE flag: a missing database is a storage failure, not a new empty store.
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let out = f(&conn);
        drop(conn);
        Ok(out?)
    }

    // Students

    pub fn add_student(&self, s: &Student) -> SchoolResult<i64> {
        self.with_conn("students.add", |conn| {
            conn.execute(
                "INSERT INTO students(name, age, grade) VALUES(?, ?, ?)",
                (&s.name, s.age, &s.grade),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_students(&self) -> SchoolResult<Vec<Stored<Student>>> {
        self.with_conn("students.list", |conn| {
            let mut stmt = conn.prepare("SELECT id, name, age, grade FROM students ORDER BY id")?;
            let rows = stmt
                .query_map([], |r| {
                    Ok(Stored {
                        id: r.get(0)?,
                        record: Student {
                            name: r.get(1)?,
                            age: r.get(2)?,
                            grade: r.get(3)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the number of rows changed (0 when `id` does not exist).
    pub fn update_student(&self, id: i64, s: &Student) -> SchoolResult<usize> {
        self.with_conn("students.update", |conn| {
            conn.execute(
                "UPDATE students SET name = ?, age = ?, grade = ? WHERE id = ?",
                (&s.name, s.age, &s.grade, id),
            )
        })
    }

    /// Attendance, fee and performance rows of the student are left in place.
    pub fn delete_student(&self, id: i64) -> SchoolResult<usize> {
        self.with_conn("students.delete", |conn| {
            conn.execute("DELETE FROM students WHERE id = ?", [id])
        })
    }

    // Teachers

    pub fn add_teacher(&self, t: &Teacher) -> SchoolResult<i64> {
        self.with_conn("teachers.add", |conn| {
            conn.execute(
                "INSERT INTO teachers(name, subject) VALUES(?, ?)",
                (&t.name, &t.subject),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_teachers(&self) -> SchoolResult<Vec<Stored<Teacher>>> {
        self.with_conn("teachers.list", |conn| {
            let mut stmt = conn.prepare("SELECT id, name, subject FROM teachers ORDER BY id")?;
            let rows = stmt
                .query_map([], |r| {
                    Ok(Stored {
                        id: r.get(0)?,
                        record: Teacher {
                            name: r.get(1)?,
                            subject: r.get(2)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_teacher(&self, id: i64, t: &Teacher) -> SchoolResult<usize> {
        self.with_conn("teachers.update", |conn| {
            conn.execute(
                "UPDATE teachers SET name = ?, subject = ? WHERE id = ?",
                (&t.name, &t.subject, id),
            )
        })
    }

    pub fn delete_teacher(&self, id: i64) -> SchoolResult<usize> {
        self.with_conn("teachers.delete", |conn| {
            conn.execute("DELETE FROM teachers WHERE id = ?", [id])
        })
    }

    // Attendance

    pub fn add_attendance(&self, rec: &AttendanceRecord) -> SchoolResult<i64> {
        self.with_conn("attendance.add", |conn| {
            conn.execute(
                "INSERT INTO attendance(student_id, date, present) VALUES(?, ?, ?)",
                (
                    rec.student_id,
                    rec.date.format(DATE_FORMAT).to_string(),
                    rec.present as i64,
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Oldest first.
    pub fn list_attendance_for_student(
        &self,
        student_id: i64,
    ) -> SchoolResult<Vec<Stored<AttendanceRecord>>> {
        self.with_conn("attendance.list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, date, present
                 FROM attendance
                 WHERE student_id = ?
                 ORDER BY date, id",
            )?;
            let rows = stmt
                .query_map([student_id], |r| {
                    Ok(Stored {
                        id: r.get(0)?,
                        record: AttendanceRecord {
                            student_id: r.get(1)?,
                            date: date_column(r, 2)?,
                            present: r.get::<_, i64>(3)? != 0,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `(present, total)` from one consistent read.
    pub fn attendance_counts(&self, student_id: i64) -> SchoolResult<(i64, i64)> {
        self.with_conn("attendance.counts", |conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(present), 0), COUNT(*) FROM attendance WHERE student_id = ?",
                [student_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
        })
    }

    pub fn attendance_percentage(&self, student_id: i64) -> SchoolResult<f64> {
        let (present, total) = self.attendance_counts(student_id)?;
        Ok(calc::attendance_percentage(present, total))
    }

    // Fees

    pub fn add_fee(&self, fee: &FeeRecord) -> SchoolResult<i64> {
        self.with_conn("fees.add", |conn| {
            conn.execute(
                "INSERT INTO fees(student_id, amount, paid, due_date) VALUES(?, ?, ?, ?)",
                (
                    fee.student_id,
                    fee.amount,
                    fee.paid as i64,
                    fee.due_date.format(DATE_FORMAT).to_string(),
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_fees_for_student(&self, student_id: i64) -> SchoolResult<Vec<Stored<FeeRecord>>> {
        self.with_conn("fees.list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, amount, paid, due_date
                 FROM fees
                 WHERE student_id = ?
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([student_id], |r| {
                    Ok(Stored {
                        id: r.get(0)?,
                        record: FeeRecord {
                            student_id: r.get(1)?,
                            amount: r.get(2)?,
                            paid: r.get::<_, i64>(3)? != 0,
                            due_date: date_column(r, 4)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_fee_paid(&self, fee_id: i64, paid: bool) -> SchoolResult<usize> {
        self.with_conn("fees.set_paid", |conn| {
            conn.execute(
                "UPDATE fees SET paid = ? WHERE id = ?",
                (paid as i64, fee_id),
            )
        })
    }

    // Performance

    pub fn add_performance(&self, p: &Performance) -> SchoolResult<i64> {
        self.with_conn("performance.add", |conn| {
            conn.execute(
                "INSERT INTO performance(student_id, subject, marks) VALUES(?, ?, ?)",
                (p.student_id, &p.subject, p.marks),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_performance_for_student(
        &self,
        student_id: i64,
    ) -> SchoolResult<Vec<Stored<Performance>>> {
        self.with_conn("performance.list", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, subject, marks
                 FROM performance
                 WHERE student_id = ?
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([student_id], |r| {
                    Ok(Stored {
                        id: r.get(0)?,
                        record: Performance {
                            student_id: r.get(1)?,
                            subject: r.get(2)?,
                            marks: r.get(3)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn generate_performance_report(&self, student_id: i64) -> SchoolResult<Vec<ReportLine>> {
        let rows = self.list_performance_for_student(student_id)?;
        Ok(calc::performance_report(&rows))
    }
}

fn date_column(r: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = r.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchoolError;
    use crate::model::{Fields, Grade};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}-{}",
            prefix,
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn repo(prefix: &str) -> SchoolRepository {
        SchoolRepository::open_workspace(&temp_dir(prefix)).expect("open workspace")
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn student(name: &str, age: u32, grade: &str) -> Student {
        Student {
            name: name.into(),
            age,
            grade: grade.into(),
        }
    }

    fn teacher(name: &str, subject: &str) -> Teacher {
        Teacher {
            name: name.into(),
            subject: subject.into(),
        }
    }

    fn performance(student_id: i64, subject: &str, marks: f64) -> Performance {
        Performance {
            student_id,
            subject: subject.into(),
            marks,
        }
    }

    fn attendance(student_id: i64, date: &str, present: bool) -> AttendanceRecord {
        AttendanceRecord {
            student_id,
            date: day(date),
            present,
        }
    }

    #[test]
    fn student_round_trip_coerces_age() {
        let repo = repo("schoold-repo-students");
        let params = json!({ "name": "Ada", "age": "15", "grade": "10B" });
        let s = Student::from_fields(Fields(&params)).expect("student");
        let id = repo.add_student(&s).expect("add");

        let rows = repo.list_students().expect("list");
        assert_eq!(rows, vec![Stored { id, record: s }]);
        assert_eq!(rows[0].record.age, 15);
    }

    #[test]
    fn student_update_and_delete_report_affected_rows() {
        let repo = repo("schoold-repo-student-mutate");
        let id = repo.add_student(&student("Ada", 15, "10B")).expect("add");

        let changed = student("Ada L", 16, "11A");
        assert_eq!(repo.update_student(id, &changed).expect("update"), 1);
        assert_eq!(repo.update_student(id + 100, &changed).expect("update missing"), 0);
        assert_eq!(repo.list_students().expect("list")[0].record, changed);

        assert_eq!(repo.delete_student(id).expect("delete"), 1);
        assert_eq!(repo.delete_student(id).expect("delete again"), 0);
        assert!(repo.list_students().expect("list").is_empty());
    }

    #[test]
    fn deleting_a_student_leaves_related_rows() {
        let repo = repo("schoold-repo-orphans");
        let sid = repo.add_student(&student("Ada", 15, "10B")).expect("add");
        repo.add_performance(&performance(sid, "Math", 80.0)).expect("perf");
        repo.delete_student(sid).expect("delete");
        assert_eq!(repo.list_performance_for_student(sid).expect("perf").len(), 1);
    }

    #[test]
    fn teachers_crud() {
        let repo = repo("schoold-repo-teachers");
        let a = repo.add_teacher(&teacher("Grace", "CS")).expect("add a");
        let b = repo.add_teacher(&teacher("Alan", "Math")).expect("add b");
        assert!(b > a);

        repo.update_teacher(b, &teacher("Alan", "Logic")).expect("update");
        repo.delete_teacher(a).expect("delete");

        let rows = repo.list_teachers().expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, b);
        assert_eq!(rows[0].record.subject, "Logic");
    }

    #[test]
    fn attendance_lists_by_date_and_computes_percentage() {
        let repo = repo("schoold-repo-attendance");
        assert_eq!(repo.attendance_percentage(1).expect("empty pct"), 0.0);

        for (date, present) in [
            ("2023-01-03", true),
            ("2023-01-01", true),
            ("2023-01-02", false),
        ] {
            repo.add_attendance(&attendance(1, date, present)).expect("add");
        }
        repo.add_attendance(&attendance(2, "2023-01-01", false)).expect("other student");

        let rows = repo.list_attendance_for_student(1).expect("list");
        let dates: Vec<_> = rows.iter().map(|r| r.record.date).collect();
        assert_eq!(dates, vec![day("2023-01-01"), day("2023-01-02"), day("2023-01-03")]);

        assert_eq!(repo.attendance_counts(1).expect("counts"), (2, 3));
        let pct = repo.attendance_percentage(1).expect("pct");
        assert!((pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(repo.attendance_percentage(2).expect("pct"), 0.0);
    }

    #[test]
    fn fee_paid_flag_mutates_in_place() {
        let repo = repo("schoold-repo-fees");
        let fee = FeeRecord {
            student_id: 5,
            amount: 100.0,
            paid: false,
            due_date: day("2020-01-01"),
        };
        let id = repo.add_fee(&fee).expect("add");

        let rows = repo.list_fees_for_student(5).expect("list");
        assert_eq!(
            rows,
            vec![Stored {
                id,
                record: fee.clone()
            }]
        );
        assert!(rows[0].record.is_overdue());

        assert_eq!(repo.set_fee_paid(id, true).expect("pay"), 1);
        let rows = repo.list_fees_for_student(5).expect("list");
        assert!(rows[0].record.paid);
        assert!(!rows[0].record.is_overdue());

        assert_eq!(repo.set_fee_paid(id + 1, true).expect("pay missing"), 0);
    }

    #[test]
    fn performance_report_derives_grades() {
        let repo = repo("schoold-repo-report");
        assert!(repo.generate_performance_report(9).expect("empty").is_empty());

        repo.add_performance(&performance(9, "Math", 95.0)).expect("math");
        repo.add_performance(&performance(9, "Art", 45.0)).expect("art");

        let report = repo.generate_performance_report(9).expect("report");
        let grades: Vec<_> = report.iter().map(|l| (l.subject.as_str(), l.grade)).collect();
        assert_eq!(grades, vec![("Math", Grade::APlus), ("Art", Grade::F)]);
    }

    #[test]
    fn missing_database_is_a_storage_error() {
        let dir = temp_dir("schoold-repo-missing");
        let repo = SchoolRepository::new(dir.join("nope").join("school.sqlite3"));
        let e = repo.list_students().unwrap_err();
        assert!(matches!(e, SchoolError::Storage(_)), "{e:?}");
    }
}
