use anyhow::Context;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DB_FILE: &str = "school.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE)
}

/// Creates the workspace directory and database file if needed and makes sure
/// every table exists. Safe to call on every start.
pub fn open_workspace(workspace: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!("failed to create workspace {}", workspace.to_string_lossy())
    })?;
    let path = db_path(workspace);
    let conn = Connection::open(&path)
        .with_context(|| format!("failed to open database {}", path.to_string_lossy()))?;
    ensure_schema(&conn).context("failed to initialize schema")?;
    info!(db = %path.display(), "workspace ready");
    Ok(path)
}

pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    // student_id columns are plain integers: no foreign keys, no cascades.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            grade TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            subject TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            present INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fees(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            paid INTEGER NOT NULL,
            due_date TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_student ON fees(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS performance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            subject TEXT NOT NULL,
            marks REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_performance_student ON performance(student_id)",
        [],
    )?;

    Ok(())
}

/// Column names each table must carry, in declaration order.
pub const TABLE_COLUMNS: &[(&str, &[&str])] = &[
    ("students", &["id", "name", "age", "grade"]),
    ("teachers", &["id", "name", "subject"]),
    ("attendance", &["id", "student_id", "date", "present"]),
    ("fees", &["id", "student_id", "amount", "paid", "due_date"]),
    ("performance", &["id", "student_id", "subject", "marks"]),
];

/// Tables whose columns differ from [`TABLE_COLUMNS`]. Empty when the
/// database matches the schema.
pub fn schema_mismatches(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?) ORDER BY cid")?;
    let mut mismatched = Vec::new();
    for (table, want) in TABLE_COLUMNS {
        let got = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if got != *want {
            mismatched.push(table.to_string());
        }
    }
    Ok(mismatched)
}

/// User tables, sorted by name.
pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_the_five_tables() {
        let conn = Connection::open_in_memory().expect("memory db");
        ensure_schema(&conn).expect("schema");
        assert_eq!(
            list_tables(&conn).expect("tables"),
            vec!["attendance", "fees", "performance", "students", "teachers"]
        );
    }

    #[test]
    fn fresh_schema_has_no_mismatches() {
        let conn = Connection::open_in_memory().expect("memory db");
        ensure_schema(&conn).expect("schema");
        assert!(schema_mismatches(&conn).expect("columns").is_empty());
    }

    #[test]
    fn foreign_table_layout_is_reported() {
        let conn = Connection::open_in_memory().expect("memory db");
        conn.execute("CREATE TABLE students(id TEXT PRIMARY KEY, class_id TEXT)", [])
            .expect("foreign table");
        ensure_schema(&conn).expect("schema");
        assert_eq!(schema_mismatches(&conn).expect("columns"), vec!["students"]);
    }

    #[test]
    fn schema_is_idempotent_and_keeps_rows() {
        let conn = Connection::open_in_memory().expect("memory db");
        ensure_schema(&conn).expect("first init");
        conn.execute(
            "INSERT INTO students(name, age, grade) VALUES(?, ?, ?)",
            ("Ada", 15, "10B"),
        )
        .expect("insert");
        let before = list_tables(&conn).expect("tables");

        ensure_schema(&conn).expect("second init");

        assert_eq!(list_tables(&conn).expect("tables"), before);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }
}
