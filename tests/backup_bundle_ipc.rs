use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .arg("--no-login")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn backup_export_then_import_restores_workspace() {
    let workspace = temp_dir("schoold-backup-ipc");
    let bundle = workspace.join("backups").join("school.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.create",
        json!({ "name": "Grace", "subject": "CS" }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(
        exported["summary"]["bundleFormat"],
        json!("schoold-workspace-v1")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "teachers.create",
        json!({ "name": "Alan", "subject": "Math" }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "teachers.list", json!({}));
    assert_eq!(listed["teachers"].as_array().map(|a| a.len()), Some(2));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "backup.import",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "7", "teachers.list", json!({}));
    assert_eq!(listed["teachers"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(listed["teachers"][0]["name"], json!("Grace"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "8",
        "backup.import",
        json!({ "inPath": workspace.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&missing), Some("io_failed"));

    let blank = request(
        &mut stdin,
        &mut reader,
        "9",
        "backup.import",
        json!({ "inPath": "   " }),
    );
    assert_eq!(error_code(&blank), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn rejected_import_keeps_live_workspace() {
    let workspace = temp_dir("schoold-backup-ipc-foreign");
    let foreign = workspace.join("gradebook.sqlite3");
    {
        let conn = rusqlite::Connection::open(&foreign).expect("foreign db");
        conn.execute("CREATE TABLE students(id TEXT PRIMARY KEY, class_id TEXT)", [])
            .expect("foreign table");
    }
    let not_a_bundle = workspace.join("notes.zip");
    std::fs::write(&not_a_bundle, vec![b'x'; 4096]).expect("write junk");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.create",
        json!({ "name": "Grace", "subject": "CS" }),
    );

    for (id, path) in [("3", &foreign), ("4", &not_a_bundle)] {
        let rejected = request(
            &mut stdin,
            &mut reader,
            id,
            "backup.import",
            json!({ "inPath": path.to_string_lossy() }),
        );
        assert_eq!(error_code(&rejected), Some("invalid_bundle"), "{}", rejected);
    }

    let listed = request_ok(&mut stdin, &mut reader, "5", "teachers.list", json!({}));
    assert_eq!(listed["teachers"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(listed["teachers"][0]["name"], json!("Grace"));

    drop(stdin);
    let _ = child.wait();
}
