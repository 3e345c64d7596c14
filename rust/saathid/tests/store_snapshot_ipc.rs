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
    let exe = env!("CARGO_BIN_EXE_saathid");
    let mut child = Command::new(exe)
        .env_remove("GEMINI_API_KEY")
        .env_remove("SAATHI_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn saathid");
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
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn student_count(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, id: &str) -> usize {
    let listed = request_ok(stdin, reader, id, "students.list", json!({}));
    listed
        .get("students")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0)
}

#[test]
fn export_import_and_reset_round_trip() {
    let workspace = temp_dir("saathi-snapshot-ipc");
    let bundle = workspace.join("exports").join("records.saathi.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "store.export",
        json!({ "path": bundle.to_string_lossy() }),
    );
    assert_eq!(exported.get("format").and_then(|v| v.as_str()), Some("saathi-records-v1"));
    assert!(bundle.is_file());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "name": "Temp Student", "rollNumber": "99", "classId": "c10" }),
    );
    assert_eq!(student_count(&mut stdin, &mut reader, "4"), 241);

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "store.import",
        json!({ "path": bundle.to_string_lossy() }),
    );
    assert_eq!(
        imported.get("recordCount").and_then(|v| v.as_u64()),
        exported.get("recordCount").and_then(|v| v.as_u64())
    );
    assert_eq!(student_count(&mut stdin, &mut reader, "6"), 240);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.create",
        json!({ "name": "Temp Student", "rollNumber": "99", "classId": "c10" }),
    );
    let reset = request_ok(&mut stdin, &mut reader, "8", "store.reset", json!({}));
    assert_eq!(reset.get("seeded").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(student_count(&mut stdin, &mut reader, "9"), 240);

    let missing = request(
        &mut stdin,
        &mut reader,
        "10",
        "store.import",
        json!({ "path": workspace.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&missing), "snapshot_failed");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
