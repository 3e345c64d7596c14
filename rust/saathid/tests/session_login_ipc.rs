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

#[test]
fn staff_and_parent_sign_in() {
    let workspace = temp_dir("saathi-session");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let none = request_ok(&mut stdin, &mut reader, "2", "session.current", json!({}));
    assert!(none.get("user").map_or(false, |v| v.is_null()));

    let wrong = request(
        &mut stdin,
        &mut reader,
        "3",
        "session.login",
        json!({ "username": "admin", "password": "letmein" }),
    );
    assert_eq!(error_code(&wrong), "invalid_credentials");

    let admin = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "session.login",
        json!({ "kind": "staff", "username": "admin", "password": "admin123", "language": "hinglish" }),
    );
    assert_eq!(admin.pointer("/user/role").and_then(|v| v.as_str()), Some("ADMIN"));
    assert_eq!(admin.pointer("/user/language").and_then(|v| v.as_str()), Some("hinglish"));
    let views = admin.get("views").and_then(|v| v.as_array()).expect("views");
    assert!(views.iter().any(|v| v.as_str() == Some("setup")));

    let current = request_ok(&mut stdin, &mut reader, "5", "session.current", json!({}));
    assert_eq!(current.pointer("/user/id").and_then(|v| v.as_str()), Some("u_admin"));

    let short = request(
        &mut stdin,
        &mut reader,
        "6",
        "session.login",
        json!({ "kind": "parent", "phone": "12345" }),
    );
    assert_eq!(error_code(&short), "bad_params");

    let parent = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "session.login",
        json!({ "kind": "parent", "phone": "8888888888" }),
    );
    assert_eq!(parent.pointer("/user/role").and_then(|v| v.as_str()), Some("PARENT"));
    assert_eq!(
        parent.pointer("/user/studentId").and_then(|v| v.as_str()),
        Some("st_c10_1")
    );
    assert_eq!(
        parent.get("views").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let out = request_ok(&mut stdin, &mut reader, "8", "session.logout", json!({}));
    assert!(out.get("user").map_or(false, |v| v.is_null()));
    let after = request_ok(&mut stdin, &mut reader, "9", "session.current", json!({}));
    assert!(after.get("user").map_or(false, |v| v.is_null()));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
