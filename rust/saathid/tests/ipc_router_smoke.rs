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
fn router_answers_every_method_family() {
    let workspace = temp_dir("saathi-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("workspacePath").map_or(false, |v| v.is_null()));
    assert_eq!(health.get("pendingEnhancements").and_then(|v| v.as_u64()), Some(0));

    let before = request(&mut stdin, &mut reader, "2", "classes.list", json!({}));
    assert_eq!(error_code(&before), "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (i, (method, params)) in [
        ("school.get", json!({})),
        ("classes.list", json!({})),
        ("subjects.list", json!({ "classId": "c10" })),
        ("students.list", json!({ "classId": "c10" })),
        ("students.search", json!({ "query": "anjali" })),
        ("tests.list", json!({ "classId": "c10" })),
        ("marks.list", json!({ "testId": "t_c10_mid" })),
        ("attendance.list", json!({})),
        ("feedback.list", json!({ "studentId": "st_c10_1" })),
        ("stats.classAverage", json!({ "classId": "c10" })),
        ("stats.testAverage", json!({ "testId": "t_c10_mid" })),
        ("stats.student", json!({ "studentId": "st_c10_1" })),
        ("stats.school", json!({})),
        ("session.current", json!({})),
        ("insights.strategic", json!({})),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = request_ok(&mut stdin, &mut reader, &format!("f{}", i), method, params);
    }

    let unknown = request(&mut stdin, &mut reader, "4", "classes.explode", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    let missing = request(
        &mut stdin,
        &mut reader,
        "5",
        "stats.student",
        json!({ "studentId": "st_nobody" }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let bad = request(&mut stdin, &mut reader, "6", "tests.create", json!({ "classId": "c10" }));
    assert_eq!(error_code(&bad), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{ not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&value), "bad_json");

    let _ = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
}
