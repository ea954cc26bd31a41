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
    let exe = env!("CARGO_BIN_EXE_fieldsd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn fieldsd");
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

fn context(can_edit: bool) -> serde_json::Value {
    json!({ "modname": "Students/StudentFields.php", "canEdit": can_edit })
}

fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.pointer("/error/code").and_then(|v| v.as_str())
}

#[test]
fn mutations_require_edit_permission() {
    let workspace = temp_dir("fieldsd-perms");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let denied = request(
        &mut stdin,
        &mut reader,
        "2",
        "fields.create",
        json!({
            "context": context(false),
            "table": "STUDENTS",
            "sequence": "custom_fields_seq",
            "type": "numeric",
            "categoryId": 1
        }),
    );
    assert_eq!(denied.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&denied), Some("not_allowed"));

    // The denied request had no side effect: the sequence starts at 1.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fields.create",
        json!({
            "context": context(true),
            "table": "STUDENTS",
            "sequence": "custom_fields_seq",
            "type": "numeric",
            "categoryId": 1,
            "title": "Locker"
        }),
    );
    let field_id = created.get("id").and_then(|v| v.as_i64()).expect("field id");
    assert_eq!(field_id, 1);

    let denied = request(
        &mut stdin,
        &mut reader,
        "4",
        "fields.delete",
        json!({
            "context": context(false),
            "table": "STUDENTS",
            "id": field_id
        }),
    );
    assert_eq!(error_code(&denied), Some("not_allowed"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "fields.list",
        json!({ "table": "STUDENTS" }),
    );
    assert_eq!(
        listed.get("fields").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let denied = request(
        &mut stdin,
        &mut reader,
        "6",
        "categories.delete",
        json!({
            "context": context(false),
            "table": "STUDENTS",
            "id": 1
        }),
    );
    assert_eq!(error_code(&denied), Some("not_allowed"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "categories.list",
        json!({ "table": "STUDENTS" }),
    );
    assert_eq!(
        listed
            .get("categories")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(4)
    );

    let _ = child.kill();
}

#[test]
fn malformed_requests_answer_with_structured_errors() {
    let workspace = temp_dir("fieldsd-badreq");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // No workspace selected yet.
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "fields.list",
        json!({ "table": "STUDENTS" }),
    );
    assert_eq!(error_code(&resp), Some("no_workspace"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Missing context on a mutating method.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "fields.create",
        json!({ "table": "STUDENTS", "sequence": "custom_fields_seq", "type": "text" }),
    );
    assert_eq!(error_code(&resp), Some("bad_params"));

    // Identifier smuggling is rejected before any SQL is built.
    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "fields.list",
        json!({ "table": "STUDENTS; DROP TABLE CUSTOM_FIELDS" }),
    );
    assert_eq!(error_code(&resp), Some("bad_params"));

    // Unknown methods fall through the router.
    let resp = request(&mut stdin, &mut reader, "5", "fields.rename", json!({}));
    assert_eq!(error_code(&resp), Some("not_implemented"));

    let _ = child.kill();
}
