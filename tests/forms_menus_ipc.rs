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

fn editor_context() -> serde_json::Value {
    json!({ "modname": "Students/StudentFields.php", "canEdit": true })
}

fn html_of(result: serde_json::Value) -> String {
    result
        .get("html")
        .and_then(|v| v.as_str())
        .expect("html fragment")
        .to_string()
}

#[test]
fn field_form_shapes_over_ipc() {
    let workspace = temp_dir("fieldsd-forms");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // New field: full selector, options textarea, no delete button.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "fields.form",
        json!({
            "context": editor_context(),
            "table": "STUDENT",
            "title": "New Student Field",
            "record": { "id": "new", "categoryId": "new" }
        }),
    ));
    assert!(html.contains("<option value=\"textarea\""));
    assert!(html.contains("[SELECT_OPTIONS]"));
    assert!(!html.contains("modfunc=delete"));

    // Existing text field: selector narrowed to the text-like subset.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fields.form",
        json!({
            "context": editor_context(),
            "table": "STUDENT",
            "title": "Student Field",
            "record": {
                "id": "7",
                "categoryId": "1",
                "title": "Bus Route",
                "type": "text"
            }
        }),
    ));
    for key in ["select", "autos", "edits", "exports", "text"] {
        assert!(html.contains(&format!("<option value=\"{}\"", key)));
    }
    assert!(!html.contains("<option value=\"date\""));
    assert!(html.contains("modfunc=delete"));
    assert!(html.contains("table=CUSTOM_FIELDS"));

    // Existing date field: type frozen to a read-only label.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "fields.form",
        json!({
            "context": editor_context(),
            "table": "STUDENT",
            "title": "Student Field",
            "record": {
                "id": "7",
                "categoryId": "1",
                "title": "Enrollment",
                "type": "date"
            }
        }),
    ));
    assert!(!html.contains("[TYPE]"));
    assert!(html.contains("Data Type"));

    let _ = child.kill();
}

#[test]
fn category_form_delete_gating_over_ipc() {
    let workspace = temp_dir("fieldsd-catforms");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Protected student category: no delete button.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "categories.form",
        json!({
            "context": editor_context(),
            "table": "STUDENT",
            "title": "Field Category",
            "record": { "categoryId": "4", "title": "Comments" }
        }),
    ));
    assert!(!html.contains("modfunc=delete"));
    assert!(html.contains("table=STUDENT_FIELD_CATEGORIES"));

    // Above the protected range: deletable.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "categories.form",
        json!({
            "context": editor_context(),
            "table": "STUDENT",
            "title": "Field Category",
            "record": { "categoryId": "5", "title": "Extras" }
        }),
    ));
    assert!(html.contains("modfunc=delete"));

    // Staff threshold sits at 2.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "categories.form",
        json!({
            "context": editor_context(),
            "table": "STAFF",
            "title": "Field Category",
            "record": { "categoryId": "2", "title": "Schedule" }
        }),
    ));
    assert!(!html.contains("modfunc=delete"));

    let _ = child.kill();
}

#[test]
fn menus_list_fields_and_categories_over_ipc() {
    let workspace = temp_dir("fieldsd-menus");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "fields.create",
        json!({
            "context": editor_context(),
            "table": "STUDENTS",
            "sequence": "custom_fields_seq",
            "type": "numeric",
            "categoryId": 1,
            "title": "Locker",
            "sortOrder": 1
        }),
    );
    let field_id = created.get("id").and_then(|v| v.as_i64()).expect("field id");

    // Fields menu for the category: type column, highlight, add-new link.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fields.menu",
        json!({
            "context": editor_context(),
            "table": "STUDENTS",
            "selectedId": field_id.to_string(),
            "categoryId": 1
        }),
    ));
    assert!(html.contains("<th>Data Type</th>"));
    assert!(html.contains("Number"));
    assert!(html.contains("highlight-row"));
    assert!(html.contains("category_id=1&amp;id=new"));

    // Categories menu: seeded categories, linked through category_id.
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "categories.menu",
        json!({
            "context": editor_context(),
            "table": "STUDENTS",
            "selectedId": "2"
        }),
    ));
    assert!(html.contains("<th>Category</th>"));
    assert!(html.contains("Addresses &amp; Contacts"));
    assert!(html.contains("4 Field Categories"));
    assert!(html.contains("category_id=new"));

    // School fields have no categories at all.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "fields.create",
        json!({
            "context": editor_context(),
            "table": "SCHOOLS",
            "sequence": "school_fields_seq",
            "type": "text",
            "title": "Motto",
            "sortOrder": 1
        }),
    );
    let school_field_id = created.get("id").and_then(|v| v.as_i64()).expect("field id");
    let html = html_of(request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "fields.menu",
        json!({
            "context": json!({ "modname": "SchoolSetup/SchoolFields.php", "canEdit": true }),
            "table": "SCHOOLS",
            "selectedId": school_field_id.to_string(),
            "categoriesDisabled": true
        }),
    ));
    assert!(html.contains("<th>Data Type</th>"));
    assert!(html.contains("category_id=&amp;id=new"));

    let _ = child.kill();
}
