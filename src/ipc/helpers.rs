//! Shared parameter extraction for the handler families.

use serde_json::Value;

use crate::registry;
use crate::render::form::FormRecord;
use crate::render::RequestContext;

/// Navigation/permission context sent by the host with every request that
/// builds links or mutates the schema: `params.context = { modname, canEdit }`.
pub fn request_context(params: &Value) -> Option<RequestContext> {
    let context = params.get("context")?;
    let modname = context.get("modname")?.as_str()?.to_string();
    let can_edit = context
        .get("canEdit")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    Some(RequestContext { modname, can_edit })
}

pub fn str_param(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Integer parameter; numeric strings are accepted because IDs travel as
/// strings through form submissions.
pub fn i64_param(params: &Value, key: &str) -> Option<i64> {
    let v = params.get(key)?;
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str().and_then(|s| s.parse().ok())
}

pub fn bool_param(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}

/// IDs travel as the string "new", a numeric string, or a number.
fn id_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Current record data for the form renderer: `params.record`.
pub fn form_record(params: &Value) -> FormRecord {
    let r = params.get("record").cloned().unwrap_or(Value::Null);
    let text = |key: &str| {
        r.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    FormRecord {
        id: id_string(r.get("id")),
        category_id: id_string(r.get("categoryId")),
        title: text("title"),
        field_type: text("type"),
        select_options: text("selectOptions"),
        default_selection: text("defaultSelection"),
        required: r.get("required").and_then(|v| v.as_bool()).unwrap_or(false),
        sort_order: id_string(r.get("sortOrder")),
    }
}

/// Optional data-type selector override: `params.typeOptions` as a list of
/// type keys, labeled through the registry.
pub fn type_options_override(params: &Value) -> Option<Vec<(String, String)>> {
    let arr = params.get("typeOptions")?.as_array()?;
    Some(
        arr.iter()
            .filter_map(|v| v.as_str())
            .map(|k| (k.to_string(), registry::type_label(k)))
            .collect(),
    )
}

/// Pre-rendered extra cells for category forms: `params.extraFields`.
pub fn extra_fields(params: &Value) -> Vec<String> {
    params
        .get("extraFields")
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
