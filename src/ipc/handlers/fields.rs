//! Custom field methods.
//!
//! `fields.create` allocates the ID and backing column through the lifecycle
//! manager and writes the metadata row. `fields.save` updates metadata only;
//! changing a field's type outside the interchangeable text-like subset is a
//! UI rule enforced by the form renderer, not here. `fields.form` and
//! `fields.menu` return HTML fragments for the host UI.
//!
//! `table` is the entity table (e.g. "STUDENTS") for create/save/delete/list/
//! menu, and the singular entity root (e.g. "STUDENT") for `fields.form`,
//! matching the metadata-table naming the forms post back to.

use chrono::Utc;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    bool_param, extra_fields, form_record, i64_param, request_context, str_param,
    type_options_override,
};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::naming::{self, MetadataKind};
use crate::registry;
use crate::render::form::fields_form;
use crate::render::list::{fields_menu, CategoryContext, ListRow};

fn handle_fields_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(ctx) = request_context(&req.params) else {
        return err(&req.id, "bad_params", "missing params.context", None);
    };
    if !ctx.can_edit {
        return err(&req.id, "not_allowed", "edit permission required", None);
    }

    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let Some(sequence) = str_param(&req.params, "sequence") else {
        return err(&req.id, "bad_params", "missing sequence", None);
    };
    let Some(type_key) = str_param(&req.params, "type") else {
        return err(&req.id, "bad_params", "missing type", None);
    };

    let field_id =
        match lifecycle::create_field(conn, ctx.can_edit, &table, &sequence, &type_key) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return err(
                    &req.id,
                    "bad_params",
                    "table or type not accepted",
                    Some(json!({ "table": table, "type": type_key })),
                )
            }
            Err(e) => return err(&req.id, "db_alter_failed", e.to_string(), None),
        };

    let fields_table = match naming::resolve_metadata_table(&table, MetadataKind::Fields) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let insert = conn.execute(
        &format!(
            "INSERT INTO {}(ID, CATEGORY_ID, TITLE, TYPE, SELECT_OPTIONS,
                            DEFAULT_SELECTION, REQUIRED, SORT_ORDER, UPDATED_AT)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            fields_table
        ),
        (
            field_id,
            i64_param(&req.params, "categoryId"),
            str_param(&req.params, "title").unwrap_or_default(),
            &type_key,
            str_param(&req.params, "selectOptions").unwrap_or_default(),
            str_param(&req.params, "defaultSelection").unwrap_or_default(),
            bool_param(&req.params, "required").unwrap_or(false) as i64,
            i64_param(&req.params, "sortOrder"),
            Utc::now().to_rfc3339(),
        ),
    );
    if let Err(e) = insert {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": fields_table })),
        );
    }

    ok(&req.id, json!({ "id": field_id }))
}

fn handle_fields_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(ctx) = request_context(&req.params) else {
        return err(&req.id, "bad_params", "missing params.context", None);
    };
    if !ctx.can_edit {
        return err(&req.id, "not_allowed", "edit permission required", None);
    }

    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let Some(id) = i64_param(&req.params, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };

    let fields_table = match naming::resolve_metadata_table(&table, MetadataKind::Fields) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    fn set(column: &str, value: SqlValue, sets: &mut Vec<String>, values: &mut Vec<SqlValue>) {
        values.push(value);
        sets.push(format!("{} = ?{}", column, values.len()));
    }

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(title) = str_param(&req.params, "title") {
        set("TITLE", SqlValue::Text(title), &mut sets, &mut values);
    }
    if let Some(type_key) = str_param(&req.params, "type") {
        set("TYPE", SqlValue::Text(type_key), &mut sets, &mut values);
    }
    if let Some(options) = str_param(&req.params, "selectOptions") {
        set("SELECT_OPTIONS", SqlValue::Text(options), &mut sets, &mut values);
    }
    if let Some(default) = str_param(&req.params, "defaultSelection") {
        set("DEFAULT_SELECTION", SqlValue::Text(default), &mut sets, &mut values);
    }
    if let Some(required) = bool_param(&req.params, "required") {
        set("REQUIRED", SqlValue::Integer(required as i64), &mut sets, &mut values);
    }
    if let Some(sort_order) = i64_param(&req.params, "sortOrder") {
        set("SORT_ORDER", SqlValue::Integer(sort_order), &mut sets, &mut values);
    }
    if let Some(category_id) = i64_param(&req.params, "categoryId") {
        set("CATEGORY_ID", SqlValue::Integer(category_id), &mut sets, &mut values);
    }
    set(
        "UPDATED_AT",
        SqlValue::Text(Utc::now().to_rfc3339()),
        &mut sets,
        &mut values,
    );

    values.push(SqlValue::Integer(id));
    let sql = format!(
        "UPDATE {} SET {} WHERE ID = ?{}",
        fields_table,
        sets.join(", "),
        values.len()
    );

    match conn.execute(&sql, params_from_iter(values)) {
        Ok(changed) => ok(&req.id, json!({ "updated": changed > 0 })),
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": fields_table })),
        ),
    }
}

fn handle_fields_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(ctx) = request_context(&req.params) else {
        return err(&req.id, "bad_params", "missing params.context", None);
    };
    if !ctx.can_edit {
        return err(&req.id, "not_allowed", "edit permission required", None);
    }

    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let Some(id) = i64_param(&req.params, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };

    match lifecycle::delete_field(conn, ctx.can_edit, &table, id) {
        Ok(true) => ok(&req.id, json!({ "deleted": true })),
        Ok(false) => err(&req.id, "bad_params", "field delete preconditions failed", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

fn handle_fields_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let fields_table = match naming::resolve_metadata_table(&table, MetadataKind::Fields) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let category_id = i64_param(&req.params, "categoryId");
    let mut sql = format!(
        "SELECT ID, CATEGORY_ID, TITLE, TYPE, SELECT_OPTIONS, DEFAULT_SELECTION,
                REQUIRED, SORT_ORDER
         FROM {}",
        fields_table
    );
    let mut params: Vec<SqlValue> = Vec::new();
    if let Some(cid) = category_id {
        sql.push_str(" WHERE CATEGORY_ID = ?1");
        params.push(SqlValue::Integer(cid));
    }
    sql.push_str(" ORDER BY SORT_ORDER, TITLE");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            let id: i64 = row.get(0)?;
            let category_id: Option<i64> = row.get(1)?;
            let title: Option<String> = row.get(2)?;
            let type_key: Option<String> = row.get(3)?;
            let select_options: Option<String> = row.get(4)?;
            let default_selection: Option<String> = row.get(5)?;
            let required: i64 = row.get(6)?;
            let sort_order: Option<i64> = row.get(7)?;
            let type_key = type_key.unwrap_or_default();
            Ok(json!({
                "id": id,
                "categoryId": category_id,
                "title": title.unwrap_or_default(),
                "type": type_key,
                "typeLabel": registry::type_label(&type_key),
                "selectOptions": select_options.unwrap_or_default(),
                "defaultSelection": default_selection.unwrap_or_default(),
                "required": required != 0,
                "sortOrder": sort_order
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(fields) => ok(&req.id, json!({ "fields": fields })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_fields_form(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(ctx) = request_context(&req.params) else {
        return err(&req.id, "bad_params", "missing params.context", None);
    };
    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let title = str_param(&req.params, "title").unwrap_or_default();
    let record = form_record(&req.params);
    let extras = extra_fields(&req.params);
    let type_options = type_options_override(&req.params);

    match fields_form(conn, &ctx, &table, &title, &record, &extras, type_options) {
        Ok(html) => ok(&req.id, json!({ "html": html })),
        Err(e) => err(&req.id, "render_failed", e.to_string(), None),
    }
}

fn handle_fields_menu(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(ctx) = request_context(&req.params) else {
        return err(&req.id, "bad_params", "missing params.context", None);
    };
    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let selected_id = str_param(&req.params, "selectedId").unwrap_or_default();

    let category = if bool_param(&req.params, "categoriesDisabled").unwrap_or(false) {
        CategoryContext::Disabled
    } else if let Some(cid) = i64_param(&req.params, "categoryId") {
        CategoryContext::Fields(cid.to_string())
    } else {
        return err(
            &req.id,
            "bad_params",
            "missing categoryId (use categories.menu to list categories)",
            None,
        );
    };

    let fields_table = match naming::resolve_metadata_table(&table, MetadataKind::Fields) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let mut sql = format!("SELECT ID, TITLE, SORT_ORDER, TYPE FROM {}", fields_table);
    let mut params: Vec<SqlValue> = Vec::new();
    if let CategoryContext::Fields(cid) = &category {
        sql.push_str(" WHERE CATEGORY_ID = ?1");
        params.push(SqlValue::Integer(cid.parse().unwrap_or_default()));
    }
    sql.push_str(" ORDER BY SORT_ORDER, TITLE");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            let id: i64 = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let sort_order: Option<i64> = row.get(2)?;
            let type_key: Option<String> = row.get(3)?;
            Ok(ListRow {
                id: id.to_string(),
                title: title.unwrap_or_default(),
                sort_order: sort_order.map(|s| s.to_string()).unwrap_or_default(),
                type_key,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(rows) => ok(
            &req.id,
            json!({ "html": fields_menu(&rows, &selected_id, &ctx, &category) }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "fields.create" => Some(handle_fields_create(state, req)),
        "fields.save" => Some(handle_fields_save(state, req)),
        "fields.delete" => Some(handle_fields_delete(state, req)),
        "fields.list" => Some(handle_fields_list(state, req)),
        "fields.form" => Some(handle_fields_form(state, req)),
        "fields.menu" => Some(handle_fields_menu(state, req)),
        _ => None,
    }
}
