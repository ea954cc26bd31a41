//! Field category methods.
//!
//! Categories group fields for display. Deleting a category cascades to its
//! fields through the lifecycle manager. `table` is the entity table (e.g.
//! "STUDENTS") for save/delete/list/menu and the singular entity root for
//! `categories.form`, matching the metadata-table naming the forms post to.

use chrono::Utc;
use serde_json::json;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{extra_fields, form_record, i64_param, request_context, str_param};
use crate::ipc::types::{AppState, Request};
use crate::lifecycle;
use crate::naming::{self, MetadataKind};
use crate::render::form::{fields_form, NEW_SENTINEL};
use crate::render::list::{fields_menu, CategoryContext, ListRow};

fn handle_categories_save(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let categories_table = match naming::resolve_metadata_table(&table, MetadataKind::Categories) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let title = str_param(&req.params, "title").unwrap_or_default();
    let sort_order = i64_param(&req.params, "sortOrder");
    let now = Utc::now().to_rfc3339();

    let is_new = match str_param(&req.params, "id") {
        Some(ref s) if s == NEW_SENTINEL => true,
        Some(_) | None => i64_param(&req.params, "id").is_none(),
    };

    if is_new {
        let sequence = str_param(&req.params, "sequence")
            .unwrap_or_else(|| format!("{}_seq", categories_table.to_ascii_lowercase()));
        let category_id = match db::next_seq_value(conn, &sequence) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_insert_failed", e.to_string(), None),
        };
        if let Err(e) = conn.execute(
            &format!(
                "INSERT INTO {}(ID, TITLE, SORT_ORDER, UPDATED_AT) VALUES(?1, ?2, ?3, ?4)",
                categories_table
            ),
            (category_id, &title, sort_order, &now),
        ) {
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": categories_table })),
            );
        }
        return ok(&req.id, json!({ "id": category_id, "created": true }));
    }

    let id = i64_param(&req.params, "id").unwrap_or_default();
    match conn.execute(
        &format!(
            "UPDATE {} SET TITLE = ?1, SORT_ORDER = ?2, UPDATED_AT = ?3 WHERE ID = ?4",
            categories_table
        ),
        (&title, sort_order, &now, id),
    ) {
        Ok(changed) => ok(&req.id, json!({ "id": id, "updated": changed > 0 })),
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": categories_table })),
        ),
    }
}

fn handle_categories_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    match lifecycle::delete_category(conn, ctx.can_edit, &table, id) {
        Ok(true) => ok(&req.id, json!({ "deleted": true })),
        Ok(false) => err(
            &req.id,
            "bad_params",
            "category delete preconditions failed",
            None,
        ),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

fn handle_categories_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(table) = str_param(&req.params, "table") else {
        return err(&req.id, "bad_params", "missing table", None);
    };
    let categories_table = match naming::resolve_metadata_table(&table, MetadataKind::Categories) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(&format!(
        "SELECT ID, TITLE, SORT_ORDER FROM {} ORDER BY SORT_ORDER, TITLE",
        categories_table
    )) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let sort_order: Option<i64> = row.get(2)?;
            Ok(json!({
                "id": id,
                "title": title.unwrap_or_default(),
                "sortOrder": sort_order
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(categories) => ok(&req.id, json!({ "categories": categories })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_categories_form(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    match fields_form(conn, &ctx, &table, &title, &record, &extras, None) {
        Ok(html) => ok(&req.id, json!({ "html": html })),
        Err(e) => err(&req.id, "render_failed", e.to_string(), None),
    }
}

fn handle_categories_menu(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let categories_table = match naming::resolve_metadata_table(&table, MetadataKind::Categories) {
        Ok(t) => t,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(&format!(
        "SELECT ID, TITLE, SORT_ORDER FROM {} ORDER BY SORT_ORDER, TITLE",
        categories_table
    )) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let sort_order: Option<i64> = row.get(2)?;
            Ok(ListRow {
                id: id.to_string(),
                title: title.unwrap_or_default(),
                sort_order: sort_order.map(|s| s.to_string()).unwrap_or_default(),
                type_key: None,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(rows) => ok(
            &req.id,
            json!({ "html": fields_menu(&rows, &selected_id, &ctx, &CategoryContext::Categories) }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.save" => Some(handle_categories_save(state, req)),
        "categories.delete" => Some(handle_categories_delete(state, req)),
        "categories.list" => Some(handle_categories_list(state, req)),
        "categories.form" => Some(handle_categories_form(state, req)),
        "categories.menu" => Some(handle_categories_menu(state, req)),
        _ => None,
    }
}
