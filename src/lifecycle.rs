//! Field and category lifecycle.
//!
//! Creating a field allocates a sequence ID and alters the owning entity
//! table to add the backing CUSTOM_<ID> column (plus an index for indexable
//! types). Deleting a field removes its metadata row and drops the column.
//! Deleting a category cascades over its fields inside one transaction.
//!
//! Precondition failures (no edit permission, empty or unregistered
//! arguments) return `None`/`false` with no side effect; database statement
//! failures surface as errors.

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::naming::{self, MetadataKind};
use crate::registry::FieldType;

/// Index naming kept asymmetric for compatibility with existing schemas:
/// STUDENTS indexes predate the generic convention.
fn index_root(table: &str) -> String {
    if table == "STUDENTS" {
        "CUSTOM_IND".to_string()
    } else {
        format!("{}_IND", table)
    }
}

/// Add a custom field column to `table`. Returns the allocated field ID, or
/// `None` when a precondition fails. The schema change is irreversible; if
/// index creation fails after the column add, the column remains.
pub fn create_field(
    conn: &Connection,
    can_edit: bool,
    table: &str,
    sequence: &str,
    type_key: &str,
) -> Result<Option<i64>> {
    if !can_edit || table.is_empty() || type_key.is_empty() {
        return Ok(None);
    }
    let Some(field_type) = FieldType::parse(type_key) else {
        return Ok(None);
    };
    if !naming::valid_identifier(table) {
        return Ok(None);
    }

    let id = db::next_seq_value(conn, sequence)?;

    conn.execute(
        &format!(
            "ALTER TABLE {} ADD CUSTOM_{} {}",
            table,
            id,
            field_type.sql_type()
        ),
        [],
    )?;

    if field_type.create_index() {
        conn.execute(
            &format!(
                "CREATE INDEX {}{} ON {} (CUSTOM_{})",
                index_root(table),
                id,
                table,
                id
            ),
            [],
        )?;
    }

    Ok(Some(id))
}

/// Delete a field: its metadata row, then its backing column. Returns `false`
/// when a precondition fails.
pub fn delete_field(conn: &Connection, can_edit: bool, table: &str, id: i64) -> Result<bool> {
    if !can_edit || table.is_empty() {
        return Ok(false);
    }

    let fields_table = naming::resolve_metadata_table(table, MetadataKind::Fields)?;

    conn.execute(
        &format!("DELETE FROM {} WHERE ID = ?1", fields_table),
        [id],
    )?;

    conn.execute(
        &format!("ALTER TABLE {} DROP COLUMN CUSTOM_{}", table, id),
        [],
    )?;

    Ok(true)
}

/// Delete a category and every field it owns. The cascade runs inside one
/// transaction: a failure on any child rolls the whole deletion back.
pub fn delete_category(conn: &Connection, can_edit: bool, table: &str, id: i64) -> Result<bool> {
    if !can_edit || table.is_empty() {
        return Ok(false);
    }

    let fields_table = naming::resolve_metadata_table(table, MetadataKind::Fields)?;
    let categories_table = naming::resolve_metadata_table(table, MetadataKind::Categories)?;

    let tx = conn.unchecked_transaction()?;

    let field_ids: Vec<i64> = {
        let mut stmt = tx.prepare(&format!(
            "SELECT ID FROM {} WHERE CATEGORY_ID = ?1",
            fields_table
        ))?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };

    for field_id in field_ids {
        delete_field(&tx, can_edit, table, field_id)?;
    }

    tx.execute(
        &format!("DELETE FROM {} WHERE ID = ?1", categories_table),
        [id],
    )?;

    tx.commit()?;

    Ok(true)
}
