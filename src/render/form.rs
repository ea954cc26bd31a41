//! Field and category edit forms.
//!
//! One renderer covers both shapes: a record with a field ID renders the
//! field form, a record with only a category ID renders the category form.
//! The sentinel ID `"new"` switches to new-record mode. Output is a complete
//! form fragment the host UI submits back through its own handler.

use anyhow::{bail, Result};
use rusqlite::Connection;

use crate::naming;
use crate::registry::{self, FieldType};
use crate::render::widgets::{
    checkbox_input, escape, header_bar, no_input, select_input, submit_button, text_input,
    textarea_input,
};
use crate::render::RequestContext;

pub const NEW_SENTINEL: &str = "new";

/// Current data of the record being edited. Empty strings read as absent.
#[derive(Debug, Clone, Default)]
pub struct FormRecord {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub field_type: String,
    pub select_options: String,
    pub default_selection: String,
    pub required: bool,
    pub sort_order: String,
}

fn set(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Don't delete the first 4 student categories or the first 2 staff
/// categories; they ship with the application.
fn category_deletable(table: &str, category_id: &str) -> bool {
    let Ok(id) = category_id.parse::<i64>() else {
        return false;
    };
    (table != "STUDENT" || id > 4) && (table != "STAFF" || id > 2)
}

/// Render the edit form for a field or category record.
///
/// `table` is the singular entity root (e.g. "STUDENT", "SCHOOL") as used in
/// metadata table names. `type_options` overrides the data-type selector set;
/// `None` offers the full registry. `extra_category_fields` are pre-rendered
/// cells appended to the category form, packed three per row.
pub fn fields_form(
    conn: &Connection,
    ctx: &RequestContext,
    table: &str,
    title: &str,
    record: &FormRecord,
    extra_category_fields: &[String],
    type_options: Option<Vec<(String, String)>>,
) -> Result<String> {
    let id = set(&record.id);
    let category_id = set(&record.category_id);

    if table.is_empty() || (id.is_none() && category_id.is_none()) {
        return Ok(String::new());
    }
    if !naming::valid_identifier(table) {
        bail!("invalid entity root identifier: {:?}", table);
    }

    let new = id == Some(NEW_SENTINEL) || category_id == Some(NEW_SENTINEL);

    let mut action = format!("Modules.php?modname={}", escape(&ctx.modname));
    if let Some(cid) = category_id {
        if cid != NEW_SENTINEL {
            action.push_str(&format!("&amp;category_id={}", escape(cid)));
        }
    }
    if let Some(fid) = id {
        if fid != NEW_SENTINEL {
            action.push_str(&format!("&amp;id={}", escape(fid)));
        }
    }

    let full_table = if id.is_some() {
        let root = if table == "STUDENT" { "CUSTOM" } else { table };
        format!("{}_FIELDS", root)
    } else {
        format!("{}_FIELD_CATEGORIES", table)
    };

    let mut form = format!(
        "<form action=\"{}&amp;table={}\" method=\"POST\">",
        action, full_table
    );

    let mut delete_button = String::new();
    let deletable = id.is_some()
        || category_id
            .map(|cid| category_deletable(table, cid))
            .unwrap_or(false);
    if ctx.can_edit && !new && deletable {
        let delete_url = format!(
            "Modules.php?modname={}&modfunc=delete&category_id={}&id={}",
            escape(&ctx.modname),
            escape(category_id.unwrap_or("")),
            escape(id.unwrap_or(""))
        );
        delete_button = format!(
            "<input type=\"button\" value=\"Delete\" onclick=\"ajaxLink('{}');\" /> ",
            delete_url
        );
    }

    form.push_str(&header_bar(
        &escape(title),
        &format!("{}{}", delete_button, submit_button("Save")),
    ));

    let mut header = String::from("<table class=\"width-100p valign-top fixed-col\"><tr class=\"st\">");

    if let Some(fid) = id {
        // Field form.
        let name_label = if record.title.is_empty() {
            "<span class=\"legend-red\">Field Name</span>".to_string()
        } else {
            "Field Name".to_string()
        };
        header.push_str(&format!(
            "<td>{}</td>",
            text_input(&record.title, &format!("tables[{}][TITLE]", fid), &name_label, "")
        ));

        let mut options = type_options.unwrap_or_else(|| {
            registry::type_options()
                .into_iter()
                .map(|(k, l)| (k.to_string(), l.to_string()))
                .collect()
        });

        // Once a field exists, text-like pull-down types stay interchangeable
        // among themselves; every other type is frozen.
        let frozen = if new {
            false
        } else {
            match FieldType::parse(&record.field_type) {
                Some(t) if t.is_text_like() => {
                    options.retain(|(k, _)| {
                        FieldType::parse(k).map(FieldType::is_text_like).unwrap_or(false)
                    });
                    false
                }
                _ => true,
            }
        };
        let selector: Option<&[(String, String)]> = if frozen { None } else { Some(&options) };

        match selector {
            None => {
                header.push_str(&format!(
                    "<td>{}</td>",
                    no_input(&registry::type_label(&record.field_type), "Data Type")
                ));
            }
            Some(opts) => {
                let colspan = if category_id.is_none() {
                    " colspan=\"2\""
                } else {
                    ""
                };
                header.push_str(&format!(
                    "<td{}>{}</td>",
                    colspan,
                    select_input(
                        &record.field_type,
                        &format!("tables[{}][TYPE]", fid),
                        "Data Type",
                        opts
                    )
                ));
            }
        }

        if let Some(cid) = category_id {
            let categories_table = format!("{}_FIELD_CATEGORIES", table);
            let mut stmt = conn.prepare(&format!(
                "SELECT ID, TITLE FROM {} ORDER BY SORT_ORDER, TITLE",
                categories_table
            ))?;
            let category_options = stmt
                .query_map([], |row| {
                    let id: i64 = row.get(0)?;
                    let title: Option<String> = row.get(1)?;
                    Ok((id.to_string(), title.unwrap_or_default()))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            header.push_str(&format!(
                "<td>{}</td>",
                select_input(
                    cid,
                    &format!("tables[{}][CATEGORY_ID]", fid),
                    "Field Category",
                    &category_options
                )
            ));
        }
        // No category cell for entities without categories, e.g. schools.

        header.push_str("</tr><tr class=\"st\">");

        let current_has_options = FieldType::parse(&record.field_type)
            .map(FieldType::has_select_options)
            .unwrap_or(false);
        let offered_has_options = new
            && selector
                .map(|opts| {
                    opts.iter().any(|(k, _)| {
                        FieldType::parse(k)
                            .map(FieldType::has_select_options)
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false);
        if current_has_options || offered_has_options {
            let label = "Pull-Down/Auto Pull-Down/Coded Pull-Down/Select Multiple from Options\
                         <div class=\"tooltip\"><i>One per line</i></div>";
            header.push_str(&format!(
                "<td colspan=\"3\">{}</td>",
                textarea_input(
                    &record.select_options,
                    &format!("tables[{}][SELECT_OPTIONS]", fid),
                    label,
                    7,
                    40
                )
            ));
            header.push_str("</tr><tr class=\"st\">");
        }

        let default_label = "Default<div class=\"tooltip\"><i>For dates: YYYY-MM-DD<br />\
                             for checkboxes: Y</i></div>";
        header.push_str(&format!(
            "<td>{}</td>",
            text_input(
                &record.default_selection,
                &format!("tables[{}][DEFAULT_SELECTION]", fid),
                default_label,
                ""
            )
        ));

        header.push_str(&format!(
            "<td>{}</td>",
            checkbox_input(
                record.required || new,
                &format!("tables[{}][REQUIRED]", fid),
                "Required"
            )
        ));

        header.push_str(&format!(
            "<td>{}</td>",
            text_input(
                &record.sort_order,
                &format!("tables[{}][SORT_ORDER]", fid),
                "Sort Order",
                "size=\"5\""
            )
        ));

        header.push_str("</tr></table>");
    } else {
        // Category form.
        let cid = category_id.unwrap_or_default();
        let title_label = if record.title.is_empty() {
            "<span class=\"legend-red\">Title</span>".to_string()
        } else {
            "Title".to_string()
        };
        header.push_str(&format!(
            "<td>{}</td>",
            text_input(&record.title, &format!("tables[{}][TITLE]", cid), &title_label, "")
        ));

        header.push_str(&format!(
            "<td>{}</td>",
            text_input(
                &record.sort_order,
                &format!("tables[{}][SORT_ORDER]", cid),
                "Sort Order",
                "size=\"5\""
            )
        ));

        // Extra cells pack three per row; the last one stretches to fill.
        let mut i = 2usize;
        for extra_field in extra_category_fields {
            if i % 3 == 0 {
                header.push_str("</tr><tr class=\"st\">");
            }

            let mut colspan = 1;
            if i == extra_category_fields.len() + 1 {
                colspan = 3 - (i % 3);
            }

            header.push_str(&format!("<td colspan=\"{}\">{}</td>", colspan, extra_field));

            i += 1;
        }

        header.push_str("</tr></table>");
    }

    form.push_str(&header_bar(&header, ""));
    form.push_str("</form>");

    Ok(form)
}
