//! Field and category listings.
//!
//! One renderer covers both: listing the categories of an entity, listing the
//! fields of one category, or listing all fields for entities that have no
//! categories. The row matching the selected ID is highlighted and every
//! title links back into the module.

use crate::registry;
use crate::render::widgets::escape;
use crate::render::RequestContext;

/// Which listing is being rendered. The original encoded this as a category
/// ID parameter that could also be `'0'` (list categories) or `false`
/// (categories not applicable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryContext {
    /// Listing the categories themselves.
    Categories,
    /// Listing the fields of one category.
    Fields(String),
    /// Listing fields for an entity type without categories.
    Disabled,
}

#[derive(Debug, Clone, Default)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub sort_order: String,
    pub type_key: Option<String>,
}

/// Render the fields/categories menu. Returns an empty fragment when there is
/// nothing to list or no selection to anchor the menu on.
pub fn fields_menu(
    rows: &[ListRow],
    selected_id: &str,
    ctx: &RequestContext,
    category: &CategoryContext,
) -> String {
    if rows.is_empty() || selected_id.is_empty() {
        return String::new();
    }

    let fields_list = !matches!(category, CategoryContext::Categories);

    let title_header = if fields_list { "Field" } else { "Category" };
    let mut columns = vec![title_header, "Sort Order"];
    if fields_list {
        columns.push("Data Type");
    }

    let mut row_link = format!("Modules.php?modname={}", escape(&ctx.modname));
    if let CategoryContext::Fields(cid) = category {
        row_link.push_str(&format!("&amp;category_id={}", escape(cid)));
    }
    let link_variable = if matches!(category, CategoryContext::Categories) {
        "category_id"
    } else {
        "id"
    };

    let add_link = format!(
        "Modules.php?modname={}&amp;category_id={}",
        escape(&ctx.modname),
        match category {
            CategoryContext::Fields(cid) => format!("{}&amp;id=new", escape(cid)),
            CategoryContext::Disabled => "&amp;id=new".to_string(),
            CategoryContext::Categories => "new".to_string(),
        }
    );

    let (singular, plural) = if fields_list {
        ("Field", "Fields")
    } else {
        ("Field Category", "Field Categories")
    };

    let mut html = String::from("<div class=\"list-wrapper\"><table class=\"list\"><thead><tr>");
    for column in &columns {
        html.push_str(&format!("<th>{}</th>", column));
    }
    html.push_str("</tr></thead><tbody>");

    for row in rows {
        let highlighted = selected_id != "new" && row.id == selected_id;
        let class = if highlighted {
            " class=\"highlight-row\""
        } else {
            ""
        };
        html.push_str(&format!(
            "<tr{}><td><a href=\"{}&amp;{}={}\">{}</a></td><td>{}</td>",
            class,
            row_link,
            link_variable,
            escape(&row.id),
            escape(&row.title),
            escape(&row.sort_order)
        ));
        if fields_list {
            let type_label = row
                .type_key
                .as_deref()
                .map(registry::type_label)
                .unwrap_or_default();
            html.push_str(&format!("<td>{}</td>", escape(&type_label)));
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html.push_str(&format!(
        "<div class=\"list-footer\">{} {} <a href=\"{}\">Add a {}</a></div></div>",
        rows.len(),
        if rows.len() == 1 { singular } else { plural },
        add_link,
        singular
    ));

    html
}
