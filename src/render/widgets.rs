//! Small HTML widget builders the form and list renderers are assembled from.
//!
//! Values and names are escaped; `label` arguments may carry markup (red
//! required flags, tooltips) and are emitted as-is.

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn text_input(value: &str, name: &str, label: &str, extra: &str) -> String {
    let extra = if extra.is_empty() {
        String::new()
    } else {
        format!(" {}", extra)
    };
    format!(
        "<label>{}<br /><input type=\"text\" name=\"{}\" value=\"{}\"{} /></label>",
        label,
        escape(name),
        escape(value),
        extra
    )
}

pub fn select_input(value: &str, name: &str, label: &str, options: &[(String, String)]) -> String {
    let mut html = format!(
        "<label>{}<br /><select name=\"{}\">",
        label,
        escape(name)
    );
    for (key, text) in options {
        let selected = if key == value { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            escape(key),
            selected,
            escape(text)
        ));
    }
    html.push_str("</select></label>");
    html
}

pub fn textarea_input(value: &str, name: &str, label: &str, rows: u32, cols: u32) -> String {
    format!(
        "<label>{}<br /><textarea name=\"{}\" rows=\"{}\" cols=\"{}\">{}</textarea></label>",
        label,
        escape(name),
        rows,
        cols,
        escape(value)
    )
}

pub fn checkbox_input(checked: bool, name: &str, label: &str) -> String {
    let checked = if checked { " checked" } else { "" };
    format!(
        "<label><input type=\"checkbox\" name=\"{}\" value=\"Y\"{} /> {}</label>",
        escape(name),
        checked,
        label
    )
}

/// Read-only display of a value, used where an input is not allowed.
pub fn no_input(value: &str, label: &str) -> String {
    format!("<label>{}<br />{}</label>", label, escape(value))
}

pub fn submit_button(label: &str) -> String {
    format!("<input type=\"submit\" value=\"{}\" />", escape(label))
}

/// Header bar with a title on the left and action buttons on the right.
pub fn header_bar(left: &str, right: &str) -> String {
    if right.is_empty() {
        format!("<div class=\"header\">{}</div>", left)
    } else {
        format!(
            "<div class=\"header\">{}<div class=\"header-buttons\">{}</div></div>",
            left, right
        )
    }
}
