//! Field markup shared by the host (server-side first paint) and the UI

use crate::form::FieldDescriptor;

/// Class of the wrapper element around each label/input pair
pub const FIELD_WRAPPER_CLASS: &str = "col-md-6";

/// Escape text for use in element content or a quoted attribute
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inner markup of one field wrapper: the label and its input
pub fn field_inner_html(field: &FieldDescriptor) -> String {
    let id = escape(&field.id);
    format!(
        r#"<label class="form-label" for="{id}">{label}</label><input class="form-control" id="{id}" name="{name}" type="{ty}" step="{step}" value="{value}" />"#,
        label = escape(&field.label),
        name = escape(&field.name),
        ty = field.input_type,
        step = field.step.as_str(),
        value = escape(&field.value),
    )
}

/// Markup for a whole panel, one wrapper per field
pub fn fields_html(fields: &[FieldDescriptor]) -> String {
    fields
        .iter()
        .map(|f| format!(r#"<div class="{FIELD_WRAPPER_CLASS}">{}</div>"#, field_inner_html(f)))
        .collect()
}

/// Make JSON safe to place inside a `<script>` element
pub fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}
