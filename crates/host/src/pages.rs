//! Server-rendered HTML pages
//!
//! The index page carries the catalog as JSON in `script#ops-data`; the wasm
//! UI reads it and keeps `#params` in sync with `#operation`. The first
//! operation's fields are rendered here too so the form is usable before
//! the wasm module loads.

use std::fmt::Write;

use imgops_web_protocol::html::{escape, fields_html, script_safe_json};
use imgops_web_protocol::{OperationSet, ParamFormRenderer, OPERATION_SELECT_ID, OPS_DATA_ID, PARAMS_PANEL_ID};

use crate::storage::ALLOWED_EXTENSIONS;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn alert(error: Option<&str>) -> String {
    error
        .filter(|e| !e.is_empty())
        .map(|e| format!(r#"<div class="alert" role="alert">{}</div>"#, escape(e)))
        .unwrap_or_default()
}

/// Upload form with the operation selector and parameter panel
pub fn render_index(renderer: &ParamFormRenderer, error: Option<&str>) -> String {
    let operations: &OperationSet = renderer.operations();

    let mut options = String::new();
    for op in operations {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            escape(&op.name),
            escape(op.display_label())
        );
    }

    let initial_fields = operations
        .iter()
        .next()
        .map(|op| fields_html(&renderer.fields(&op.name)))
        .unwrap_or_default();

    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    let body = format!(
        r#"<h1>Image Operations</h1>
{alert}
<form class="card" action="/process" method="post" enctype="multipart/form-data">
<div class="row">
<div class="col-md-6"><label class="form-label" for="image">Image</label><input class="form-control" type="file" id="image" name="image" accept="{accept}" required /></div>
<div class="col-md-6"><label class="form-label" for="{OPERATION_SELECT_ID}">Operation</label><select class="form-select" id="{OPERATION_SELECT_ID}" name="operation">{options}</select></div>
</div>
<div class="row" id="{PARAMS_PANEL_ID}">{initial_fields}</div>
<p><button class="btn" type="submit">Process</button></p>
</form>
<script type="application/json" id="{OPS_DATA_ID}">{ops_json}</script>
<script type="module" src="/static/app.js"></script>"#,
        alert = alert(error),
        ops_json = script_safe_json(&operations.to_json()),
    );

    page("imgops-web", &body)
}

/// Processed image with download link
pub fn render_result(result_id: &str, image_url: &str) -> String {
    let body = format!(
        r#"<h1>Result</h1>
<div class="card result">
<img src="{url}" alt="Processed image {id}">
<p><a class="btn" href="/download/{id}">Download</a> <a href="/">Process another image</a></p>
</div>"#,
        url = escape(image_url),
        id = escape(result_id),
    );
    page("imgops-web - result", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgops_web_protocol::{catalog, Operation, Parameter};

    #[test]
    fn test_index_embeds_catalog() {
        let renderer = ParamFormRenderer::new(catalog::builtin());
        let html = render_index(&renderer, None);

        let start = html.find(r#"<script type="application/json" id="ops-data">"#).unwrap();
        let rest = &html[start..];
        let json_start = rest.find('>').unwrap() + 1;
        let json_end = rest.find("</script>").unwrap();
        let embedded = OperationSet::parse(&rest[json_start..json_end]).unwrap();
        assert_eq!(&embedded, renderer.operations());

        assert!(html.contains(r#"<option value="blur">Gaussian Blur</option>"#));
        assert!(!html.contains(r#"class="alert""#));
    }

    #[test]
    fn test_index_prerenders_first_operation() {
        let ops = OperationSet::new(vec![
            Operation::new("scale", "Scale").with_param(Parameter::float("factor", "Factor", 1.5)),
            Operation::new("other", "Other").with_param(Parameter::int("n", "N", 3)),
        ]);
        let html = render_index(&ParamFormRenderer::new(ops), None);
        assert!(html.contains(r#"id="param_factor" name="factor" type="number" step="any" value="1.5""#));
        assert!(!html.contains("param_n"));
    }

    #[test]
    fn test_index_escapes_error_and_script_payload() {
        let ops = OperationSet::new(vec![Operation::new("x", "</script><b>")]);
        let html = render_index(&ParamFormRenderer::new(ops), Some("<oops>"));
        assert!(html.contains("&lt;oops&gt;"));
        assert!(html.contains(r"<\/script><b>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn test_result_page() {
        let html = render_result("abc", "/results/abc.png");
        assert!(html.contains(r#"src="/results/abc.png""#));
        assert!(html.contains(r#"href="/download/abc""#));
    }
}
