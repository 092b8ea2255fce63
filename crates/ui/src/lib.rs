//! Browser side of imgops-web
//!
//! Renders the parameter inputs of the operation selected in `#operation`
//! into `#params`, using the catalog the host embeds in `#ops-data`.

mod dom;

use imgops_web_protocol::ParamFormRenderer;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let Some(document) = dom::get_document() else {
        return Ok(());
    };

    let operations = dom::read_embedded_operations(&document);
    web_sys::console::debug_1(&format!("[ui] {} operations loaded", operations.len()).into());

    dom::setup_operation_select(&document, ParamFormRenderer::new(operations))
}
