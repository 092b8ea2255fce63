use imgops_web_protocol::html::{field_inner_html, FIELD_WRAPPER_CLASS};
use imgops_web_protocol::{
    FieldDescriptor, OperationSet, ParamFormRenderer, ParamPanel, OPERATION_SELECT_ID, OPS_DATA_ID,
    PARAMS_PANEL_ID,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element, Event, HtmlSelectElement};

/// Get document helper
pub fn get_document() -> Option<Document> {
    window().and_then(|w| w.document())
}

/// Read the operation list from `script#ops-data`.
///
/// A parse failure is logged to the console and yields an empty list.
pub fn read_embedded_operations(doc: &Document) -> OperationSet {
    let text = doc
        .get_element_by_id(OPS_DATA_ID)
        .map(|el| el.text_content().unwrap_or_default());

    OperationSet::from_embedded(text.as_deref()).unwrap_or_else(|e| {
        web_sys::console::error_2(
            &"Failed to parse operations JSON".into(),
            &e.to_string().into(),
        );
        OperationSet::default()
    })
}

/// `ParamPanel` backed by the `#params` container
pub struct DomPanel {
    doc: Document,
    container: Element,
}

impl DomPanel {
    pub fn find(doc: &Document) -> Option<Self> {
        doc.get_element_by_id(PARAMS_PANEL_ID).map(|container| Self {
            doc: doc.clone(),
            container,
        })
    }
}

impl ParamPanel for DomPanel {
    fn clear(&mut self) {
        self.container.set_inner_html("");
    }

    fn append(&mut self, field: &FieldDescriptor) {
        let Ok(col) = self.doc.create_element("div") else {
            return;
        };
        col.set_class_name(FIELD_WRAPPER_CLASS);
        col.set_inner_html(&field_inner_html(field));
        let _ = self.container.append_child(&col);
    }
}

/// Render the current selection, then re-render on every `change`
pub fn setup_operation_select(doc: &Document, renderer: ParamFormRenderer) -> Result<(), JsValue> {
    let Some(select) = doc
        .get_element_by_id(OPERATION_SELECT_ID)
        .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
    else {
        return Ok(());
    };

    let Some(mut panel) = DomPanel::find(doc) else {
        return Ok(());
    };

    renderer.render_params(&mut panel, &select.value());

    let on_change = Closure::wrap(Box::new(move |e: Event| {
        if let Some(target) = e
            .target()
            .and_then(|t| t.dyn_into::<HtmlSelectElement>().ok())
        {
            renderer.render_params(&mut panel, &target.value());
        }
    }) as Box<dyn FnMut(_)>);

    select.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;
    on_change.forget();

    Ok(())
}
