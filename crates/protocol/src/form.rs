//! Parameter form model
//!
//! Maps an [`Operation`] to the input fields shown for it and renders them
//! into any [`ParamPanel`]. The browser binds a panel to the `#params`
//! element; tests and the host use a plain `Vec<FieldDescriptor>`.

use serde_json::Number;

use crate::operation::{Operation, OperationSet, Parameter};

/// Step granularity of a numeric input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Any,
    One,
}

impl Step {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::One => "1",
        }
    }
}

/// Everything needed to draw one labeled input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Derived element id, `param_<name>`
    pub id: String,
    /// Raw parameter name, submitted as the form key
    pub name: String,
    pub label: String,
    pub input_type: &'static str,
    pub step: Step,
    /// Pre-filled value, empty when the parameter has no default
    pub value: String,
}

/// Element id for a parameter name
pub fn field_id(param_name: &str) -> String {
    format!("param_{param_name}")
}

/// Render a default the way a number prints in the browser (`90`, `1.5`, `1e+21`)
pub fn format_default(default: Option<&Number>) -> String {
    let Some(n) = default else {
        return String::new();
    };
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(js_number).unwrap_or_default()
    }
}

/// `Number.prototype.toString()`: exponent form outside `[1e-6, 1e21)`
fn js_number(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        return f.to_string();
    }
    // `{:e}` is the shortest round-trip mantissa, e.g. `1.5e-7`
    let exp = format!("{f:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if power.starts_with('-') => format!("{mantissa}e{power}"),
        Some((mantissa, power)) => format!("{mantissa}e+{power}"),
        None => exp,
    }
}

impl From<&Parameter> for FieldDescriptor {
    #[allow(clippy::if_same_then_else)]
    fn from(p: &Parameter) -> Self {
        // Both kinds are numeric inputs; only the step differs
        let input_type = if p.is_float() { "number" } else { "number" };
        let step = if p.is_float() { Step::Any } else { Step::One };
        Self {
            id: field_id(&p.name),
            name: p.name.clone(),
            label: p.label.clone(),
            input_type,
            step,
            value: format_default(p.default.as_ref()),
        }
    }
}

/// Field descriptors for an operation, in schema order
pub fn fields_for(op: &Operation) -> Vec<FieldDescriptor> {
    op.params.iter().map(FieldDescriptor::from).collect()
}

/// Render target for parameter fields
pub trait ParamPanel {
    /// Remove every field currently shown
    fn clear(&mut self);
    /// Append one field after the existing ones
    fn append(&mut self, field: &FieldDescriptor);
}

impl ParamPanel for Vec<FieldDescriptor> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn append(&mut self, field: &FieldDescriptor) {
        self.push(field.clone());
    }
}

/// Renders the parameter panel for the selected operation
#[derive(Debug, Clone, Default)]
pub struct ParamFormRenderer {
    operations: OperationSet,
}

impl ParamFormRenderer {
    pub fn new(operations: OperationSet) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &OperationSet {
        &self.operations
    }

    /// Fields for an operation name; empty when the name is unknown
    pub fn fields(&self, op_name: &str) -> Vec<FieldDescriptor> {
        self.operations.find(op_name).map(fields_for).unwrap_or_default()
    }

    /// Replace the panel contents with the fields of `op_name`
    pub fn render_params<P: ParamPanel + ?Sized>(&self, panel: &mut P, op_name: &str) {
        panel.clear();
        let Some(op) = self.operations.find(op_name) else {
            return;
        };
        for field in fields_for(op) {
            panel.append(&field);
        }
    }
}
