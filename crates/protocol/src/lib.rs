//! Shared protocol types for imgops-web
//!
//! Defines the operation schema embedded in the page by the host and the
//! parameter form model the UI renders from it.

pub mod catalog;
pub mod form;
pub mod html;
pub mod operation;

pub use form::*;
pub use operation::*;

/// Element id of the `<script type="application/json">` carrying the catalog
pub const OPS_DATA_ID: &str = "ops-data";
/// Element id of the operation `<select>`
pub const OPERATION_SELECT_ID: &str = "operation";
/// Element id of the container the parameter fields are rendered into
pub const PARAMS_PANEL_ID: &str = "params";

/// Errors produced while reading operation definitions
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to parse operations JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
