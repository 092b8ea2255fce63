// imgops-web-host library
// axum host for the image operations form

// Configuration
pub mod config;

// REST API and shared state
pub mod api;

// Page routes and router assembly
pub mod pages;
pub mod routes;

// Uploads, results and the operations themselves
pub mod processing;
pub mod storage;

// Embedded UI assets (single-binary distribution)
pub mod embedded;

pub use api::AppState;
pub use routes::app;
