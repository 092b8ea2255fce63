//! Embedded UI assets for single-binary distribution
//!
//! Uses rust-embed to compile the wasm bundle (`pkg/`, produced by
//! `wasm-pack build crates/ui --target web`) and the static files into the
//! binary. In debug mode, files are loaded from disk.

use rust_embed::RustEmbed;

/// Embedded UI assets from the ui crate directory
#[derive(RustEmbed)]
#[folder = "../ui/"]
#[include = "pkg/*.js"]
#[include = "pkg/*.wasm"]
#[include = "static/*"]
pub struct UiAssets;

/// Get a file from embedded assets with proper MIME type
pub fn get_asset(path: &str) -> Option<(Vec<u8>, &'static str)> {
    let path = path.trim_start_matches('/');

    UiAssets::get(path).map(|file| {
        let mime = if std::path::Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("js"))
        {
            "application/javascript"
        } else {
            mime_guess::from_path(path)
                .first_raw()
                .unwrap_or("application/octet-stream")
        };
        (file.data.into_owned(), mime)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_exists() {
        assert!(UiAssets::get("static/style.css").is_some());
    }

    #[test]
    fn test_get_asset() {
        let (data, mime) = get_asset("/static/app.js").expect("app.js should exist");
        assert!(!data.is_empty());
        assert_eq!(mime, "application/javascript");
    }

    #[test]
    fn test_missing_asset() {
        assert!(get_asset("static/nope.txt").is_none());
        assert!(get_asset("Cargo.toml").is_none());
    }
}
