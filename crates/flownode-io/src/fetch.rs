//! SVG loading via the browser Fetch API.
//!
//! All functions in this module require a browser environment
//! (`wasm32-unknown-unknown` target).

use flownode_core::{LoadError, SourceLoader};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// [`SourceLoader`] backed by `window.fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchLoader;

impl SourceLoader for FetchLoader {
    #[allow(clippy::future_not_send)] // WASM is single-threaded; JsFuture is !Send
    async fn load(&self, locator: &str) -> Result<String, LoadError> {
        fetch_text(locator).await
    }
}

/// Fetch `locator` and return the response body as text.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] for a 404, [`LoadError::Http`] for any
/// other non-2xx status, and [`LoadError::Network`] when the request
/// fails or the browser objects are unavailable.
#[allow(clippy::future_not_send)] // WASM is single-threaded; JsFuture is !Send
pub async fn fetch_text(locator: &str) -> Result<String, LoadError> {
    let window = web_sys::window().ok_or_else(|| LoadError::Network("no global window".into()))?;
    log::debug!("fetching {locator}");

    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(locator))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;

    log::debug!("{locator}: HTTP {}", response.status());
    match response.status() {
        404 => return Err(LoadError::NotFound),
        status if !response.ok() => return Err(LoadError::Http { status }),
        _ => {}
    }

    let body = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?;
    body.as_string()
        .ok_or_else(|| LoadError::Network("response body is not text".into()))
}

fn network(value: JsValue) -> LoadError {
    LoadError::Network(format!("{value:?}"))
}
