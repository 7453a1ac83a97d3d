//! HTTP retrieval of shader sources.

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Response, Window};

use crate::error::Error;
use crate::session::SourceFetcher;

/// Shader source fetcher using the `fetch()` API of the browser.
pub struct HttpFetcher {
    window: Window,
}

impl HttpFetcher {
    /// Creates a fetcher that issues requests through `window`.
    pub fn new(window: Window) -> HttpFetcher {
        HttpFetcher { window }
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<String, Error> {
        let failed = |status, reason| Error::Fetch {
            path: path.to_string(),
            status,
            reason,
        };
        let response = JsFuture::from(self.window.fetch_with_str(path))
            .await
            .map_err(|e| failed(0, error_message(&e)))?
            .dyn_into::<Response>()
            .map_err(|_| failed(0, "fetch did not return a Response".to_string()))?;
        if !response.ok() {
            return Err(failed(response.status(), response.status_text()));
        }
        response_to_string(&response)
            .await
            .map_err(|e| failed(response.status(), error_message(&e)))
    }
}

async fn response_to_string(response: &Response) -> Result<String, JsValue> {
    Ok(JsFuture::from(response.text()?)
        .await?
        .as_string()
        .ok_or("unable to convert fetch text to string")?)
}

fn error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        error.message().into()
    } else {
        value
            .as_string()
            .unwrap_or_else(|| "network error".to_string())
    }
}
