//! Version information about zset-wasm.

use wasm_bindgen::prelude::*;

/// Gives the zset-wasm version as a `String`.
#[wasm_bindgen]
pub fn zset_wasm_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Gives the version of the git repository as a `String`.
#[wasm_bindgen]
pub fn zset_wasm_git_version() -> String {
    git_version::git_version!(fallback = "unknown").to_string()
}
