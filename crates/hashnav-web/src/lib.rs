#![forbid(unsafe_code)]

//! WASM frontend for hashnav.
//!
//! Exposes [`HashNavigator`] to JavaScript: it discovers navigable elements
//! in the page, listens for `hashchange`, awaits the site's content loader
//! and drives the [`hashnav_core`] engine. Handlers are plain JS functions
//! registered by name.
//!
//! The JSON conversions, selectors, engine borrows and console formatting live in
//! target-independent modules so they are tested natively.

pub mod console;
pub mod convert;
pub mod guard;
pub mod selectors;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use dom::WebDocument;
#[cfg(target_arch = "wasm32")]
pub use wasm::HashNavigator;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct HashNavigator;

#[cfg(not(target_arch = "wasm32"))]
impl HashNavigator {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
