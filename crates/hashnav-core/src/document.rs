#![forbid(unsafe_code)]

//! Host document seam.
//!
//! The engine never touches a DOM directly. Everything it needs from the
//! page (declared navigable elements, structure, tab markers and the URL
//! fragment) goes through [`Document`]. `hashnav-web` implements it over
//! `web-sys`; [`MemoryDocument`] implements it in memory for tests and
//! headless hosts.
//!
//! Methods take `&self`: a document is a handle to shared host state, the
//! same way a DOM node reference is.

mod memory;

pub use memory::{MemoryDocument, MemoryNode, NavLink};

/// An element that declared itself navigable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredElement {
    /// Element id (elements without an id are not reported).
    pub id: String,
    /// Handler name from the capability marker.
    pub handler: String,
    /// Raw configuration blob, if present.
    pub config: Option<String>,
    /// Protection flag set directly on the element.
    pub protected: bool,
}

impl DeclaredElement {
    #[must_use]
    pub fn new(id: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handler: handler.into(),
            config: None,
            protected: false,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    #[must_use]
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }
}

/// Read/write access to the page hosting the engine.
pub trait Document {
    /// Every element carrying the navigation capability marker, in document
    /// order.
    fn declared_elements(&self) -> Vec<DeclaredElement>;

    /// Whether an element with this id exists.
    fn contains(&self, id: &str) -> bool;

    /// Id of the closest element (the element itself included) whose
    /// handler is one of `container_handlers`.
    fn nearest_container(&self, id: &str, container_handlers: &[String]) -> Option<String>;

    /// Ids of navigable elements strictly inside `id`, in document order.
    fn navigable_descendants(&self, id: &str) -> Vec<String>;

    /// Tab id of the first visible element carrying a tab-membership marker.
    fn first_visible_parent_tab(&self) -> Option<String>;

    /// Mark the navigation link for `tab` active and every other inactive.
    fn set_active_tab(&self, tab: Option<&str>);

    /// Current fragment, without the leading `#`.
    fn fragment(&self) -> String;

    /// Replace the fragment. Hosts deliver the resulting change event
    /// asynchronously.
    fn set_fragment(&self, fragment: &str);

    /// Raw site-level default navigation blob, if declared.
    fn default_navigation(&self) -> Option<String> {
        None
    }
}
