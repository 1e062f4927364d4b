#![forbid(unsafe_code)]

//! In-memory [`Document`] for tests and headless hosts.
//!
//! A `MemoryDocument` is a cheap, cloneable handle: clones share the same
//! tree, so handlers can hold one and toggle visibility while the engine
//! drives navigation through another.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{DeclaredElement, Document};

/// One element of the in-memory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryNode {
    pub id: String,
    pub parent: Option<String>,
    pub handler: Option<String>,
    pub config: Option<String>,
    pub protected: bool,
    pub parent_tab: Option<String>,
    pub hidden: bool,
}

impl MemoryNode {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    #[must_use]
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    #[must_use]
    pub fn parent_tab(mut self, tab: impl Into<String>) -> Self {
        self.parent_tab = Some(tab.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A navigation link (tab) in the site header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub tab_id: String,
    pub active: bool,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: IndexMap<String, MemoryNode>,
    links: Vec<NavLink>,
    fragment: String,
    fragment_writes: Vec<String>,
    default_navigation: Option<String>,
}

impl Inner {
    /// `id` followed by its ancestors, nearest first.
    fn ancestry<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a MemoryNode> + 'a {
        let mut next = self.nodes.get(id);
        let mut steps = 0usize;
        let limit = self.nodes.len();
        std::iter::from_fn(move || {
            let node = next?;
            steps += 1;
            // A malformed parent cycle must not spin forever.
            next = if steps > limit {
                None
            } else {
                node.parent.as_deref().and_then(|p| self.nodes.get(p))
            };
            Some(node)
        })
    }

    fn is_strict_descendant(&self, node: &MemoryNode, ancestor: &str) -> bool {
        self.ancestry(&node.id).skip(1).any(|n| n.id == ancestor)
    }
}

/// Shared in-memory document tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node (document order is insertion order). A node with an
    /// existing id replaces it in place.
    pub fn add(&self, node: MemoryNode) -> &Self {
        let mut inner = self.inner.borrow_mut();
        inner.nodes.insert(node.id.clone(), node);
        self
    }

    /// Remove a node. Its children keep pointing at the missing parent.
    pub fn remove(&self, id: &str) -> Option<MemoryNode> {
        self.inner.borrow_mut().nodes.shift_remove(id)
    }

    /// Append a navigation link.
    pub fn add_link(&self, tab_id: impl Into<String>) -> &Self {
        self.inner.borrow_mut().links.push(NavLink {
            tab_id: tab_id.into(),
            active: false,
        });
        self
    }

    /// Declare the site default navigation blob.
    pub fn set_default_navigation(&self, raw: impl Into<String>) {
        self.inner.borrow_mut().default_navigation = Some(raw.into());
    }

    /// Set the fragment without recording it as a navigation write (e.g. the
    /// URL the page was loaded with).
    pub fn load_fragment(&self, fragment: &str) {
        self.inner.borrow_mut().fragment = fragment.trim_start_matches('#').to_owned();
    }

    /// Toggle the hidden marker on an element.
    pub fn set_hidden(&self, id: &str, hidden: bool) {
        if let Some(node) = self.inner.borrow_mut().nodes.get_mut(id) {
            node.hidden = hidden;
        }
    }

    #[must_use]
    pub fn is_hidden(&self, id: &str) -> Option<bool> {
        self.inner.borrow().nodes.get(id).map(|n| n.hidden)
    }

    /// Tab ids of links currently marked active.
    #[must_use]
    pub fn active_tabs(&self) -> Vec<String> {
        self.inner
            .borrow()
            .links
            .iter()
            .filter(|l| l.active)
            .map(|l| l.tab_id.clone())
            .collect()
    }

    /// Every fragment written through [`Document::set_fragment`].
    #[must_use]
    pub fn fragment_writes(&self) -> Vec<String> {
        self.inner.borrow().fragment_writes.clone()
    }

    /// Drain recorded fragment writes.
    pub fn take_fragment_writes(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.borrow_mut().fragment_writes)
    }
}

impl Document for MemoryDocument {
    fn declared_elements(&self) -> Vec<DeclaredElement> {
        self.inner
            .borrow()
            .nodes
            .values()
            .filter(|n| !n.id.is_empty())
            .filter_map(|n| {
                let handler = n.handler.clone()?;
                Some(DeclaredElement {
                    id: n.id.clone(),
                    handler,
                    config: n.config.clone(),
                    protected: n.protected,
                })
            })
            .collect()
    }

    fn contains(&self, id: &str) -> bool {
        self.inner.borrow().nodes.contains_key(id)
    }

    fn nearest_container(&self, id: &str, container_handlers: &[String]) -> Option<String> {
        let inner = self.inner.borrow();
        inner
            .ancestry(id)
            .find(|n| {
                n.handler
                    .as_deref()
                    .is_some_and(|h| container_handlers.iter().any(|c| c == h))
            })
            .map(|n| n.id.clone())
    }

    fn navigable_descendants(&self, id: &str) -> Vec<String> {
        let inner = self.inner.borrow();
        if !inner.nodes.contains_key(id) {
            return Vec::new();
        }
        inner
            .nodes
            .values()
            .filter(|n| n.handler.is_some() && !n.id.is_empty() && n.id != id)
            .filter(|n| inner.is_strict_descendant(n, id))
            .map(|n| n.id.clone())
            .collect()
    }

    fn first_visible_parent_tab(&self) -> Option<String> {
        self.inner
            .borrow()
            .nodes
            .values()
            .find(|n| n.parent_tab.is_some() && !n.hidden)
            .and_then(|n| n.parent_tab.clone())
    }

    fn set_active_tab(&self, tab: Option<&str>) {
        for link in &mut self.inner.borrow_mut().links {
            link.active = tab.is_some_and(|t| t == link.tab_id);
        }
    }

    fn fragment(&self) -> String {
        self.inner.borrow().fragment.clone()
    }

    fn set_fragment(&self, fragment: &str) {
        let mut inner = self.inner.borrow_mut();
        let fragment = fragment.trim_start_matches('#').to_owned();
        inner.fragment_writes.push(fragment.clone());
        inner.fragment = fragment;
    }

    fn default_navigation(&self) -> Option<String> {
        self.inner.borrow().default_navigation.clone()
    }
}
