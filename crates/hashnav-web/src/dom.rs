#![forbid(unsafe_code)]

//! [`Document`] over the browser DOM.
//!
//! DOM calls that can throw (selector syntax, detached nodes) are logged
//! and treated as "nothing found".

use hashnav_core::config::DomConventions;
use hashnav_core::document::{DeclaredElement, Document};
use wasm_bindgen::JsCast;
use web_sys::{Element, NodeList, Window};

use crate::{guard, selectors};

/// Browser page handle.
#[derive(Debug, Clone)]
pub struct WebDocument {
    window: Window,
    document: web_sys::Document,
    dom: DomConventions,
    navigable: String,
    visible_tab: String,
}

impl WebDocument {
    #[must_use]
    pub fn new(window: Window, document: web_sys::Document, dom: DomConventions) -> Self {
        Self {
            navigable: selectors::navigable(&dom),
            visible_tab: selectors::visible_tab_marker(&dom),
            window,
            document,
            dom,
        }
    }

    fn element(&self, id: &str) -> Option<Element> {
        if id.is_empty() {
            return None;
        }
        self.document.get_element_by_id(id)
    }

    fn query_all(&self, scope: Option<&Element>, selector: &str) -> Vec<Element> {
        let found = match scope {
            Some(el) => el.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        };
        match found {
            Ok(list) => elements(&list),
            Err(err) => {
                tracing::warn!(selector, error = ?err, "selector query failed");
                Vec::new()
            }
        }
    }

    fn query_one(&self, selector: &str) -> Option<Element> {
        self.document
            .query_selector(selector)
            .inspect_err(|err| tracing::warn!(selector, error = ?err, "selector query failed"))
            .ok()
            .flatten()
    }
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

impl Document for WebDocument {
    fn declared_elements(&self) -> Vec<DeclaredElement> {
        self.query_all(None, &self.navigable)
            .into_iter()
            .filter_map(|el| {
                let id = el.id();
                let handler = el.get_attribute(&self.dom.handler_attr)?;
                if id.is_empty() || handler.is_empty() {
                    return None;
                }
                let protected =
                    el.get_attribute(&self.dom.protected_attr).as_deref() == Some("true");
                let mut declared = DeclaredElement::new(id, handler).with_protected(protected);
                declared.config = el.get_attribute(&self.dom.config_attr);
                Some(declared)
            })
            .collect()
    }

    fn contains(&self, id: &str) -> bool {
        self.element(id).is_some()
    }

    fn nearest_container(&self, id: &str, container_handlers: &[String]) -> Option<String> {
        let selector = selectors::container(&self.dom, container_handlers)?;
        let el = self.element(id)?;
        el.closest(&selector)
            .inspect_err(|err| {
                tracing::warn!(selector = %selector, error = ?err, "closest() failed");
            })
            .ok()
            .flatten()
            .map(|c| c.id())
            .filter(|cid| !cid.is_empty())
    }

    fn navigable_descendants(&self, id: &str) -> Vec<String> {
        let Some(el) = self.element(id) else {
            return Vec::new();
        };
        self.query_all(Some(&el), &self.navigable)
            .into_iter()
            .map(|child| child.id())
            .filter(|cid| !cid.is_empty() && cid != id)
            .collect()
    }

    fn first_visible_parent_tab(&self) -> Option<String> {
        self.query_one(&self.visible_tab)?
            .get_attribute(&self.dom.parent_tab_attr)
            .filter(|tab| !tab.is_empty())
    }

    fn set_active_tab(&self, tab: Option<&str>) {
        for link in self.query_all(None, &self.dom.nav_link_selector) {
            let classes = link.class_list();
            guard::warn_on_err(classes.remove_1(&self.dom.active_class), "classList.remove");
            let Some(tab) = tab else {
                continue;
            };
            let matches = [&self.dom.tab_id_attr, &self.dom.target_attr]
                .iter()
                .any(|attr| link.get_attribute(attr).as_deref() == Some(tab));
            if matches {
                guard::warn_on_err(classes.add_1(&self.dom.active_class), "classList.add");
            }
        }
    }

    fn fragment(&self) -> String {
        self.window
            .location()
            .hash()
            .map(|h| h.trim_start_matches('#').to_owned())
            .unwrap_or_default()
    }

    fn set_fragment(&self, fragment: &str) {
        if let Err(err) = self.window.location().set_hash(fragment) {
            tracing::warn!(fragment, error = ?err, "failed to write location hash");
        }
    }

    fn default_navigation(&self) -> Option<String> {
        self.query_one(&self.dom.site_container_selector)?
            .get_attribute(&self.dom.default_navigation_attr)
    }
}
