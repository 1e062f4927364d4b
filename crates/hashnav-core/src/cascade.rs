#![forbid(unsafe_code)]

//! Default-state cascade into nested components.
//!
//! When an element addressed by the fragment is dispatched, its navigable
//! descendants that the fragment does not address receive their own
//! default state, so components inside a revealed container always get an
//! initialization call. A descendant is cascaded at most once per cycle.

use std::collections::HashSet;

use crate::document::Document;
use crate::registry::HandlerRegistry;
use crate::state::NavigationState;

/// Per-cycle cascade bookkeeping. Create one per navigation cycle.
#[derive(Debug, Default)]
pub struct ChildCascadeTrigger {
    seen: HashSet<String>,
}

impl ChildCascadeTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(descendant id, default state)` pairs to dispatch for `parent`.
    ///
    /// Skips `parent` itself, keys of `next` (the main loop handles those)
    /// and descendants already cascaded this cycle.
    pub fn collect<D: Document + ?Sized>(
        &mut self,
        document: &D,
        registry: &HandlerRegistry,
        parent: &str,
        next: &NavigationState,
    ) -> Vec<(String, String)> {
        let targets: Vec<(String, String)> = document
            .navigable_descendants(parent)
            .into_iter()
            .filter(|child| child != parent && !next.contains(child))
            .filter(|child| self.seen.insert(child.clone()))
            .map(|child| {
                let state = registry.default_state(&child).to_owned();
                (child, state)
            })
            .collect();
        if !targets.is_empty() {
            tracing::debug!(element = parent, children = targets.len(), "cascading default states");
        }
        targets
    }

    /// Number of descendants cascaded so far.
    #[must_use]
    pub fn cascaded(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::document::{MemoryDocument, MemoryNode};
    use crate::state::{ElementState, Parameters};
    use pretty_assertions::assert_eq;

    fn setup() -> (MemoryDocument, HandlerRegistry) {
        let doc = MemoryDocument::new();
        doc.add(MemoryNode::new("page").handler("h"))
            .add(MemoryNode::new("section").handler("h").parent("page"))
            .add(MemoryNode::new("slider").handler("h").parent("section"))
            .add(MemoryNode::new("modal").handler("h").parent("page"));
        let mut registry = HandlerRegistry::new();
        registry.register_handler("h", |_: &str, _: &str, _: &Parameters| Ok(true));
        registry.discover(&doc);
        registry
            .register("modal", "h", NavConfig::default().with_default_state("closed"))
            .unwrap();
        (doc, registry)
    }

    #[test]
    fn descendants_get_their_defaults() {
        let (doc, registry) = setup();
        let next = NavigationState::single("page", ElementState::visible());
        let mut cascade = ChildCascadeTrigger::new();
        assert_eq!(
            cascade.collect(&doc, &registry, "page", &next),
            vec![
                ("section".to_owned(), "visible".to_owned()),
                ("slider".to_owned(), "visible".to_owned()),
                ("modal".to_owned(), "closed".to_owned()),
            ]
        );
    }

    #[test]
    fn next_keys_are_not_cascaded() {
        let (doc, registry) = setup();
        let next = NavigationState::new()
            .with("page", ElementState::visible())
            .with("modal", ElementState::new("open"));
        let mut cascade = ChildCascadeTrigger::new();
        let ids: Vec<_> = cascade
            .collect(&doc, &registry, "page", &next)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["section", "slider"]);
    }

    #[test]
    fn nested_parents_cascade_each_child_once() {
        let (doc, registry) = setup();
        let next = NavigationState::new()
            .with("page", ElementState::visible())
            .with("section", ElementState::visible());
        let mut cascade = ChildCascadeTrigger::new();
        let from_page = cascade.collect(&doc, &registry, "page", &next);
        let from_section = cascade.collect(&doc, &registry, "section", &next);
        assert_eq!(from_page.len(), 2);
        assert!(from_section.is_empty());
        assert_eq!(cascade.cascaded(), 2);
    }
}
