#![forbid(unsafe_code)]

//! Previous/next state reconciliation.
//!
//! Before a new state is applied, elements addressed by the previous state
//! but not by the next one are put back to their default state. Elements
//! that live in the same container (page) as the next state are left alone,
//! so navigating within a page does not reset its siblings.
//!
//! Planning is pure: [`StateReconciler::plan`] reads the document and the
//! registry and returns a [`RestorePlan`] that the engine dispatches.

use crate::document::Document;
use crate::registry::HandlerRegistry;
use crate::state::NavigationState;

/// Elements to restore and elements kept by the same-container exception.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePlan {
    /// Container of the first next-state element that has one.
    pub next_container: Option<String>,
    /// `(element id, default state)` in previous-state order.
    pub restore: Vec<(String, String)>,
    /// Previous-state elements left untouched.
    pub kept: Vec<String>,
}

impl RestorePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restore.is_empty()
    }
}

/// Computes restore plans against a document and a registry.
pub struct StateReconciler<'a, D: Document + ?Sized> {
    document: &'a D,
    registry: &'a HandlerRegistry,
    container_handlers: &'a [String],
}

impl<'a, D: Document + ?Sized> StateReconciler<'a, D> {
    #[must_use]
    pub fn new(
        document: &'a D,
        registry: &'a HandlerRegistry,
        container_handlers: &'a [String],
    ) -> Self {
        Self {
            document,
            registry,
            container_handlers,
        }
    }

    fn container_of(&self, id: &str) -> Option<String> {
        self.document.nearest_container(id, self.container_handlers)
    }

    /// Plan the transition from `previous` to a non-empty `next`.
    #[must_use]
    pub fn plan(&self, previous: &NavigationState, next: &NavigationState) -> RestorePlan {
        let next_container = next.ids().find_map(|id| self.container_of(id));
        let mut plan = RestorePlan {
            next_container,
            ..RestorePlan::default()
        };

        for id in previous.ids().filter(|id| !next.contains(id)) {
            let same_page = plan
                .next_container
                .as_deref()
                .is_some_and(|target| self.container_of(id).as_deref() == Some(target));
            if same_page {
                plan.kept.push(id.to_owned());
            } else {
                plan.restore
                    .push((id.to_owned(), self.registry.default_state(id).to_owned()));
            }
        }

        tracing::debug!(
            next_container = plan.next_container.as_deref().unwrap_or(""),
            restore = plan.restore.len(),
            kept = plan.kept.len(),
            "restore plan computed"
        );
        plan
    }

    /// Plan for an empty fragment: every registered element back to its
    /// default, in registration order.
    #[must_use]
    pub fn plan_restore_all(&self) -> RestorePlan {
        RestorePlan {
            next_container: None,
            restore: self
                .registry
                .iter()
                .map(|e| (e.id.clone(), e.default_state.clone()))
                .collect(),
            kept: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::document::{MemoryDocument, MemoryNode};
    use crate::error::HandlerError;
    use crate::state::{ElementState, Parameters};
    use pretty_assertions::assert_eq;

    fn setup() -> (MemoryDocument, HandlerRegistry, Vec<String>) {
        let doc = MemoryDocument::new();
        doc.add(MemoryNode::new("pageX").handler("page"))
            .add(MemoryNode::new("childA").handler("widget").parent("pageX"))
            .add(MemoryNode::new("childB").handler("widget").parent("pageX"))
            .add(MemoryNode::new("pageY").handler("page"))
            .add(MemoryNode::new("childC").handler("widget").parent("pageY"))
            .add(MemoryNode::new("floating").handler("widget"));

        let mut registry = HandlerRegistry::new();
        registry.register_handler("page", |_: &str, _: &str, _: &Parameters| {
            Ok::<_, HandlerError>(true)
        });
        registry.register_handler("widget", |_: &str, _: &str, _: &Parameters| Ok(true));
        registry.discover(&doc);
        registry
            .register("childA", "widget", NavConfig::default().with_default_state("hidden"))
            .unwrap();
        (doc, registry, vec!["page".to_owned()])
    }

    fn state(ids: &[&str]) -> NavigationState {
        ids.iter()
            .map(|id| ((*id).to_owned(), ElementState::visible()))
            .collect()
    }

    #[test]
    fn same_container_sibling_is_kept() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(&state(&["childA"]), &state(&["childB"]));
        assert_eq!(plan.next_container.as_deref(), Some("pageX"));
        assert!(plan.restore.is_empty());
        assert_eq!(plan.kept, vec!["childA"]);
    }

    #[test]
    fn different_container_sibling_is_restored() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(&state(&["childA"]), &state(&["childC"]));
        assert_eq!(plan.next_container.as_deref(), Some("pageY"));
        assert_eq!(plan.restore, vec![("childA".into(), "hidden".into())]);
        assert!(plan.kept.is_empty());
    }

    #[test]
    fn container_is_its_own_nearest_container() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(&state(&["pageX"]), &state(&["childB"]));
        assert_eq!(plan.kept, vec!["pageX"]);

        let plan = reconciler.plan(&state(&["pageX", "childA"]), &state(&["pageY"]));
        assert_eq!(
            plan.restore,
            vec![
                ("pageX".into(), "visible".into()),
                ("childA".into(), "hidden".into())
            ]
        );
    }

    #[test]
    fn first_next_entry_with_a_container_wins() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(
            &state(&["childA", "childC"]),
            &state(&["floating", "ghost", "childB", "childC"]),
        );
        assert_eq!(plan.next_container.as_deref(), Some("pageX"));
        assert_eq!(plan.kept, vec!["childA"]);
    }

    #[test]
    fn no_next_container_restores_everything_not_in_next() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(&state(&["floating", "childA"]), &state(&["ghost"]));
        assert_eq!(plan.next_container, None);
        assert_eq!(
            plan.restore,
            vec![
                ("floating".into(), "visible".into()),
                ("childA".into(), "hidden".into())
            ]
        );
    }

    #[test]
    fn entries_kept_in_next_are_not_restored() {
        let (doc, registry, containers) = setup();
        let reconciler = StateReconciler::new(&doc, &registry, &containers);
        let plan = reconciler.plan(&state(&["childC", "pageY"]), &state(&["pageX", "pageY"]));
        assert_eq!(plan.restore, vec![("childC".into(), "visible".into())]);
    }

    #[test]
    fn restore_all_covers_registry_in_order() {
        let (doc, registry, containers) = setup();
        let plan = StateReconciler::new(&doc, &registry, &containers).plan_restore_all();
        let ids: Vec<_> = plan.restore.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["pageX", "childA", "childB", "pageY", "childC", "floating"]);
        assert_eq!(plan.restore[1].1, "hidden");
    }
}
