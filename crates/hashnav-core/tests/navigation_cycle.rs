//! End-to-end navigation cycles over an in-memory document.
//!
//! Verifies:
//! 1. Same-container exception (kept on the same page, restored elsewhere)
//! 2. Protected gate (no handler call + redirect, normal call when authenticated)
//! 3. Cascade reaches each descendant once and never duplicates a fragment entry
//! 4. Empty fragment restores every element and clears the snapshot
//! 5. Failure isolation within a cycle
//! 6. Stale generations are discarded
//! 7. Missing primary target aborts without mutation
//! 8. Startup, auto navigation and logout redirect
//! 9. Loaded content is discovered before dispatch

use std::cell::RefCell;
use std::rc::Rc;

use hashnav_core::auth::SharedAuth;
use hashnav_core::config::EngineConfig;
use hashnav_core::dispatch::DispatchOutcome;
use hashnav_core::document::{Document, MemoryDocument, MemoryNode};
use hashnav_core::engine::{
    CycleStart, CycleStatus, DispatchOrigin, LoadOutcome, NavigationEngine, Startup,
};
use hashnav_core::error::{HandlerError, NavError};
use hashnav_core::state::{ElementState, NavigationState, Parameters};
use pretty_assertions::assert_eq;

// ── Harness ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    element: String,
    state: String,
    parameters: Parameters,
}

type CallLog = Rc<RefCell<Vec<Call>>>;

struct Site {
    engine: NavigationEngine<MemoryDocument, SharedAuth>,
    doc: MemoryDocument,
    auth: SharedAuth,
    calls: CallLog,
}

impl Site {
    fn new() -> Self {
        Self::with_document(Self::document())
    }

    fn document() -> MemoryDocument {
        let doc = MemoryDocument::new();
        let page = r#"{"defaultState":"hidden"}"#;
        doc.add(MemoryNode::new("pageX").handler("page").config(page).parent_tab("x-tab").hidden())
            .add(
                MemoryNode::new("childA")
                    .handler("widget")
                    .config(r#"{"defaultState":"collapsed"}"#)
                    .parent("pageX"),
            )
            .add(MemoryNode::new("childB").handler("widget").parent("pageX"))
            .add(MemoryNode::new("pageY").handler("page").config(page).parent_tab("y-tab").hidden())
            .add(MemoryNode::new("childC").handler("widget").parent("pageY"))
            .add(MemoryNode::new("gallery").handler("widget").parent("pageY"))
            .add(MemoryNode::new("slide").handler("widget").parent("gallery"))
            .add(
                MemoryNode::new("vault")
                    .handler("page")
                    .config(page)
                    .protected()
                    .parent_tab("vault-tab")
                    .hidden(),
            )
            .add(MemoryNode::new("broken").handler("fragile"))
            .add_link("x-tab")
            .add_link("y-tab")
            .add_link("vault-tab");
        doc
    }

    fn with_document(doc: MemoryDocument) -> Self {
        let auth = SharedAuth::new(false);
        let mut engine = NavigationEngine::new(
            doc.clone(),
            auth.clone(),
            EngineConfig::default()
                .with_container_handlers(["page"])
                .with_fallback_fragment("pageX"),
        );
        let calls: CallLog = Rc::default();

        let log = Rc::clone(&calls);
        let pages = doc.clone();
        engine.register_handler("page", move |id: &str, state: &str, params: &Parameters| {
            log.borrow_mut().push(Call {
                element: id.to_owned(),
                state: state.to_owned(),
                parameters: params.clone(),
            });
            pages.set_hidden(id, state != "visible");
            Ok(true)
        });
        let log = Rc::clone(&calls);
        engine.register_handler("widget", move |id: &str, state: &str, params: &Parameters| {
            log.borrow_mut().push(Call {
                element: id.to_owned(),
                state: state.to_owned(),
                parameters: params.clone(),
            });
            Ok(true)
        });
        let log = Rc::clone(&calls);
        engine.register_handler("fragile", move |id: &str, state: &str, params: &Parameters| {
            log.borrow_mut().push(Call {
                element: id.to_owned(),
                state: state.to_owned(),
                parameters: params.clone(),
            });
            Err(HandlerError::new("template missing"))
        });
        engine.rediscover();

        Self {
            engine,
            doc,
            auth,
            calls,
        }
    }

    fn take_calls(&self) -> Vec<(String, String)> {
        self.calls
            .borrow_mut()
            .drain(..)
            .map(|c| (c.element, c.state))
            .collect()
    }

    fn calls_for(&self, element: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.element == element)
            .map(|c| c.state.clone())
            .collect()
    }
}

fn pair(element: &str, state: &str) -> (String, String) {
    (element.to_owned(), state.to_owned())
}

// ── Same-container exception ──────────────────────────────────────────

#[test]
fn sibling_on_same_page_is_not_restored() {
    let mut site = Site::new();
    site.engine.handle_fragment_change("#childA");
    site.take_calls();

    let report = site.engine.handle_fragment_change("#childB");
    assert!(report.is_committed());
    assert_eq!(site.take_calls(), vec![pair("childB", "visible")]);
    assert_eq!(
        site.engine.previous_state(),
        &NavigationState::single("childA", ElementState::visible())
    );
}

#[test]
fn sibling_on_other_page_is_restored_to_default() {
    let mut site = Site::new();
    site.engine.handle_fragment_change("#childA");
    site.take_calls();

    let report = site.engine.handle_fragment_change("#childC");
    let restored: Vec<_> = report
        .dispatched
        .iter()
        .filter(|r| r.origin == DispatchOrigin::Restore)
        .map(|r| (r.element.as_str(), r.state.as_str()))
        .collect();
    assert_eq!(restored, vec![("childA", "collapsed")]);
    assert_eq!(
        site.take_calls(),
        vec![pair("childA", "collapsed"), pair("childC", "visible")]
    );
}

// ── Protected gate ────────────────────────────────────────────────────

#[test]
fn protected_element_is_blocked_and_redirected() {
    let mut site = Site::new();
    let report = site.engine.handle_fragment_change("#vault");

    assert!(site.calls_for("vault").is_empty());
    assert_eq!(report.redirected_to.as_deref(), Some("pageX"));
    assert_eq!(site.doc.fragment_writes(), vec!["pageX"]);
    assert!(report.errors.contains(&NavError::UnauthorizedAccess {
        element: "vault".into()
    }));
    assert!(!site.engine.current_state().contains("vault"));
}

#[test]
fn protected_element_dispatches_when_authenticated() {
    let mut site = Site::new();
    site.auth.set(true);
    let report = site.engine.handle_fragment_change("#vault");

    assert_eq!(site.calls_for("vault"), vec!["visible"]);
    assert_eq!(report.redirected_to, None);
    assert!(site.engine.is_element_in_state("vault", "visible"));
    assert_eq!(report.active_tab.as_deref(), Some("vault-tab"));
}

#[test]
fn loader_never_sees_protected_entries_without_auth() {
    let mut site = Site::new();
    let CycleStart::Pending(pending) = site.engine.begin_cycle("pageX|vault") else {
        panic!("expected pending cycle");
    };
    assert_eq!(
        pending.load_request(),
        &NavigationState::single("pageX", ElementState::visible())
    );
    assert_eq!(pending.next().len(), 2);
}

#[test]
fn fallback_pointing_at_blocked_element_redirects_to_empty() {
    let auth = SharedAuth::new(false);
    let doc = Site::document();
    let mut engine = NavigationEngine::new(
        doc.clone(),
        auth,
        EngineConfig::default()
            .with_container_handlers(["page"])
            .with_fallback_fragment("vault"),
    );
    engine.register_handler("page", |_: &str, _: &str, _: &Parameters| Ok(true));
    engine.rediscover();

    let report = engine.handle_fragment_change("vault");
    assert_eq!(report.redirected_to.as_deref(), Some(""));
    assert_eq!(doc.fragment_writes(), vec![""]);
}

// ── Cascade ───────────────────────────────────────────────────────────

#[test]
fn cascade_never_duplicates_fragment_entries() {
    let mut site = Site::new();
    let report = site.engine.handle_fragment_change("#pageY|slide/zoomed");

    assert_eq!(site.calls_for("slide"), vec!["zoomed"]);
    assert_eq!(site.calls_for("gallery"), vec!["visible"]);
    assert_eq!(site.calls_for("childC"), vec!["visible"]);

    let cascaded: Vec<_> = report
        .dispatched
        .iter()
        .filter(|r| r.origin == DispatchOrigin::Cascade)
        .map(|r| r.element.as_str())
        .collect();
    assert_eq!(cascaded, vec!["childC", "gallery"]);
}

#[test]
fn nested_containers_cascade_each_descendant_once() {
    let mut site = Site::new();
    site.engine.handle_fragment_change("#pageY|gallery");
    assert_eq!(site.calls_for("slide"), vec!["visible"]);
    assert_eq!(site.calls_for("gallery"), vec!["visible"]);
}

// ── Empty fragment ────────────────────────────────────────────────────

#[test]
fn empty_fragment_restores_everything_and_clears_snapshot() {
    let mut site = Site::new();
    site.auth.set(true);
    site.engine.handle_fragment_change("#childA");
    site.engine.handle_fragment_change("#pageY");
    site.take_calls();

    let start = site.engine.begin_cycle("");
    let CycleStart::Cleared(report) = start else {
        panic!("expected cleared cycle");
    };
    assert_eq!(report.status, CycleStatus::Cleared);
    assert_eq!(
        site.take_calls(),
        vec![
            pair("pageX", "hidden"),
            pair("childA", "collapsed"),
            pair("childB", "visible"),
            pair("pageY", "hidden"),
            pair("childC", "visible"),
            pair("gallery", "visible"),
            pair("slide", "visible"),
            pair("vault", "hidden"),
            pair("broken", "visible"),
        ]
    );
    assert!(site.engine.current_state().is_empty());
    assert!(site.engine.previous_state().is_empty());
    assert_eq!(report.active_tab, None);
    assert!(site.doc.active_tabs().is_empty());
}

#[test]
fn protected_elements_are_restored_even_without_auth() {
    let mut site = Site::new();
    site.engine.handle_fragment_change("");
    assert_eq!(site.calls_for("vault"), vec!["hidden"]);
}

// ── Failure isolation ─────────────────────────────────────────────────

#[test]
fn failing_handler_does_not_stop_the_cycle() {
    let mut site = Site::new();
    let report = site.engine.handle_fragment_change("#broken|childA|ghost");

    assert!(report.is_committed());
    assert_eq!(site.calls_for("childA"), vec!["visible"]);
    assert_eq!(
        report.errors,
        vec![
            NavError::HandlerThrew {
                element: "broken".into(),
                handler: "fragile".into(),
                message: "template missing".into(),
            },
            NavError::UnregisteredElement {
                element: "ghost".into()
            },
        ]
    );
    let broken = report.dispatches_of("broken").next().map(|r| r.outcome.clone());
    assert!(matches!(broken, Some(DispatchOutcome::Failed { .. })));
}

// ── Generations ───────────────────────────────────────────────────────

#[test]
fn stale_completion_is_discarded() {
    let mut site = Site::new();
    let CycleStart::Pending(first) = site.engine.begin_cycle("#childA") else {
        panic!("expected pending cycle");
    };
    let CycleStart::Pending(second) = site.engine.begin_cycle("#childC") else {
        panic!("expected pending cycle");
    };
    assert!(second.generation() > first.generation());

    let stale = site.engine.finish_cycle(first, LoadOutcome::Loaded);
    assert_eq!(stale.status, CycleStatus::Superseded);
    assert!(site.take_calls().is_empty());

    let fresh = site.engine.finish_cycle(second, LoadOutcome::TimedOut);
    assert!(fresh.is_committed());
    assert_eq!(fresh.load, Some(LoadOutcome::TimedOut));
    assert_eq!(
        site.engine.current_state(),
        &NavigationState::single("childC", ElementState::visible())
    );
}

#[test]
fn older_cycle_finishing_last_cannot_overwrite() {
    let mut site = Site::new();
    let CycleStart::Pending(first) = site.engine.begin_cycle("#childA") else {
        panic!("expected pending cycle");
    };
    let CycleStart::Pending(second) = site.engine.begin_cycle("#childC") else {
        panic!("expected pending cycle");
    };
    site.engine.finish_cycle(second, LoadOutcome::Loaded);
    let stale = site.engine.finish_cycle(first, LoadOutcome::Failed("network".into()));
    assert_eq!(stale.status, CycleStatus::Superseded);
    assert!(site.engine.is_element_in_state("childC", "visible"));
    assert!(!site.engine.current_state().contains("childA"));
}

// ── Dynamic content ───────────────────────────────────────────────────

#[test]
fn elements_injected_by_loader_are_dispatched() {
    let mut site = Site::new();
    let CycleStart::Pending(pending) = site.engine.begin_cycle("#projects/open?tab=2") else {
        panic!("expected pending cycle");
    };
    site.doc.add(MemoryNode::new("projects").handler("page"));

    let report = site.engine.finish_cycle(pending, LoadOutcome::Loaded);
    assert!(report.is_committed());
    assert!(report.errors.is_empty());
    assert!(site.engine.registry().contains("projects"));
    assert_eq!(site.take_calls(), vec![pair("projects", "open")]);
    assert!(site.engine.is_element_in_state("projects", "open"));
}

#[test]
fn unloaded_content_is_not_rediscovered() {
    let mut site = Site::new();
    let CycleStart::Pending(pending) = site.engine.begin_cycle("#projects") else {
        panic!("expected pending cycle");
    };
    site.doc.add(MemoryNode::new("projects").handler("page"));

    let report = site.engine.finish_cycle(pending, LoadOutcome::TimedOut);
    assert_eq!(
        report.errors,
        vec![NavError::UnregisteredElement {
            element: "projects".into()
        }]
    );
    assert!(site.take_calls().is_empty());
}

// ── Primary target ────────────────────────────────────────────────────

#[test]
fn missing_primary_target_aborts_without_mutation() {
    let mut site = Site::new();
    site.engine.handle_fragment_change("#childA");
    site.take_calls();
    let current = site.engine.current_state().clone();
    let previous = site.engine.previous_state().clone();

    let report = site.engine.handle_fragment_change("#ghost|childB");
    assert_eq!(report.status, CycleStatus::Aborted);
    assert_eq!(
        report.errors,
        vec![NavError::PrimaryTargetNotFound {
            element: "ghost".into()
        }]
    );
    assert!(site.take_calls().is_empty());
    assert_eq!(site.engine.current_state(), &current);
    assert_eq!(site.engine.previous_state(), &previous);
}

// ── Highlighting and parameters ───────────────────────────────────────

#[test]
fn tab_highlight_follows_visible_page() {
    let mut site = Site::new();
    let report = site.engine.handle_fragment_change("#pageX");
    assert_eq!(report.active_tab.as_deref(), Some("x-tab"));

    let report = site.engine.handle_fragment_change("#pageY");
    assert_eq!(report.active_tab.as_deref(), Some("y-tab"));
    assert_eq!(site.doc.active_tabs(), vec!["y-tab"]);
    assert_eq!(site.doc.is_hidden("pageX"), Some(true));
}

#[test]
fn fragment_parameters_reach_the_handler() {
    let mut site = Site::new();
    site.engine
        .handle_fragment_change("#childB/expanded?section=awards&ref=nav%20bar");
    let calls = site.calls.borrow();
    let call = calls
        .iter()
        .find(|c| c.element == "childB")
        .expect("childB dispatched");
    assert_eq!(call.state, "expanded");
    assert_eq!(call.parameters["section"], "awards");
    assert_eq!(call.parameters["ref"], "nav bar");
}

// ── Lifecycle ─────────────────────────────────────────────────────────

#[test]
fn init_handles_loaded_fragment() {
    let doc = Site::document();
    doc.load_fragment("#pageY");
    let mut site = Site::with_document(doc);

    // Discovery already ran once; init repeats it idempotently.
    let Startup::Initial(start) = site.engine.init() else {
        panic!("expected an initial cycle");
    };
    let report = site.engine.complete(start, LoadOutcome::Skipped);
    assert!(report.is_committed());
    assert!(site.engine.is_element_in_state("pageY", "visible"));
    assert_eq!(site.engine.init(), Startup::AlreadyInitialized);
}

#[test]
fn init_without_fragment_uses_default_navigation() {
    let doc = Site::document();
    doc.set_default_navigation(r##"{"hash":"#pageY"}"##);
    let mut site = Site::with_document(doc);

    assert_eq!(site.engine.init(), Startup::AutoNavigated("pageY".into()));
    assert_eq!(site.doc.fragment(), "pageY");
    assert!(site.take_calls().is_empty());
}

#[test]
fn init_without_fragment_or_default_restores_defaults() {
    let mut site = Site::new();
    let Startup::Initial(CycleStart::Cleared(report)) = site.engine.init() else {
        panic!("expected a cleared cycle");
    };
    assert_eq!(report.dispatched.len(), site.engine.registry().len());
}

#[test]
fn losing_auth_leaves_protected_view() {
    let mut site = Site::new();
    site.auth.set(true);
    site.engine.handle_fragment_change("#vault");
    assert_eq!(site.engine.on_auth_changed(true), None);

    site.auth.set(false);
    assert_eq!(site.engine.on_auth_changed(false).as_deref(), Some("pageX"));
    assert_eq!(site.doc.fragment(), "pageX");

    site.engine.handle_fragment_change("#pageX");
    assert_eq!(site.engine.on_auth_changed(false), None);
}

#[test]
fn losing_auth_prefers_site_default_navigation() {
    let doc = Site::document();
    doc.set_default_navigation(r#"{"hash":"pageY"}"#);
    let mut site = Site::with_document(doc);
    site.auth.set(true);
    site.engine.handle_fragment_change("#vault");
    site.auth.set(false);
    assert_eq!(site.engine.on_auth_changed(false).as_deref(), Some("pageY"));
}

#[test]
fn navigate_round_trips_through_the_fragment() {
    let mut site = Site::new();
    let mut params = Parameters::new();
    params.insert("tab".into(), "photos & video".into());
    let fragment = site.engine.navigate("gallery", "open", params);
    assert_eq!(fragment, "gallery/open?tab=photos%20%26%20video");

    let report = site.engine.handle_fragment_change(&site.doc.fragment());
    assert!(report.is_committed());
    assert!(site.engine.is_element_in_state("gallery", "open"));
    assert_eq!(site.calls_for("slide"), vec!["visible"]);
}
