#![forbid(unsafe_code)]

//! Navigation engine: one fragment in, one applied UI state out.
//!
//! # Cycle
//!
//! ```text
//! Idle → ParsingFragment → LoadingDynamicContent → Reconciling
//!      → Dispatching → CascadingChildren → UpdatingHighlight → Idle
//! ```
//!
//! The only suspension point is the dynamic-content loader, so a cycle is
//! split in two: [`NavigationEngine::begin_cycle`] parses the fragment and
//! hands back a [`PendingCycle`] describing what to load;
//! [`NavigationEngine::finish_cycle`] applies it once the host's loader has
//! settled. A successful load re-runs discovery before anything is
//! dispatched, so injected elements are addressable in the same cycle.
//! Every `begin_cycle` takes a new generation. A pending cycle whose
//! generation is no longer the latest is discarded on finish, so rapid
//! navigation can never commit out of order.
//!
//! Hosts without a loader call [`NavigationEngine::handle_fragment_change`].
//!
//! # Failure Modes
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | entry not registered / handler missing / handler failed | recorded, cycle continues |
//! | protected entry without authentication | handler skipped, entry not committed, fallback fragment written |
//! | first entry absent from the document | cycle aborted, nothing dispatched or committed |
//! | loader failed or timed out | logged, state applied without dynamic content |
//! | newer cycle started while loading | stale cycle discarded |

use std::fmt;

use crate::auth::AuthSource;
use crate::cascade::ChildCascadeTrigger;
use crate::codec;
use crate::config::{DefaultNavigation, EngineConfig};
use crate::dispatch::{DispatchOutcome, ElementStateDispatcher};
use crate::document::Document;
use crate::error::{HandlerError, NavError};
use crate::reconcile::StateReconciler;
use crate::registry::{DiscoveryReport, HandlerRegistry};
use crate::state::{ElementState, NavigationState, Parameters};

// ─────────────────────────────────────────────────────────────────────────────
// Cycle types
// ─────────────────────────────────────────────────────────────────────────────

/// Where the engine is within a navigation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    ParsingFragment,
    LoadingDynamicContent,
    Reconciling,
    Dispatching,
    CascadingChildren,
    UpdatingHighlight,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ParsingFragment => "parsing_fragment",
            Self::LoadingDynamicContent => "loading_dynamic_content",
            Self::Reconciling => "reconciling",
            Self::Dispatching => "dispatching",
            Self::CascadingChildren => "cascading_children",
            Self::UpdatingHighlight => "updating_highlight",
        };
        f.write_str(name)
    }
}

/// How the dynamic-content loader settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Content loaded.
    Loaded,
    /// No loader configured.
    Skipped,
    /// The loader rejected.
    Failed(String),
    /// The loader did not settle within the configured timeout.
    TimedOut,
}

/// A cycle waiting for dynamic content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCycle {
    generation: u64,
    fragment: String,
    next: NavigationState,
    load_request: NavigationState,
}

impl PendingCycle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Raw fragment the cycle was started from.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Decoded target state.
    #[must_use]
    pub fn next(&self) -> &NavigationState {
        &self.next
    }

    /// Subset of the target state the loader may see: protected entries
    /// are dropped unless authenticated.
    #[must_use]
    pub fn load_request(&self) -> &NavigationState {
        &self.load_request
    }
}

/// Result of [`NavigationEngine::begin_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleStart {
    /// Empty fragment: every element was restored synchronously.
    Cleared(CycleReport),
    /// Await the loader, then call [`NavigationEngine::finish_cycle`].
    Pending(PendingCycle),
}

/// Final status of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStatus {
    /// Target state applied and committed.
    Committed,
    /// Empty fragment; defaults restored, snapshot cleared.
    Cleared,
    /// A newer cycle started first; nothing done.
    Superseded,
    /// Primary target missing; nothing done.
    Aborted,
}

/// Why an element was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOrigin {
    /// Restored to its default by reconciliation.
    Restore,
    /// Addressed by the fragment.
    Primary,
    /// Default state cascaded from an addressed ancestor.
    Cascade,
}

/// One dispatch performed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub element: String,
    pub state: String,
    pub origin: DispatchOrigin,
    pub outcome: DispatchOutcome,
}

/// Everything a cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub generation: u64,
    pub status: CycleStatus,
    /// Dispatches in execution order.
    pub dispatched: Vec<DispatchRecord>,
    /// Recovered (or, for `Aborted`, fatal) errors.
    pub errors: Vec<NavError>,
    /// Fragment written after an unauthorized access.
    pub redirected_to: Option<String>,
    /// Tab marked active after the cycle.
    pub active_tab: Option<String>,
    /// How the loader settled, for finished cycles.
    pub load: Option<LoadOutcome>,
}

impl CycleReport {
    fn new(generation: u64, status: CycleStatus) -> Self {
        Self {
            generation,
            status,
            dispatched: Vec::new(),
            errors: Vec::new(),
            redirected_to: None,
            active_tab: None,
            load: None,
        }
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == CycleStatus::Committed
    }

    /// Dispatches of `element`, in order.
    pub fn dispatches_of<'a>(
        &'a self,
        element: &'a str,
    ) -> impl Iterator<Item = &'a DispatchRecord> + 'a {
        self.dispatched.iter().filter(move |r| r.element == element)
    }

    fn record(
        &mut self,
        element: &str,
        state: &str,
        origin: DispatchOrigin,
        outcome: DispatchOutcome,
    ) {
        if let Some(err) = outcome.clone().into_error(element) {
            self.errors.push(err);
        }
        self.dispatched.push(DispatchRecord {
            element: element.to_owned(),
            state: state.to_owned(),
            origin,
            outcome,
        });
    }
}

/// Result of [`NavigationEngine::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// A cycle was started for the fragment the page was loaded with
    /// (possibly empty).
    Initial(CycleStart),
    /// No fragment; the site default navigation was written to the
    /// document. The host's change event drives the first cycle.
    AutoNavigated(String),
    /// `init` already ran.
    AlreadyInitialized,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Fragment-driven navigation engine over a host [`Document`].
pub struct NavigationEngine<D: Document, A: AuthSource> {
    document: D,
    auth: A,
    registry: HandlerRegistry,
    config: EngineConfig,
    current: NavigationState,
    previous: NavigationState,
    generation: u64,
    phase: CyclePhase,
    initialized: bool,
}

impl<D: Document, A: AuthSource> fmt::Debug for NavigationEngine<D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<D: Document, A: AuthSource> NavigationEngine<D, A> {
    /// Create an engine with an empty registry and an empty snapshot.
    #[must_use]
    pub fn new(document: D, auth: A, config: EngineConfig) -> Self {
        Self {
            document,
            auth,
            registry: HandlerRegistry::new(),
            config,
            current: NavigationState::new(),
            previous: NavigationState::new(),
            generation: 0,
            phase: CyclePhase::Idle,
            initialized: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    #[must_use]
    pub fn auth(&self) -> &A {
        &self.auth
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Register a handler callable (see [`HandlerRegistry::register_handler`]).
    pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&str, &str, &Parameters) -> Result<bool, HandlerError> + 'static,
    {
        self.registry.register_handler(name, handler);
    }

    /// Last committed state.
    #[must_use]
    pub fn current_state(&self) -> &NavigationState {
        &self.current
    }

    /// State committed before [`Self::current_state`].
    #[must_use]
    pub fn previous_state(&self) -> &NavigationState {
        &self.previous
    }

    /// Whether the committed state holds `id` in `state`.
    #[must_use]
    pub fn is_element_in_state(&self, id: &str, state: &str) -> bool {
        self.current.get(id).is_some_and(|e| e.state == state)
    }

    /// Generation of the most recently started cycle.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Discover elements and start the first cycle.
    ///
    /// A page loaded with a fragment handles it. Without one, the site's
    /// default navigation (if declared) is written as the new fragment;
    /// otherwise the empty fragment is handled.
    pub fn init(&mut self) -> Startup {
        if self.initialized {
            tracing::warn!("navigation engine already initialized");
            return Startup::AlreadyInitialized;
        }
        self.initialized = true;
        self.rediscover();

        let fragment = self.document.fragment();
        if fragment.is_empty()
            && let Some(hash) = self
                .document
                .default_navigation()
                .and_then(|raw| DefaultNavigation::parse_hash(&raw))
        {
            tracing::info!(fragment = %hash, "applying default navigation");
            self.document.set_fragment(&hash);
            return Startup::AutoNavigated(hash);
        }
        Startup::Initial(self.begin_cycle(&fragment))
    }

    /// Re-scan the document for navigable elements.
    pub fn rediscover(&mut self) -> DiscoveryReport {
        self.registry.discover(&self.document)
    }

    /// React to an authentication change.
    ///
    /// Losing authentication while a protected element is committed writes
    /// a safe fragment: the site default navigation, else the fallback
    /// fragment, else the empty fragment. Returns the fragment written.
    pub fn on_auth_changed(&mut self, authenticated: bool) -> Option<String> {
        if authenticated {
            return None;
        }
        let exposed: Vec<&str> = self
            .current
            .ids()
            .filter(|id| self.registry.is_protected(id))
            .collect();
        if exposed.is_empty() {
            return None;
        }
        let target = self
            .document
            .default_navigation()
            .and_then(|raw| DefaultNavigation::parse_hash(&raw))
            .filter(|hash| !self.addresses_protected(hash))
            .or_else(|| {
                Some(self.config.fallback_fragment.clone())
                    .filter(|f| !f.is_empty() && !self.addresses_protected(f))
            })
            .unwrap_or_default();
        tracing::info!(
            protected = exposed.len(),
            fragment = %target,
            "authentication lost, leaving protected view"
        );
        self.document.set_fragment(&target);
        Some(target)
    }

    fn addresses_protected(&self, fragment: &str) -> bool {
        codec::decode(fragment)
            .ids()
            .any(|id| self.registry.is_protected(id))
    }

    // ── Programmatic navigation ──────────────────────────────────────────

    /// Write the fragment for a single element. The cycle runs when the
    /// host reports the fragment change.
    pub fn navigate(&self, id: &str, state: &str, parameters: Parameters) -> String {
        let target =
            NavigationState::single(id, ElementState::new(state).with_parameters(parameters));
        self.navigate_multiple(&target)
    }

    /// Write the fragment for several elements at once.
    pub fn navigate_multiple(&self, state: &NavigationState) -> String {
        let fragment = codec::encode(state);
        tracing::debug!(fragment = %fragment, "navigate");
        self.document.set_fragment(&fragment);
        fragment
    }

    // ── Cycle ────────────────────────────────────────────────────────────

    /// Run a whole cycle without dynamic content.
    pub fn handle_fragment_change(&mut self, fragment: &str) -> CycleReport {
        let start = self.begin_cycle(fragment);
        self.complete(start, LoadOutcome::Skipped)
    }

    /// Finish a started cycle with `outcome` (ignored for cleared cycles).
    pub fn complete(&mut self, start: CycleStart, outcome: LoadOutcome) -> CycleReport {
        match start {
            CycleStart::Cleared(report) => report,
            CycleStart::Pending(pending) => self.finish_cycle(pending, outcome),
        }
    }

    /// Parse `fragment` and start a new generation.
    pub fn begin_cycle(&mut self, fragment: &str) -> CycleStart {
        self.generation += 1;
        let generation = self.generation;
        self.phase = CyclePhase::ParsingFragment;
        let next = codec::decode(fragment);
        tracing::debug!(generation, fragment, entries = next.len(), "navigation cycle started");

        if next.is_empty() {
            return CycleStart::Cleared(self.clear_all(generation));
        }

        let authenticated = self.auth.is_authenticated();
        let load_request =
            next.filtered(|id, _| authenticated || !self.registry.is_protected(id));
        self.phase = CyclePhase::LoadingDynamicContent;
        CycleStart::Pending(PendingCycle {
            generation,
            fragment: fragment.to_owned(),
            next,
            load_request,
        })
    }

    /// Apply a pending cycle after the loader settled.
    pub fn finish_cycle(&mut self, pending: PendingCycle, load: LoadOutcome) -> CycleReport {
        let PendingCycle {
            generation, next, ..
        } = pending;
        let span = tracing::info_span!("nav_cycle", generation);
        let _guard = span.enter();

        if generation != self.generation {
            tracing::debug!(latest = self.generation, "stale navigation cycle discarded");
            return CycleReport::new(generation, CycleStatus::Superseded);
        }

        match &load {
            LoadOutcome::Failed(reason) => {
                tracing::warn!(
                    error = %reason,
                    "dynamic content load failed, applying state anyway"
                );
            }
            LoadOutcome::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.config.load_timeout_ms,
                    "dynamic content load timed out, applying state anyway"
                );
            }
            LoadOutcome::Loaded => {
                // Loaded content may carry new navigable elements.
                self.registry.discover(&self.document);
            }
            LoadOutcome::Skipped => {}
        }

        if let Some(primary) = next.first_id()
            && !self.document.contains(primary)
        {
            tracing::warn!(element = primary, "navigation target not found, cycle aborted");
            let mut report = CycleReport::new(generation, CycleStatus::Aborted);
            report.errors.push(NavError::PrimaryTargetNotFound {
                element: primary.to_owned(),
            });
            report.load = Some(load);
            self.phase = CyclePhase::Idle;
            return report;
        }

        let mut report = CycleReport::new(generation, CycleStatus::Committed);
        report.load = Some(load);
        let mut blocked: Vec<String> = Vec::new();
        {
            let dispatcher = ElementStateDispatcher::new(&self.registry, &self.auth);

            self.phase = CyclePhase::Reconciling;
            let plan = StateReconciler::new(
                &self.document,
                &self.registry,
                &self.config.container_handlers,
            )
            .plan(&self.current, &next);
            for (id, state) in &plan.restore {
                let outcome = dispatcher.dispatch_default(id);
                report.record(id, state, DispatchOrigin::Restore, outcome);
            }

            self.phase = CyclePhase::Dispatching;
            for (id, entry) in next.iter() {
                let outcome = dispatcher.dispatch(id, &entry.state, &entry.parameters);
                if outcome.requires_redirect() {
                    blocked.push(id.to_owned());
                }
                report.record(id, &entry.state, DispatchOrigin::Primary, outcome);
            }

            self.phase = CyclePhase::CascadingChildren;
            let mut cascade = ChildCascadeTrigger::new();
            for id in next.ids().filter(|id| !blocked.iter().any(|b| b == id)) {
                for (child, state) in cascade.collect(&self.document, &self.registry, id, &next) {
                    let outcome = dispatcher.dispatch_default(&child);
                    report.record(&child, &state, DispatchOrigin::Cascade, outcome);
                }
            }
        }

        let committed = next.filtered(|id, _| !blocked.iter().any(|b| b == id));
        self.previous = std::mem::replace(&mut self.current, committed);

        self.phase = CyclePhase::UpdatingHighlight;
        report.active_tab = self.update_highlight();

        if !blocked.is_empty() {
            report.redirected_to = Some(self.redirect_after_unauthorized(&blocked));
        }

        self.phase = CyclePhase::Idle;
        tracing::info!(
            dispatched = report.dispatched.len(),
            errors = report.errors.len(),
            committed = self.current.len(),
            "navigation cycle committed"
        );
        report
    }

    fn clear_all(&mut self, generation: u64) -> CycleReport {
        let span = tracing::info_span!("nav_cycle", generation);
        let _guard = span.enter();

        let mut report = CycleReport::new(generation, CycleStatus::Cleared);
        self.phase = CyclePhase::Reconciling;
        {
            let plan = StateReconciler::new(
                &self.document,
                &self.registry,
                &self.config.container_handlers,
            )
            .plan_restore_all();
            let dispatcher = ElementStateDispatcher::new(&self.registry, &self.auth);
            for (id, state) in &plan.restore {
                let outcome = dispatcher.dispatch_default(id);
                report.record(id, state, DispatchOrigin::Restore, outcome);
            }
        }
        self.current.clear();
        self.previous.clear();

        self.phase = CyclePhase::UpdatingHighlight;
        report.active_tab = self.update_highlight();
        self.phase = CyclePhase::Idle;
        tracing::info!(restored = report.dispatched.len(), "all elements restored to defaults");
        report
    }

    fn update_highlight(&self) -> Option<String> {
        let tab = self.document.first_visible_parent_tab();
        self.document.set_active_tab(tab.as_deref());
        tracing::debug!(tab = tab.as_deref().unwrap_or(""), "tab highlighting updated");
        tab
    }

    fn redirect_after_unauthorized(&self, blocked: &[String]) -> String {
        let fallback = &self.config.fallback_fragment;
        let loops = codec::decode(fallback)
            .ids()
            .any(|id| blocked.iter().any(|b| b == id));
        let target = if loops { String::new() } else { fallback.clone() };
        tracing::warn!(
            blocked = blocked.len(),
            fragment = %target,
            "unauthorized navigation redirected"
        );
        self.document.set_fragment(&target);
        target
    }
}
