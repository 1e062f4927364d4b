#![forbid(unsafe_code)]

//! Handler registry: named handler callables and the elements bound to them.
//!
//! Components register their handler under a name
//! ([`HandlerRegistry::register_handler`]). Elements are then bound to a
//! handler name, either directly ([`HandlerRegistry::register`]) or by
//! scanning a [`Document`] ([`HandlerRegistry::discover`]). The name is
//! resolved again at dispatch time, so a handler removed after binding is
//! reported as missing instead of being called.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::NavConfig;
use crate::document::{DeclaredElement, Document};
use crate::error::{HandlerError, NavError};
use crate::state::{Parameters, VISIBLE};

/// Handler callable: `(element id, state, parameters) -> applied?`.
pub type Handler = Rc<dyn Fn(&str, &str, &Parameters) -> Result<bool, HandlerError>>;

/// A registered navigable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigableElement {
    pub id: String,
    pub handler_name: String,
    pub default_state: String,
    pub allowed_states: BTreeSet<String>,
    pub protected: bool,
    /// Element-intrinsic parameters.
    pub parameters: Parameters,
}

impl NavigableElement {
    fn from_config(id: &str, handler_name: &str, config: NavConfig) -> Self {
        Self {
            id: id.to_owned(),
            handler_name: handler_name.to_owned(),
            default_state: config.default_state,
            allowed_states: config.allowed_states,
            protected: config.protected,
            parameters: config.parameters,
        }
    }

    /// Whether `state` is in the advisory allowed set (or the set is empty).
    #[must_use]
    pub fn allows(&self, state: &str) -> bool {
        self.allowed_states.is_empty() || self.allowed_states.contains(state)
    }
}

/// Outcome of a discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Ids registered (or re-registered) in document order.
    pub registered: Vec<String>,
    /// Recovered problems: malformed configs and unbound handler names.
    pub problems: Vec<NavError>,
}

/// Table of handler callables and navigable elements.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    elements: IndexMap<String, NavigableElement>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &handlers)
            .field("elements", &self.elements)
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Handlers ─────────────────────────────────────────────────────────

    /// Register (or replace) a handler callable under `name`.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&str, &str, &Parameters) -> Result<bool, HandlerError> + 'static,
    {
        let name = name.into();
        tracing::debug!(handler = %name, "handler registered");
        self.handlers.insert(name, Rc::new(handler));
    }

    /// Remove a handler callable. Elements bound to it stay registered and
    /// fail dispatch until a handler with that name is registered again.
    pub fn unregister_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Resolve a handler by name.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    // ── Elements ─────────────────────────────────────────────────────────

    /// Bind element `id` to `handler_name`.
    ///
    /// Rejected (logged, skipped) when no callable is registered under the
    /// name. Re-registering an id overwrites the previous entry.
    pub fn register(
        &mut self,
        id: &str,
        handler_name: &str,
        config: NavConfig,
    ) -> Result<(), NavError> {
        if !self.handlers.contains_key(handler_name) {
            let err = NavError::MissingHandlerFunction {
                element: id.to_owned(),
                handler: handler_name.to_owned(),
            };
            tracing::warn!(element = id, handler = handler_name, "handler function not found");
            return Err(err);
        }
        let element = NavigableElement::from_config(id, handler_name, config);
        tracing::debug!(
            element = id,
            handler = handler_name,
            default_state = %element.default_state,
            protected = element.protected,
            "element registered"
        );
        self.elements.insert(id.to_owned(), element);
        Ok(())
    }

    /// Register one declared element, falling back to the default config
    /// when its blob is malformed.
    pub fn register_declared(&mut self, declared: &DeclaredElement, report: &mut DiscoveryReport) {
        let mut config = match declared.config.as_deref() {
            None => NavConfig::default(),
            Some(raw) => NavConfig::parse(&declared.id, raw).unwrap_or_else(|err| {
                tracing::warn!(
                    element = %declared.id,
                    error = %err,
                    "invalid nav config, using defaults"
                );
                report.problems.push(err);
                NavConfig::default()
            }),
        };
        config.protected |= declared.protected;

        match self.register(&declared.id, &declared.handler, config) {
            Ok(()) => report.registered.push(declared.id.clone()),
            Err(err) => report.problems.push(err),
        }
    }

    /// Scan `document` for declared elements and register each one.
    ///
    /// Idempotent: running it again re-registers every element in place.
    pub fn discover<D: Document + ?Sized>(&mut self, document: &D) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for declared in document.declared_elements() {
            if declared.id.is_empty() || declared.handler.is_empty() {
                continue;
            }
            self.register_declared(&declared, &mut report);
        }
        tracing::info!(
            registered = report.registered.len(),
            problems = report.problems.len(),
            total = self.elements.len(),
            "navigation handlers discovered"
        );
        report
    }

    /// Remove an element binding.
    pub fn remove(&mut self, id: &str) -> Option<NavigableElement> {
        self.elements.shift_remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NavigableElement> {
        self.elements.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Registered default state, `"visible"` for unknown ids.
    #[must_use]
    pub fn default_state(&self, id: &str) -> &str {
        self.elements
            .get(id)
            .map_or(VISIBLE, |e| e.default_state.as_str())
    }

    /// Whether the element is registered as protected.
    #[must_use]
    pub fn is_protected(&self, id: &str) -> bool {
        self.elements.get(id).is_some_and(|e| e.protected)
    }

    /// Registered elements in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &NavigableElement> + '_ {
        self.elements.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
