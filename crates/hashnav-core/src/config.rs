#![forbid(unsafe_code)]

//! Engine, element and site configuration.
//!
//! - [`NavConfig`]: per-element JSON blob from the `data-nav-config` attribute.
//! - [`EngineConfig`]: engine-wide settings (container roles, fallback
//!   redirect, content-load timeout, DOM naming conventions).
//! - [`DefaultNavigation`]: site-level auto-navigation blob.
//!
//! All three deserialize from the camelCase JSON the page assembler emits.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::state::{Parameters, VISIBLE};

/// Container handler names used when none are configured.
pub const DEFAULT_CONTAINER_HANDLERS: [&str; 2] = [
    "handleVerticalContainerNavigation",
    "handleHorizontalContainerNavigation",
];

/// Default content-load timeout.
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

// ─────────────────────────────────────────────────────────────────────────────
// Element configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Declared configuration of one navigable element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavConfig {
    /// State restored when the element is not addressed by the fragment.
    pub default_state: String,
    /// Advisory set of states the element understands; empty means any.
    pub allowed_states: BTreeSet<String>,
    /// Whether dispatching a requested state needs authentication.
    pub protected: bool,
    /// Element-intrinsic parameters merged under caller parameters.
    pub parameters: Parameters,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            default_state: VISIBLE.to_owned(),
            allowed_states: BTreeSet::new(),
            protected: false,
            parameters: Parameters::new(),
        }
    }
}

/// Wire form: every field optional, parameter values may be any scalar.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNavConfig {
    default_state: Option<String>,
    allowed_states: Option<BTreeSet<String>>,
    protected: Option<bool>,
    parameters: Option<indexmap::IndexMap<String, serde_json::Value>>,
}

impl NavConfig {
    /// Parse a configuration blob.
    ///
    /// Missing or null fields take their defaults; an empty `defaultState`
    /// is treated as absent.
    pub fn parse(element: &str, raw: &str) -> Result<Self, NavError> {
        let parsed: RawNavConfig =
            serde_json::from_str(raw).map_err(|e| NavError::MalformedNavConfig {
                element: element.to_owned(),
                reason: e.to_string(),
            })?;

        let default_state = parsed
            .default_state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| VISIBLE.to_owned());
        let parameters = parsed
            .parameters
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
            .collect();

        Ok(Self {
            default_state,
            allowed_states: parsed.allowed_states.unwrap_or_default(),
            protected: parsed.protected.unwrap_or(false),
            parameters,
        })
    }

    /// Whether `state` is in the advisory allowed set (or the set is empty).
    #[must_use]
    pub fn allows(&self, state: &str) -> bool {
        self.allowed_states.is_empty() || self.allowed_states.contains(state)
    }

    /// Set the default state.
    #[must_use]
    pub fn with_default_state(mut self, state: impl Into<String>) -> Self {
        self.default_state = state.into();
        self
    }

    /// Mark the element protected.
    #[must_use]
    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Set the allowed states.
    #[must_use]
    pub fn with_allowed_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Add one element-intrinsic parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DOM conventions
// ─────────────────────────────────────────────────────────────────────────────

/// Attribute, class and selector names the page assembler emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomConventions {
    pub handler_attr: String,
    pub config_attr: String,
    pub protected_attr: String,
    pub parent_tab_attr: String,
    pub hidden_class: String,
    pub nav_link_selector: String,
    pub tab_id_attr: String,
    pub target_attr: String,
    pub active_class: String,
    pub site_container_selector: String,
    pub default_navigation_attr: String,
}

impl Default for DomConventions {
    fn default() -> Self {
        Self {
            handler_attr: "data-nav-handler".to_owned(),
            config_attr: "data-nav-config".to_owned(),
            protected_attr: "data-protected".to_owned(),
            parent_tab_attr: "data-parent-tab".to_owned(),
            hidden_class: "nav-hidden".to_owned(),
            nav_link_selector: ".nav-link".to_owned(),
            tab_id_attr: "data-tab-id".to_owned(),
            target_attr: "data-target".to_owned(),
            active_class: "active".to_owned(),
            site_container_selector: ".site-container".to_owned(),
            default_navigation_attr: "data-default-navigation".to_owned(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Handler names that give an element the container (page) role.
    pub container_handlers: Vec<String>,
    /// Fragment written after an unauthorized navigation. Empty restores
    /// every element to its default.
    pub fallback_fragment: String,
    /// Upper bound on waiting for the dynamic-content loader.
    pub load_timeout_ms: u64,
    /// DOM naming conventions for host adapters.
    pub dom: DomConventions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_handlers: DEFAULT_CONTAINER_HANDLERS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            fallback_fragment: String::new(),
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            dom: DomConventions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from the site's JSON; absent fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Content-load timeout as a [`Duration`].
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Whether `handler` marks a container element.
    #[must_use]
    pub fn is_container_handler(&self, handler: &str) -> bool {
        self.container_handlers.iter().any(|h| h == handler)
    }

    /// Replace the container handler names.
    #[must_use]
    pub fn with_container_handlers<I, S>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_handlers = handlers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the unauthorized-access fallback fragment.
    #[must_use]
    pub fn with_fallback_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fallback_fragment = fragment.into();
        self
    }

    /// Set the content-load timeout (millisecond resolution).
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the DOM naming conventions.
    #[must_use]
    pub fn with_dom(mut self, dom: DomConventions) -> Self {
        self.dom = dom;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Site default navigation
// ─────────────────────────────────────────────────────────────────────────────

/// Site-level navigation applied on first load when the URL has no fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultNavigation {
    #[serde(default)]
    pub hash: Option<String>,
}

impl DefaultNavigation {
    /// Parse the blob; `None` if malformed or without a usable hash.
    #[must_use]
    pub fn parse_hash(raw: &str) -> Option<String> {
        match serde_json::from_str::<Self>(raw) {
            Ok(nav) => nav
                .hash
                .map(|h| h.trim_start_matches('#').to_owned())
                .filter(|h| !h.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "invalid default navigation config");
                None
            }
        }
    }
}
