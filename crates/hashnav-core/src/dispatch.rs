#![forbid(unsafe_code)]

//! Single-element state dispatch.
//!
//! [`ElementStateDispatcher::dispatch`] resolves the element's handler,
//! applies the protected-element gate, merges parameters, and invokes the
//! handler inside a failure boundary. Every outcome is a value; nothing a
//! handler does can abort the caller's batch.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::auth::AuthSource;
use crate::error::NavError;
use crate::registry::HandlerRegistry;
use crate::state::Parameters;

/// Result of dispatching one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler applied the state.
    Applied,
    /// The handler ran and reported that it did not apply the state.
    Declined,
    /// No registry entry for the element.
    Unregistered,
    /// The element's handler name has no callable.
    MissingHandler { handler: String },
    /// Protected element without authentication; the handler was not called.
    Unauthorized,
    /// The handler returned an error or panicked.
    Failed { handler: String, message: String },
}

impl DispatchOutcome {
    /// Whether the state was applied.
    #[must_use]
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Whether the caller must issue the fallback redirect.
    #[must_use]
    pub fn requires_redirect(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// The error this outcome represents, if any.
    #[must_use]
    pub fn into_error(self, element: &str) -> Option<NavError> {
        let element = element.to_owned();
        match self {
            Self::Applied | Self::Declined => None,
            Self::Unregistered => Some(NavError::UnregisteredElement { element }),
            Self::MissingHandler { handler } => {
                Some(NavError::MissingHandlerFunction { element, handler })
            }
            Self::Unauthorized => Some(NavError::UnauthorizedAccess { element }),
            Self::Failed { handler, message } => Some(NavError::HandlerThrew {
                element,
                handler,
                message,
            }),
        }
    }
}

/// Invokes element handlers against a registry and an auth source.
pub struct ElementStateDispatcher<'a> {
    registry: &'a HandlerRegistry,
    auth: &'a dyn AuthSource,
}

impl<'a> ElementStateDispatcher<'a> {
    #[must_use]
    pub fn new(registry: &'a HandlerRegistry, auth: &'a dyn AuthSource) -> Self {
        Self { registry, auth }
    }

    /// Apply a requested state to `id`.
    ///
    /// Protected elements are only dispatched while authenticated.
    /// Element-intrinsic parameters are merged under `parameters`.
    pub fn dispatch(&self, id: &str, state: &str, parameters: &Parameters) -> DispatchOutcome {
        let Some(element) = self.registry.get(id) else {
            tracing::warn!(element = id, state, "no handler registered for element");
            return DispatchOutcome::Unregistered;
        };

        if element.protected && !self.auth.is_authenticated() {
            tracing::warn!(element = id, state, "protected element requires authentication");
            return DispatchOutcome::Unauthorized;
        }

        if !element.allows(state) {
            tracing::warn!(
                element = id,
                state,
                handler = %element.handler_name,
                "state not in allowed states, dispatching anyway"
            );
        }

        let merged = if element.parameters.is_empty() {
            parameters.clone()
        } else {
            let mut merged = element.parameters.clone();
            merged.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        };

        self.invoke(id, &element.handler_name, state, &merged)
    }

    /// Restore `id` to its registered default state with no parameters.
    ///
    /// Not gated: putting a protected element back to its default hides it.
    pub fn dispatch_default(&self, id: &str) -> DispatchOutcome {
        let Some(element) = self.registry.get(id) else {
            tracing::warn!(element = id, "no handler registered for element");
            return DispatchOutcome::Unregistered;
        };
        let state = element.default_state.clone();
        self.invoke(id, &element.handler_name, &state, &Parameters::new())
    }

    fn invoke(
        &self,
        id: &str,
        handler_name: &str,
        state: &str,
        parameters: &Parameters,
    ) -> DispatchOutcome {
        let Some(handler) = self.registry.handler(handler_name) else {
            tracing::warn!(element = id, handler = handler_name, "handler function not found");
            return DispatchOutcome::MissingHandler {
                handler: handler_name.to_owned(),
            };
        };

        tracing::debug!(element = id, state, handler = handler_name, "dispatching");
        let result = catch_unwind(AssertUnwindSafe(|| handler(id, state, parameters)));
        let message = match result {
            Ok(Ok(true)) => return DispatchOutcome::Applied,
            Ok(Ok(false)) => {
                tracing::debug!(element = id, state, "handler declined state");
                return DispatchOutcome::Declined;
            }
            Ok(Err(err)) => err.message().to_owned(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        tracing::error!(
            element = id,
            state,
            handler = handler_name,
            error = %message,
            "navigation handler failed"
        );
        DispatchOutcome::Failed {
            handler: handler_name.to_owned(),
            message,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
