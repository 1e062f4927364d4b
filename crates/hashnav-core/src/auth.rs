#![forbid(unsafe_code)]

//! Authentication signal consumed by the protected-element gate.
//!
//! The engine only polls [`AuthSource::is_authenticated`] at dispatch time.
//! [`SharedAuth`] is a convenience source for hosts that also want change
//! notifications (e.g. to hide protected navigation links).

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

/// Readable authentication flag.
pub trait AuthSource {
    fn is_authenticated(&self) -> bool;
}

impl<F> AuthSource for F
where
    F: Fn() -> bool,
{
    fn is_authenticated(&self) -> bool {
        self()
    }
}

/// Identifier returned by [`SharedAuth::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(bool)>;

#[derive(Default)]
struct AuthInner {
    authenticated: Cell<bool>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

/// Cloneable authentication flag with change broadcast.
#[derive(Clone, Default)]
pub struct SharedAuth {
    inner: Rc<AuthInner>,
}

impl std::fmt::Debug for SharedAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedAuth")
            .field("authenticated", &self.inner.authenticated.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl SharedAuth {
    #[must_use]
    pub fn new(authenticated: bool) -> Self {
        let auth = Self::default();
        auth.inner.authenticated.set(authenticated);
        auth
    }

    /// Update the flag. Listeners run only when the value changes.
    pub fn set(&self, authenticated: bool) {
        if self.inner.authenticated.replace(authenticated) == authenticated {
            return;
        }
        tracing::debug!(authenticated, "auth state changed");
        self.broadcast();
    }

    /// Register a change listener.
    pub fn on_change(&self, listener: impl Fn(bool) + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn broadcast(&self) {
        let authenticated = self.inner.authenticated.get();
        // Snapshot so listeners may register/remove listeners themselves.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(authenticated))).is_err() {
                tracing::warn!("auth change listener panicked");
            }
        }
    }
}

impl AuthSource for SharedAuth {
    fn is_authenticated(&self) -> bool {
        self.inner.authenticated.get()
    }
}
