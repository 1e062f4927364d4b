#![forbid(unsafe_code)]

//! Engine borrows and fallible host calls.
//!
//! Every JS entry point reaches the engine through [`read`] or [`write`], so
//! a call made while a cycle holds the engine fails with [`Busy`] instead of
//! panicking or answering with a default. Host calls whose result carries no
//! value go through [`warn_on_err`].

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;

/// The engine is borrowed by a running navigation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy;

impl fmt::Display for Busy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("navigator is busy (called from inside a navigation handler?)")
    }
}

impl std::error::Error for Busy {}

pub fn read<T>(cell: &RefCell<T>) -> Result<Ref<'_, T>, Busy> {
    cell.try_borrow().map_err(|_| Busy)
}

pub fn write<T>(cell: &RefCell<T>) -> Result<RefMut<'_, T>, Busy> {
    cell.try_borrow_mut().map_err(|_| Busy)
}

/// Log a failed host call at warn level. Returns the value on success.
pub fn warn_on_err<T, E: fmt::Debug>(result: Result<T, E>, operation: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(operation, error = ?err, "host call failed");
            None
        }
    }
}
