//! Cooperative poll scheduler.
//!
//! Single-threaded registry of `(interval, callback)` entries. The host
//! drives it by calling [`Ticker::advance`] with elapsed milliseconds; due
//! callbacks run in registration order, which is what lets a collection's
//! reconcile pass (registered when the row is built) observe fresh rows
//! before the composition root's visibility pass runs in the same tick.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Poll interval applied when a member does not override it, in ms.
pub const DEFAULT_TICK_INTERVAL: u64 = 500;

struct TickEntry {
    id: u64,
    interval: u64,
    due: u64,
    callback: Rc<dyn Fn()>,
}

#[derive(Default)]
struct TickerInner {
    entries: RefCell<Vec<TickEntry>>,
    next_id: Cell<u64>,
    now: Cell<u64>,
}

#[derive(Clone, Default)]
pub struct Ticker {
    inner: Rc<TickerInner>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time in milliseconds since creation.
    pub fn now(&self) -> u64 {
        self.inner.now.get()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Registers a callback to run every `interval` ms. The returned guard
    /// cancels the registration when dropped; an interval of zero runs on
    /// every advance.
    #[must_use]
    pub fn register<F>(&self, interval: u64, callback: F) -> TickRegistration
    where
        F: Fn() + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.entries.borrow_mut().push(TickEntry {
            id,
            interval,
            due: self.inner.now.get().saturating_add(interval),
            callback: Rc::new(callback),
        });
        TickRegistration {
            ticker: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Advances scheduler time and runs every due callback, in registration
    /// order. Callbacks may register and cancel entries; entries cancelled
    /// mid-advance are skipped, entries registered mid-advance wait for the
    /// next one.
    pub fn advance(&self, elapsed: u64) {
        let now = self.inner.now.get().saturating_add(elapsed);
        self.inner.now.set(now);
        // Snapshot the due set first. Running a callback while the entry
        // list is borrowed would break reentrant registration.
        let due: Vec<(u64, Rc<dyn Fn()>)> = self
            .inner
            .entries
            .borrow()
            .iter()
            .filter(|entry| entry.due <= now)
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();
        for (id, callback) in due {
            let still_registered = self
                .inner
                .entries
                .borrow()
                .iter()
                .any(|entry| entry.id == id);
            if !still_registered {
                continue;
            }
            callback();
            let mut entries = self.inner.entries.borrow_mut();
            if let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) {
                entry.due = now.saturating_add(entry.interval);
            }
        }
    }

    fn cancel(inner: &TickerInner, id: u64) {
        inner.entries.borrow_mut().retain(|entry| entry.id != id);
    }
}

/// Guard for a [`Ticker`] registration; dropping it cancels the callback.
pub struct TickRegistration {
    ticker: Weak<TickerInner>,
    id: u64,
}

impl TickRegistration {
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for TickRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.ticker.upgrade() {
            Ticker::cancel(&inner, self.id);
        }
    }
}

#[path = "tests/ticker_tests.rs"]
#[cfg(test)]
mod tests;
