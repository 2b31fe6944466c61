//! Bounded-wait rendezvous between a blocked caller and a callback thread.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline `timeout` from now, or `None` when it is too far out to represent
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// Single-slot value holder; the first `set` wins
pub struct Rendezvous<T> {
    slot: Arc<Slot<T>>,
}

/// Setting side of a [`Rendezvous`], cloned into listeners and callbacks
pub struct RendezvousSetter<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for RendezvousSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                value: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    pub fn setter(&self) -> RendezvousSetter<T> {
        RendezvousSetter {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Block until a value is set or `timeout` elapses
    pub fn wait(self, timeout: Duration) -> Option<T> {
        self.wait_until(deadline_after(timeout))
    }

    /// Block until a value is set or `deadline` passes; `None` waits forever
    pub fn wait_until(self, deadline: Option<Instant>) -> Option<T> {
        let mut value = self.slot.value.lock();
        while value.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.slot.ready.wait_until(&mut value, deadline).timed_out() {
                        break;
                    }
                }
                None => self.slot.ready.wait(&mut value),
            }
        }
        value.take()
    }
}

impl<T> RendezvousSetter<T> {
    /// Store a value; returns false if one was already set
    pub fn set(&self, value: T) -> bool {
        let mut slot = self.slot.value.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        self.slot.ready.notify_all();
        true
    }

    pub fn is_set(&self) -> bool {
        self.slot.value.lock().is_some()
    }
}
