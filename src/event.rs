use std::{cell::Cell, rc::Rc};

use crate::time::Time;

/// A request to run an action at a specific simulated time.
///
/// The handle is shared: clones refer to the same event, and equality is identity. A scheduler
/// keeps a clone in its storage while the event is present, so callers can hold on to the
/// handle to cancel or reuse it later.
///
/// Two flags track the event's lifecycle:
///
/// - `present`: the event occupies a slot in some scheduler's storage.
/// - `valid`: the event is still pending delivery (not cancelled, not yet fired).
///
/// An event may be present but no longer valid. Such a stale entry is discarded silently when it
/// reaches the front of the queue. A valid event is always present.
#[derive(Debug)]
pub struct ScheduledEvent<A> {
    inner: Rc<Inner<A>>,
}

#[derive(Debug)]
struct Inner<A> {
    time: Cell<Time>,
    present: Cell<bool>,
    valid: Cell<bool>,
    action: A,
}

impl<A> ScheduledEvent<A> {
    pub fn new(action: A) -> Self {
        Self {
            inner: Rc::new(Inner {
                time: Cell::new(Time::ZERO),
                present: Cell::new(false),
                valid: Cell::new(false),
                action,
            }),
        }
    }

    /// The time this event was last scheduled at, or `Time::ZERO` if it never was.
    pub fn time(&self) -> Time {
        self.inner.time.get()
    }

    pub fn action(&self) -> &A {
        &self.inner.action
    }

    pub fn is_present(&self) -> bool {
        self.inner.present.get()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }

    /// Cancels the event in place without touching the queue that holds it.
    ///
    /// The entry stays in storage and is dropped once it is popped. Returns `true` if the event
    /// was pending.
    pub fn soft_cancel(&self) -> bool {
        self.inner.valid.replace(false)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // Only the scheduler moves an event through its lifecycle.

    pub(crate) fn mark_scheduled(&self, time: Time) {
        self.inner.time.set(time);
        self.inner.present.set(true);
        self.inner.valid.set(true);
    }

    pub(crate) fn mark_removed(&self) {
        self.inner.present.set(false);
        self.inner.valid.set(false);
    }

    pub(crate) fn mark_absent(&self) {
        self.inner.present.set(false);
    }
}

impl<A> Clone for ScheduledEvent<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> PartialEq for ScheduledEvent<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> Eq for ScheduledEvent<A> {}
