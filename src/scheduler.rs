//! The event queue at the heart of a simulation.
//!
//! A [`Scheduler`] hands out events in ascending `(time, insertion order)` and delivers each one
//! at most once per insert. Cancellation comes in two flavours:
//!
//! - eager: [`Scheduler::cancel`] physically removes the entry, which costs a scan of the heap;
//! - lazy: [`ScheduledEvent::soft_cancel`] (and [`Scheduler::cancel_where`] under
//!   [`CancelStrategy::Lazy`]) only flips the event's `valid` flag. The stale entry stays in the
//!   heap until it would have been popped, at which point it is discarded.
//!
//! Re-inserting an event whose stale entry is still queued evicts that entry first, so every
//! event has at most one entry in the heap.
//!
//! All operations must run on the simulation thread. Events are reference counted with `Rc`, so
//! neither the scheduler nor its events can cross threads.

mod counters;
mod entry;

use std::{collections::BinaryHeap, fmt};

use delegate::delegate;
use tracing::{debug, trace};

use crate::{event::ScheduledEvent, time::Time};

pub use self::counters::Counters;
use self::entry::Entry;

#[derive(Debug)]
pub struct Scheduler<A> {
    heap: BinaryHeap<Entry<A>>,
    next_seq: u64,
    strategy: CancelStrategy,
    counters: Counters,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(cfg: SchedulerConfig) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(cfg.capacity),
            next_seq: 0,
            strategy: cfg.cancel_strategy,
            counters: Counters::default(),
        }
    }

    /// Schedules `event` to fire at `time`.
    ///
    /// Fails if the event is still pending. If the event was cancelled lazily and its stale entry
    /// is still queued here, the entry is evicted before the event is queued again. On error
    /// neither the queue nor the event is modified.
    pub fn insert(&mut self, event: &ScheduledEvent<A>, time: Time) -> Result<(), ScheduleError> {
        if event.is_present() {
            if event.is_valid() {
                return Err(ScheduleError::InvalidState { time: event.time() });
            }
            if !self.holds(event) {
                return Err(ScheduleError::ForeignEntry);
            }
            self.remove_entry(event);
            self.counters.insert_removals += 1;
            debug!(old = %event.time(), new = %time, "evicted stale entry on reschedule");
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        event.mark_scheduled(time);
        self.heap.push(Entry::new(time, seq, event.clone()));
        self.counters.inserts += 1;
        trace!(%time, seq, len = self.heap.len(), "insert");
        Ok(())
    }

    /// Removes `event` from the queue right away. Returns `false` if it was not queued here.
    pub fn cancel(&mut self, event: &ScheduledEvent<A>) -> bool {
        if !event.is_present() || !self.remove_entry(event) {
            return false;
        }
        event.mark_removed();
        self.counters.removals += 1;
        debug!(time = %event.time(), "cancel");
        true
    }

    /// Pops the earliest pending event, skipping stale entries.
    ///
    /// The returned event is no longer present nor valid and may be inserted again.
    pub fn pop_next(&mut self) -> Option<ScheduledEvent<A>> {
        while let Some(entry) = self.heap.pop() {
            entry.event.mark_absent();
            if !entry.event.is_valid() {
                trace!(time = %entry.time(), seq = entry.seq(), "discard stale entry");
                continue;
            }
            entry.event.mark_removed();
            self.counters.pops += 1;
            trace!(time = %entry.time(), seq = entry.seq(), "pop");
            return Some(entry.event);
        }
        None
    }

    /// Returns the event `pop_next` would return, without delivering it.
    ///
    /// Stale entries at the front of the queue are discarded on the way.
    pub fn peek_next(&mut self) -> Option<&ScheduledEvent<A>> {
        while self.heap.peek().is_some_and(|e| !e.event.is_valid()) {
            if let Some(entry) = self.heap.pop() {
                entry.event.mark_absent();
                trace!(time = %entry.time(), seq = entry.seq(), "discard stale entry");
            }
        }
        self.heap.peek().map(|e| &e.event)
    }

    /// Cancels every pending event matching `pred`. Returns `true` if any did.
    ///
    /// Under [`CancelStrategy::Lazy`] matched events stay queued as stale entries and no counter
    /// moves. Under [`CancelStrategy::Eager`] they are removed and each counts as a removal.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&ScheduledEvent<A>) -> bool) -> bool {
        let matched = match self.strategy {
            CancelStrategy::Lazy => {
                let mut matched = 0u64;
                for entry in self.heap.iter() {
                    if entry.event.is_valid() && pred(&entry.event) {
                        entry.event.soft_cancel();
                        matched += 1;
                    }
                }
                matched
            }
            CancelStrategy::Eager => {
                let mut matched = 0u64;
                self.heap.retain(|entry| {
                    if entry.event.is_valid() && pred(&entry.event) {
                        entry.event.mark_removed();
                        matched += 1;
                        false
                    } else {
                        true
                    }
                });
                self.counters.removals += matched;
                matched
            }
        };
        debug!(matched, strategy = ?self.strategy, "bulk cancel");
        matched > 0
    }

    /// Drops every entry, stale or not.
    pub fn clear(&mut self) {
        let dropped = self.heap.len();
        for entry in self.heap.drain() {
            entry.event.mark_removed();
        }
        self.counters.clears += 1;
        debug!(dropped, "clear");
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn cancel_strategy(&self) -> CancelStrategy {
        self.strategy
    }

    delegate! {
        to self.heap {
            /// Number of physical entries, stale ones included.
            pub fn len(&self) -> usize;
            /// Whether storage holds no entries at all. A non-empty queue may still hold only
            /// stale entries.
            pub fn is_empty(&self) -> bool;
        }
    }

    fn holds(&self, event: &ScheduledEvent<A>) -> bool {
        self.heap.iter().any(|e| e.event.ptr_eq(event))
    }

    // Flags are left to the caller
    fn remove_entry(&mut self, event: &ScheduledEvent<A>) -> bool {
        let before = self.heap.len();
        self.heap.retain(|e| !e.event.ptr_eq(event));
        self.heap.len() != before
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Display for Scheduler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scheduler with {} events", self.heap.len())
    }
}

#[derive(
    Debug, Clone, Default, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct SchedulerConfig {
    #[builder(default)]
    pub cancel_strategy: CancelStrategy,
    /// Initial heap capacity.
    #[builder(default)]
    pub capacity: usize,
}

/// How [`Scheduler::cancel_where`] gets rid of matched events.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    derivative::Derivative,
    serde::Serialize,
    serde::Deserialize,
)]
#[derivative(Default)]
#[serde(rename_all = "snake_case")]
pub enum CancelStrategy {
    /// Flag matched events as cancelled and drop them when they reach the front.
    #[derivative(Default)]
    Lazy,
    /// Remove matched entries from the heap immediately.
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("event is already scheduled at {time}")]
    InvalidState { time: Time },

    /// The event was cancelled lazily but its stale entry sits in another scheduler. Like
    /// `InvalidState` this is a caller bug (the event is still owned by a different queue), and
    /// it is reported so the event is never queued twice.
    #[error("stale entry for this event is held by another scheduler")]
    ForeignEntry,
}
