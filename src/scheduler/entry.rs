#![allow(clippy::non_canonical_partial_ord_impl)]

use std::cmp::Reverse;

use crate::{event::ScheduledEvent, time::Time};

/// Ordering key of a heap entry. Ties on `time` fall back to insertion order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, derive_new::new)]
pub(super) struct Key {
    pub(super) time: Time,
    pub(super) seq: u64,
}

// `BinaryHeap` is a max-heap, so the key is reversed to pop the earliest entry first
#[derive(Debug, derivative::Derivative)]
#[derivative(
    PartialEq(bound = ""),
    Eq(bound = ""),
    PartialOrd(bound = ""),
    Ord(bound = "")
)]
pub(super) struct Entry<A> {
    key: Reverse<Key>,
    #[derivative(PartialEq = "ignore", PartialOrd = "ignore", Ord = "ignore")]
    pub(super) event: ScheduledEvent<A>,
}

impl<A> Entry<A> {
    pub(super) fn new(time: Time, seq: u64, event: ScheduledEvent<A>) -> Self {
        Self {
            key: Reverse(Key::new(time, seq)),
            event,
        }
    }

    pub(super) fn time(&self) -> Time {
        self.key.0.time
    }

    pub(super) fn seq(&self) -> u64 {
        self.key.0.seq
    }
}
