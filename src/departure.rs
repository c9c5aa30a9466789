use crate::flight::Flight;
use crate::time::Time;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Minimum virtual minutes between two departures from the same airport.
pub const MIN_DEPARTURE_SPACING: u64 = 10;

#[derive(Clone, Debug)]
struct Slot {
    due: Time,
    seq: u64,
    flight: Arc<Flight>,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Single-runway admission queue of one airport.
///
/// Flights leave earliest-due first (insertion order on ties), at most one per call, and
/// never closer than [`MIN_DEPARTURE_SPACING`] to the previous departure. The original
/// schedule is kept aside so a stopped run can be replayed.
#[derive(Debug, Default)]
pub struct DepartureQueue {
    pending: BinaryHeap<Reverse<Slot>>,
    schedule: Vec<Slot>,
    last_departure: Option<Time>,
    next_seq: u64,
}

impl DepartureQueue {
    pub fn new() -> DepartureQueue {
        DepartureQueue::default()
    }

    pub fn push(&mut self, flight: Arc<Flight>) {
        let slot = Slot {
            due: flight.departure_time(),
            seq: self.next_seq,
            flight,
        };
        self.next_seq += 1;
        self.schedule.push(slot.clone());
        self.pending.push(Reverse(slot));
    }

    /// Releases the next flight allowed to take off at `now`, if any.
    pub fn send(&mut self, now: Time) -> Option<Arc<Flight>> {
        if self.is_empty() {
            return None;
        }
        if self
            .last_departure()
            .is_some_and(|last| now.since(last) < MIN_DEPARTURE_SPACING)
        {
            return None;
        }
        if self.peek()?.departure_time() > now {
            return None;
        }
        self.last_departure = Some(now);
        self.pending.pop().map(|Reverse(slot)| slot.flight)
    }

    pub fn peek(&self) -> Option<&Arc<Flight>> {
        self.pending.peek().map(|Reverse(slot)| &slot.flight)
    }

    /// Refills the queue from the original schedule and forgets the last departure.
    pub fn reset(&mut self) {
        self.pending = self.schedule.iter().cloned().map(Reverse).collect();
        self.last_departure = None;
    }

    pub fn last_departure(&self) -> Option<Time> {
        self.last_departure
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn scheduled(&self) -> usize {
        self.schedule.len()
    }
}
