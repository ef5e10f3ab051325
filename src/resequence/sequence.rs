//! The comparator-sorted pending buffer of a resequencer.

use super::comparator::SequenceElementComparator;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

/// An element waiting for delivery, tagged with its arrival number.
#[derive(Debug, Clone)]
pub(crate) struct PendingEntry<T> {
    pub(crate) element: T,
    arrival: u64,
}

/// Elements received but not yet delivered, kept sorted by the comparator.
///
/// Behaves like an ordered set: an element comparing equal to one already
/// present is rejected. Arrival order is tracked alongside, so the longest
/// waiting entry is known whatever its sort position.
#[derive(Debug)]
pub(crate) struct Sequence<T> {
    entries: VecDeque<PendingEntry<T>>,
    /// Arrival number -> receive instant of every pending entry. Arrival
    /// numbers grow with `received_at`, so the first key is the oldest.
    arrivals: BTreeMap<u64, Instant>,
    next_arrival: u64,
}

impl<T> Sequence<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            arrivals: BTreeMap::new(),
            next_arrival: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `element` at its sorted position. Returns `false` if an equal
    /// element is already present.
    ///
    /// `received_at` must not go backwards between calls.
    pub(crate) fn insert<C>(&mut self, element: T, received_at: Instant, comparator: &C) -> bool
    where
        C: SequenceElementComparator<T> + ?Sized,
    {
        match self
            .entries
            .binary_search_by(|entry| comparator.compare(&entry.element, &element))
        {
            Ok(_) => false,
            Err(index) => {
                let arrival = self.next_arrival;
                self.next_arrival += 1;
                self.arrivals.insert(arrival, received_at);
                self.entries.insert(
                    index,
                    PendingEntry { element, arrival },
                );
                true
            }
        }
    }

    /// The smallest pending entry.
    pub(crate) fn first(&self) -> Option<&PendingEntry<T>> {
        self.entries.front()
    }

    /// Removes and returns the smallest pending entry.
    pub(crate) fn pop_first(&mut self) -> Option<PendingEntry<T>> {
        let entry = self.entries.pop_front()?;
        self.arrivals.remove(&entry.arrival);
        Some(entry)
    }

    /// When the entry that has been pending longest was received.
    pub(crate) fn oldest_received_at(&self) -> Option<Instant> {
        self.arrivals.first_key_value().map(|(_, at)| *at)
    }

    /// Drops every entry and returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.arrivals.clear();
        dropped
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.element)
    }
}

/// `true` if `element` sorts at or before `marker`.
pub(crate) fn not_after<T, C>(element: &T, marker: &T, comparator: &C) -> bool
where
    C: SequenceElementComparator<T> + ?Sized,
{
    comparator.compare(element, marker) != Ordering::Greater
}
