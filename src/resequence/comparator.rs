//! Ordering and adjacency of sequence elements.
//!
//! The engine never assumes integer arithmetic on its elements: whether two
//! elements are adjacent (no element can exist between them) is decided by a
//! [`SequenceElementComparator`]. [`SequenceNumberComparator`] is the stock
//! implementation for anything carrying an integral sequence number.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Defines the total order of sequence elements and which elements are
/// immediate neighbours.
///
/// `compare` must be a total order, and `successor(a, b)` must imply
/// `compare(a, b) == Ordering::Greater`.
pub trait SequenceElementComparator<T>: Send + Sync {
    /// Returns `true` if `o1` is the immediate predecessor of `o2`.
    fn predecessor(&self, o1: &T, o2: &T) -> bool {
        self.successor(o2, o1)
    }

    /// Returns `true` if `o1` is the immediate successor of `o2`.
    fn successor(&self, o1: &T, o2: &T) -> bool;

    /// Total order of elements.
    fn compare(&self, o1: &T, o2: &T) -> Ordering;
}

/// An element that carries an integral sequence number.
pub trait Sequenced {
    /// The element's position in its sequence.
    fn sequence_number(&self) -> i64;
}

macro_rules! impl_sequenced {
    ($($ty:ty),*) => {
        $(
            impl Sequenced for $ty {
                fn sequence_number(&self) -> i64 {
                    i64::from(*self)
                }
            }
        )*
    };
}

impl_sequenced!(i8, i16, i32, i64, u8, u16, u32);

/// Orders [`Sequenced`] elements by sequence number; `n + 1` succeeds `n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceNumberComparator;

impl SequenceNumberComparator {
    /// Creates the comparator.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Sequenced> SequenceElementComparator<T> for SequenceNumberComparator {
    fn successor(&self, o1: &T, o2: &T) -> bool {
        o2.sequence_number()
            .checked_add(1)
            .is_some_and(|next| next == o1.sequence_number())
    }

    fn compare(&self, o1: &T, o2: &T) -> Ordering {
        o1.sequence_number().cmp(&o2.sequence_number())
    }
}

/// A payload tagged with the sequence number it must be delivered at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedMessage<P> {
    /// Position of this message in its sequence.
    pub sequence_number: i64,
    /// The opaque payload.
    pub payload: P,
}

impl<P> SequencedMessage<P> {
    /// Tags `payload` with `sequence_number`.
    pub fn new(sequence_number: i64, payload: P) -> Self {
        Self {
            sequence_number,
            payload,
        }
    }
}

impl<P> Sequenced for SequencedMessage<P> {
    fn sequence_number(&self) -> i64 {
        self.sequence_number
    }
}
