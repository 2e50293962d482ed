//! Address Range - half-open heap intervals
//!
//! `AddressRange` is the unit every barrier operation works on: the interval
//! written by an array store, the extent of a new object, or a pending
//! deferred card mark. Bounds are byte addresses; sizes in heap words are
//! derived.

use super::{HeapAddress, HEAP_WORD_SIZE};
use crate::util::Alignment;
use serde::Serialize;
use std::fmt;

/// Half-open heap interval `[start, end)`
///
/// # Invariants
/// - `start <= end`
///
/// # Examples
///
/// ```rust
/// use cardmark::AddressRange;
///
/// let range = AddressRange::new(0x1004, 0x1014);
/// let aligned = range.align_outward(8);
/// assert_eq!(aligned, AddressRange::new(0x1000, 0x1018));
/// assert!(aligned.contains_range(&range));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct AddressRange {
    start: HeapAddress,
    end: HeapAddress,
}

impl AddressRange {
    /// Create a range from its bounds
    ///
    /// # Panics
    /// If `start > end`.
    #[inline]
    pub fn new(start: HeapAddress, end: HeapAddress) -> Self {
        crate::fatal_invariant!(
            start <= end,
            "inverted range [{:#x}, {:#x})",
            start,
            end
        );
        Self { start, end }
    }

    /// Create a range of `words` heap words starting at `start`
    #[inline]
    pub fn from_words(start: HeapAddress, words: usize) -> Self {
        let end = words
            .checked_mul(HEAP_WORD_SIZE)
            .and_then(|bytes| start.checked_add(bytes));
        crate::fatal_invariant!(
            end.is_some(),
            "range of {} words at {:#x} overflows the address space",
            words,
            start
        );
        Self::new(start, end.unwrap_or(start))
    }

    /// The empty range
    #[inline]
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    #[inline]
    pub fn start(&self) -> HeapAddress {
        self.start
    }

    #[inline]
    pub fn end(&self) -> HeapAddress {
        self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length in bytes
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.end - self.start
    }

    /// Length in whole heap words (rounded down)
    #[inline]
    pub fn word_size(&self) -> usize {
        self.byte_size() / HEAP_WORD_SIZE
    }

    /// Check whether `addr` lies inside the range
    #[inline]
    pub fn contains(&self, addr: HeapAddress) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Check whether `other` lies entirely inside this range
    ///
    /// The empty range is contained everywhere.
    #[inline]
    pub fn contains_range(&self, other: &AddressRange) -> bool {
        other.is_empty() || (self.start <= other.start && other.end <= self.end)
    }

    /// Both bounds are multiples of `alignment`
    #[inline]
    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        Alignment::is_aligned(self.start, alignment) && Alignment::is_aligned(self.end, alignment)
    }

    /// Both bounds are heap-word aligned
    #[inline]
    pub fn is_word_aligned(&self) -> bool {
        self.is_aligned_to(HEAP_WORD_SIZE)
    }

    /// Widen the range to `alignment`: start rounds down, end rounds up
    ///
    /// The result always contains `self`.
    ///
    /// # Panics
    /// If rounding the end up leaves the address space.
    #[inline]
    pub fn align_outward(&self, alignment: usize) -> AddressRange {
        let end = Alignment::checked_align_up(self.end, alignment);
        crate::fatal_invariant!(
            end.is_some(),
            "end {:#x} cannot be rounded up to {}",
            self.end,
            alignment
        );
        AddressRange {
            start: Alignment::align_down(self.start, alignment),
            end: end.unwrap_or(self.end),
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}
