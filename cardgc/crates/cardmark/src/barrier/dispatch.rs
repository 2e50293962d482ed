//! Array Write Dispatch - entry point for bulk reference stores
//!
//! Turns `(first slot, element count)` into a word-aligned region. With
//! compressed references two slots can share a heap word, so the interval is
//! widened outward: start rounds down, end rounds up. Shrinking it could
//! leave a modified slot outside every marked card.

use super::{global, BarrierSet};
use crate::error::Result;
use crate::memory::{AddressRange, HeapAddress, HeapLayout};
use std::sync::Arc;

/// Word-aligned region covering `count` references written from `start`
///
/// # Panics
/// - If `count` exceeds `isize::MAX` or the write runs past the end of the
///   address space.
/// - If references are word sized and the interval is not already word
///   aligned.
///
/// # Examples
///
/// ```rust
/// use cardmark::{array_write_region, AddressRange, HeapLayout};
///
/// let region = array_write_region(HeapLayout::compressed(), 0x1004, 4);
/// assert_eq!(region, AddressRange::new(0x1000, 0x1018));
/// ```
#[inline]
pub fn array_write_region(layout: HeapLayout, start: HeapAddress, count: usize) -> AddressRange {
    crate::fatal_invariant!(
        count <= isize::MAX as usize,
        "array write count {} too large",
        count
    );

    let end = count
        .checked_mul(layout.reference_size())
        .and_then(|bytes| start.checked_add(bytes));
    crate::fatal_invariant!(
        end.is_some(),
        "array write of {} references at {:#x} overflows the address space",
        count,
        start
    );

    let written = AddressRange::new(start, end.unwrap_or(start));
    let aligned = written.align_outward(layout.word_size());

    if !layout.uses_compressed_references() {
        crate::fatal_invariant!(
            aligned == written,
            "expected heap word alignment of {} with word-sized references",
            written
        );
    }

    aligned
}

/// Runtime-facing dispatcher for bulk reference-array writes
///
/// Caches the heap layout so the hot path does a single virtual call into
/// the barrier set.
pub struct BarrierDispatcher<B: BarrierSet + ?Sized = dyn BarrierSet> {
    layout: HeapLayout,
    barrier: Arc<B>,
}

impl<B: BarrierSet + ?Sized> BarrierDispatcher<B> {
    pub fn new(barrier: Arc<B>) -> Self {
        Self {
            layout: barrier.layout(),
            barrier,
        }
    }

    /// Record a bulk write of `count` references starting at `start`
    #[inline]
    pub fn mark_array_write(&self, start: HeapAddress, count: usize) {
        let region = array_write_region(self.layout, start, count);
        self.barrier.write_ref_array_work(region);
    }

    pub fn layout(&self) -> HeapLayout {
        self.layout
    }

    pub fn barrier(&self) -> &Arc<B> {
        &self.barrier
    }
}

impl BarrierDispatcher {
    /// Dispatcher over the process-wide barrier set
    pub fn from_installed() -> Result<Self> {
        Ok(Self::new(global::barrier_set()?))
    }
}
