//! Barrier Statistics - Card mark accounting
//!
//! Counters are updated from every mutator with relaxed atomics and read as
//! a [`BarrierStats`] snapshot. Each counter sits on its own cache line so
//! mutators bumping different counters do not contend.
//!
//! Metrics tracked:
//! - Array writes dispatched and regions marked
//! - Forced invalidations
//! - Slow-path allocation outcomes (immediate, deferred, skipped)
//! - Deferred flushes and collector flush-all passes

use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// BarrierStats - point-in-time copy of the barrier counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BarrierStats {
    /// Bulk reference-array writes dispatched
    pub array_writes: u64,
    /// Regions dirtied on the barrier path
    pub regions_marked: u64,
    /// Regions dirtied on the forced path
    pub invalidations: u64,
    /// Slow-path allocations marked immediately
    pub immediate_marks: u64,
    /// Slow-path allocations whose mark was deferred
    pub deferred_marks: u64,
    /// Deferred marks flushed to the card store
    pub deferred_flushes: u64,
    /// Slow-path allocations of reference-free arrays
    pub skipped_reference_free: u64,
    /// Slow-path allocations already in the young generation
    pub skipped_young: u64,
    /// Collector flush-all passes
    pub flush_all_passes: u64,
}

impl BarrierStats {
    /// Create new stats with default values
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slow-path allocations seen by the barrier
    #[inline]
    pub fn slow_path_allocations(&self) -> u64 {
        self.immediate_marks + self.deferred_marks + self.skipped_reference_free + self.skipped_young
    }

    /// Deferred marks not yet flushed
    #[inline]
    pub fn outstanding_deferred(&self) -> u64 {
        self.deferred_marks.saturating_sub(self.deferred_flushes)
    }
}

/// Kind of event counted by [`AtomicBarrierStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    ArrayWrite,
    RegionMarked,
    Invalidation,
    ImmediateMark,
    DeferredMark,
    DeferredFlush,
    SkippedReferenceFree,
    SkippedYoung,
    FlushAll,
}

const STAT_KINDS: usize = 9;

impl StatKind {
    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// AtomicBarrierStats - thread-safe stats collector
pub struct AtomicBarrierStats {
    counters: [CachePadded<AtomicU64>; STAT_KINDS],
}

impl AtomicBarrierStats {
    /// Create new atomic stats
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| CachePadded::new(AtomicU64::new(0))),
        }
    }

    /// Count one event
    #[inline]
    pub fn record(&self, kind: StatKind) {
        self.counters[kind.slot()].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of one counter
    #[inline]
    pub fn get(&self, kind: StatKind) -> u64 {
        self.counters[kind.slot()].load(Ordering::Relaxed)
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> BarrierStats {
        BarrierStats {
            array_writes: self.get(StatKind::ArrayWrite),
            regions_marked: self.get(StatKind::RegionMarked),
            invalidations: self.get(StatKind::Invalidation),
            immediate_marks: self.get(StatKind::ImmediateMark),
            deferred_marks: self.get(StatKind::DeferredMark),
            deferred_flushes: self.get(StatKind::DeferredFlush),
            skipped_reference_free: self.get(StatKind::SkippedReferenceFree),
            skipped_young: self.get(StatKind::SkippedYoung),
            flush_all_passes: self.get(StatKind::FlushAll),
        }
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for AtomicBarrierStats {
    fn default() -> Self {
        Self::new()
    }
}
