//! Deferred Card Marks - flush protocol
//!
//! A deferred mark is flushed at exactly one of three points, whichever
//! comes first:
//!
//! 1. the owning thread's next slow-path allocation
//! 2. the owning thread's detach
//! 3. a collector flush-all at a safepoint, before cards are scanned
//!
//! Flushing runs on the thread that performed the initializing stores (or
//! while that thread is stopped), so the card mark is ordered after those
//! stores without any fence beyond what the card store applies itself.

use super::card_mark::CardMarkPolicy;
use super::stats::StatKind;
use crate::card::CardStore;
use crate::logging::{self, BarrierEvent};
use crate::memory::AddressRange;
use crate::object::{ObjectModel, ObjectRef};
use crate::thread::{DeferredMarkState, ThreadContext};
use std::fmt;

/// Point at which a deferred mark was flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Next slow-path allocation of the owning thread
    Allocation,
    /// Owning thread detached
    ThreadDetach,
    /// Collector drain before card scanning
    Safepoint,
}

impl FlushReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FlushReason::Allocation => "allocation",
            FlushReason::ThreadDetach => "thread detach",
            FlushReason::Safepoint => "safepoint",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<C: CardStore, O: ObjectModel> CardMarkPolicy<C, O> {
    /// Flush the pending mark of `thread`, if any
    ///
    /// `Pending(r) -> Empty` after force-dirtying `r`; `Empty -> Empty` is
    /// a no-op. Returns whether a mark was flushed.
    ///
    /// # Panics
    /// - A mark is pending although deferral is disabled.
    /// - The pending region no longer holds exactly one well-formed,
    ///   old-generation object.
    pub fn flush_deferred<T>(&self, thread: &mut T, reason: FlushReason) -> bool
    where
        T: ThreadContext + ?Sized,
    {
        let mut state = DeferredMarkState::from(thread.deferred_card_mark());
        let Some(region) = state.take() else {
            return false;
        };

        crate::fatal_invariant!(
            self.deferral_enabled,
            "deferred card mark {} pending while deferral is disabled",
            region
        );
        self.verify_deferred(region);

        self.invalidate(region);
        thread.set_deferred_card_mark(state.pending());
        crate::fatal_invariant!(
            thread.deferred_card_mark().is_none(),
            "deferred card mark not cleared after flush"
        );

        self.count(StatKind::DeferredFlush);
        log::trace!("flushed deferred card mark {} on {}", region, reason);
        if self.verbose {
            logging::log_event(BarrierEvent::DeferredFlush {
                start: region.start(),
                end: region.end(),
                reason: reason.to_string(),
            });
        }

        true
    }

    /// The deferred region must still hold the object it was recorded for
    ///
    /// A collection between deferral and flush would have moved or
    /// processed the object, leaving the region stale.
    fn verify_deferred(&self, region: AddressRange) {
        let obj = ObjectRef::new(region.start());

        crate::fatal_invariant!(
            !self.cards.is_in_young(obj),
            "deferred object {} is in the young generation, it should have been filtered at allocation",
            obj
        );
        crate::fatal_invariant!(
            self.objects.is_well_formed(obj),
            "deferred region {} does not start with a well-formed object",
            region
        );

        let extent = self.objects.extent(obj);
        crate::fatal_invariant!(
            extent == region,
            "deferred region {} does not match object extent {}: multiple objects?",
            region,
            extent
        );
    }

    /// Flush the pending mark of a thread that is about to be destroyed
    ///
    /// Must run before the thread context is dropped; a mark still pending
    /// at destruction would be lost.
    pub fn on_thread_detach<T>(&self, thread: &mut T)
    where
        T: ThreadContext + ?Sized,
    {
        let flushed = self.flush_deferred(thread, FlushReason::ThreadDetach);
        if self.verbose {
            logging::log_event(BarrierEvent::ThreadDetached { flushed });
        }
    }

    /// Drain the deferred marks of every live mutator
    ///
    /// Called by the collector before scanning cards. Taking `&mut` to
    /// every context requires all mutators to be stopped. Returns the
    /// number of marks flushed. A verbose policy also logs a statistics
    /// snapshot after each pass.
    pub fn flush_all_deferred<'a, T, I>(&self, threads: I) -> usize
    where
        T: ThreadContext + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        let mut visited = 0;
        let mut flushed = 0;

        for thread in threads {
            visited += 1;
            if self.flush_deferred(thread, FlushReason::Safepoint) {
                flushed += 1;
            }
        }

        self.count(StatKind::FlushAll);
        log::debug!(
            "flush-all visited {} threads, flushed {} deferred card marks",
            visited,
            flushed
        );
        if self.verbose {
            logging::log_event(BarrierEvent::FlushAll {
                threads: visited,
                flushed,
            });
            self.report_stats();
        }

        flushed
    }
}
