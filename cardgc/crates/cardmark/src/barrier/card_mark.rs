//! Card Mark Policy - generational post-write barrier
//!
//! Decides for each barrier event whether cards are marked now, later, or
//! not at all:
//!
//! | event                         | action                                   |
//! |-------------------------------|------------------------------------------|
//! | array write / field store     | dirty overlapping cards                  |
//! | forced mark (copy, promotion) | force-dirty overlapping cards            |
//! | slow-path allocation, old gen | force-dirty now, or defer to thread slot |
//! | slow-path allocation, young   | nothing (young gen is always scanned)    |
//! | reference-free array          | nothing (no references to find)          |
//!
//! Why slow-path allocations are marked at all: the optimizing compiler may
//! drop the card marks of initializing stores on the inlined allocation
//! path, betting the object lands in the young generation. When the slow
//! path places it in the old generation, this policy pays for the elided
//! marks with one region mark per object.
//!
//! Whether that mark is deferred is decided once, at construction, from the
//! elision switches and the card store's ordering capability. The collector
//! variant is assumed fixed for the lifetime of the process.

use super::stats::{AtomicBarrierStats, BarrierStats, StatKind};
use super::BarrierSet;
use crate::card::CardStore;
use crate::config::{BarrierConfig, ElisionConfig};
use crate::error::{BarrierError, Result};
use crate::logging::{self, BarrierEvent};
use crate::memory::{AddressRange, HeapLayout};
use crate::object::{ObjectModel, ObjectRef};
use crate::thread::{DeferredMarkState, ThreadContext};
use std::fmt;
use std::sync::Arc;

/// Card-marking barrier over a card store and an object model
pub struct CardMarkPolicy<C: CardStore, O: ObjectModel> {
    pub(super) cards: Arc<C>,
    pub(super) objects: Arc<O>,
    layout: HeapLayout,
    elision: ElisionConfig,
    /// Compensating marks go to the thread slot instead of the card store
    pub(super) deferral_enabled: bool,
    /// Cached card store ordering capability
    strict_ordering: bool,
    stats: AtomicBarrierStats,
    stats_enabled: bool,
    pub(super) verbose: bool,
}

impl<C: CardStore, O: ObjectModel> CardMarkPolicy<C, O> {
    /// Build the policy and resolve deferral
    ///
    /// # Errors
    /// - `Configuration` if `config` does not validate
    /// - `LayoutMismatch` if the card store uses another card size
    pub fn new(config: &BarrierConfig, cards: Arc<C>, objects: Arc<O>) -> Result<Self> {
        config.validate()?;

        if cards.card_size() != config.card_size {
            return Err(BarrierError::LayoutMismatch(format!(
                "card store uses {} byte cards, configuration expects {}",
                cards.card_size(),
                config.card_size
            )));
        }

        let strict_ordering = cards.requires_store_ordered_marking();
        let deferral_enabled = config.elision.deferral_enabled(strict_ordering);

        log::debug!(
            "card mark policy: deferral={} strict_ordering={} reduce_initial_card_marks={}",
            deferral_enabled,
            strict_ordering,
            config.elision.reduce_initial_card_marks
        );

        let policy = Self {
            cards,
            objects,
            layout: config.layout(),
            elision: config.elision,
            deferral_enabled,
            strict_ordering,
            stats: AtomicBarrierStats::new(),
            stats_enabled: config.stats_enabled,
            verbose: config.verbose,
        };

        if policy.verbose {
            logging::log_event(BarrierEvent::PolicyInitialized {
                card_store: policy.cards.describe(),
                deferral_enabled,
                strict_ordering,
                card_size: config.card_size,
            });
        }

        Ok(policy)
    }

    #[inline]
    pub(super) fn count(&self, kind: StatKind) {
        if self.stats_enabled {
            self.stats.record(kind);
        }
    }

    /// Dirty every card overlapping `region`
    #[inline]
    pub fn mark_region(&self, region: AddressRange) {
        self.count(StatKind::RegionMarked);
        self.cards.dirty(region);
    }

    /// Force-dirty every card overlapping `region`
    #[inline]
    pub fn invalidate(&self, region: AddressRange) {
        self.count(StatKind::Invalidation);
        self.cards.force_dirty(region);
    }

    /// Compensate for card marks elided on the allocation fast path
    ///
    /// Called once per object on the slow allocation path, after the object
    /// is fully initialized. Any mark still pending for `thread` is flushed
    /// first, so a deferred mark never outlives the thread's next slow-path
    /// allocation.
    ///
    /// # Panics
    /// On any deferred-state invariant breach, see
    /// [`flush_deferred`](Self::flush_deferred).
    pub fn on_allocation_exit<T>(&self, thread: &mut T, obj: ObjectRef)
    where
        T: ThreadContext + ?Sized,
    {
        if !self.elision.reduce_initial_card_marks {
            return;
        }
        crate::fatal_invariant!(!obj.is_null(), "slow-path allocation produced a null object");

        self.flush_deferred(thread, super::FlushReason::Allocation);

        if self.objects.is_reference_free_array(obj) {
            self.count(StatKind::SkippedReferenceFree);
            self.assert_nothing_pending(thread);
            return;
        }

        if self.cards.is_in_young(obj) {
            self.count(StatKind::SkippedYoung);
            self.assert_nothing_pending(thread);
            return;
        }

        let region = self.objects.extent(obj);
        crate::fatal_invariant!(
            !region.is_empty(),
            "object {} has an empty extent",
            obj
        );

        if self.deferral_enabled {
            let mut state = DeferredMarkState::from(thread.deferred_card_mark());
            state.defer(region);
            thread.set_deferred_card_mark(state.pending());
            self.count(StatKind::DeferredMark);
            log::trace!("deferred card mark for {} over {}", obj, region);
        } else {
            self.invalidate(region);
            self.count(StatKind::ImmediateMark);
        }
    }

    #[inline]
    fn assert_nothing_pending<T: ThreadContext + ?Sized>(&self, thread: &T) {
        crate::fatal_invariant!(
            thread.deferred_card_mark().is_none(),
            "deferred card mark still pending after flush"
        );
    }

    /// Card marks must become visible only after the covered object's
    /// initializing stores
    #[inline]
    pub fn requires_strict_ordering(&self) -> bool {
        self.strict_ordering
    }

    /// Compensating marks are deferred to the thread slot
    #[inline]
    pub fn deferral_enabled(&self) -> bool {
        self.deferral_enabled
    }

    #[inline]
    pub fn layout(&self) -> HeapLayout {
        self.layout
    }

    pub fn card_store(&self) -> &Arc<C> {
        &self.cards
    }

    pub fn object_model(&self) -> &Arc<O> {
        &self.objects
    }

    /// Statistics snapshot
    pub fn stats(&self) -> BarrierStats {
        self.stats.snapshot()
    }

    /// Log a statistics snapshot to the global logger
    pub fn report_stats(&self) {
        logging::log_event(BarrierEvent::Stats(self.stats()));
    }
}

impl<C, O> BarrierSet for CardMarkPolicy<C, O>
where
    C: CardStore,
    O: ObjectModel,
{
    fn name(&self) -> &'static str {
        "card mark"
    }

    fn layout(&self) -> HeapLayout {
        self.layout
    }

    #[inline]
    fn write_region(&self, region: AddressRange) {
        self.mark_region(region);
    }

    #[inline]
    fn invalidate(&self, region: AddressRange) {
        CardMarkPolicy::invalidate(self, region);
    }

    #[inline]
    fn write_ref_array_work(&self, region: AddressRange) {
        self.count(StatKind::ArrayWrite);
        self.mark_region(region);
    }

    fn on_slowpath_allocation_exit(&self, thread: &mut dyn ThreadContext, obj: ObjectRef) {
        self.on_allocation_exit(thread, obj);
    }

    fn on_thread_detach(&self, thread: &mut dyn ThreadContext) {
        CardMarkPolicy::on_thread_detach(self, thread);
    }

    fn card_mark_must_follow_store(&self) -> bool {
        self.strict_ordering
    }
}

impl<C: CardStore, O: ObjectModel> fmt::Display for CardMarkPolicy<C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "card mark barrier over {} (reference size {}, deferral {}, strict ordering {})",
            self.cards.describe(),
            self.layout.reference_size(),
            if self.deferral_enabled { "on" } else { "off" },
            if self.strict_ordering { "on" } else { "off" }
        )
    }
}
