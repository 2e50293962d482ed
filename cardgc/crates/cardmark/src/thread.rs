//! Thread Module - Per-mutator deferred card mark slot
//!
//! Each mutator thread owns exactly one [`DeferredMarkState`]. Only the
//! owning thread sets it, and only the owning thread or the collector at a
//! safepoint flushes it, so the slot needs no synchronization at all. The
//! runtime hands the barrier a `&mut` to its thread context; there is no
//! shared map keyed by thread id.
//!
//! State machine:
//! ```text
//!            defer(r)                 flush
//!   Empty ------------> Pending(r) ----------> Empty
//!     ^ \____________________________________/   |
//!     |            flush (no-op)                 |
//!   attach                                    detach
//! ```

use crate::memory::AddressRange;

/// Pending compensating card mark of one mutator thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeferredMarkState {
    /// No mark pending
    #[default]
    Empty,
    /// Cards covering this object extent still have to be marked
    Pending(AddressRange),
}

impl DeferredMarkState {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, DeferredMarkState::Empty)
    }

    /// Region awaiting its card mark, if any
    #[inline]
    pub fn pending(&self) -> Option<AddressRange> {
        match *self {
            DeferredMarkState::Empty => None,
            DeferredMarkState::Pending(region) => Some(region),
        }
    }

    /// `Empty -> Pending(region)`
    ///
    /// # Panics
    /// If a mark is already pending: an allocation completed without
    /// consuming the previous deferred mark.
    #[inline]
    pub fn defer(&mut self, region: AddressRange) {
        crate::fatal_invariant!(
            self.is_empty(),
            "deferring {} while {} is still pending",
            region,
            self.pending().unwrap_or_default()
        );
        *self = DeferredMarkState::Pending(region);
    }

    /// Take the pending region, leaving the state `Empty`
    #[inline]
    pub fn take(&mut self) -> Option<AddressRange> {
        std::mem::take(self).pending()
    }
}

impl From<Option<AddressRange>> for DeferredMarkState {
    fn from(region: Option<AddressRange>) -> Self {
        region.map_or(DeferredMarkState::Empty, DeferredMarkState::Pending)
    }
}

/// Per-thread storage for the deferred card mark
///
/// Implemented by the runtime's thread context.
pub trait ThreadContext {
    /// Current pending region
    fn deferred_card_mark(&self) -> Option<AddressRange>;

    /// Replace the pending region
    fn set_deferred_card_mark(&mut self, region: Option<AddressRange>);
}

/// Minimal mutator thread context
///
/// Created `Empty` when the thread attaches. Dropping a context with a
/// pending mark is fatal: the runtime must call
/// [`CardMarkPolicy::on_thread_detach`](crate::barrier::CardMarkPolicy::on_thread_detach)
/// first.
#[derive(Debug, Default)]
pub struct MutatorContext {
    id: u64,
    deferred: DeferredMarkState,
}

impl MutatorContext {
    /// Attach a new mutator
    pub fn attach(id: u64) -> Self {
        log::trace!("mutator {} attached", id);
        Self {
            id,
            deferred: DeferredMarkState::Empty,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current deferred state
    pub fn deferred_state(&self) -> DeferredMarkState {
        self.deferred
    }
}

impl ThreadContext for MutatorContext {
    #[inline]
    fn deferred_card_mark(&self) -> Option<AddressRange> {
        self.deferred.pending()
    }

    #[inline]
    fn set_deferred_card_mark(&mut self, region: Option<AddressRange>) {
        self.deferred = region.into();
    }
}

impl Drop for MutatorContext {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        crate::fatal_invariant!(
            self.deferred.is_empty(),
            "mutator {} destroyed with deferred card mark {} pending",
            self.id,
            self.deferred.pending().unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = DeferredMarkState::default();
        assert!(state.is_empty());
        assert_eq!(state.take(), None);

        let region = AddressRange::new(0x1000, 0x1020);
        state.defer(region);
        assert_eq!(state.pending(), Some(region));

        assert_eq!(state.take(), Some(region));
        assert!(state.is_empty());
    }

    #[test]
    #[should_panic(expected = "still pending")]
    fn test_double_defer_is_fatal() {
        let mut state = DeferredMarkState::Empty;
        state.defer(AddressRange::new(0x1000, 0x1020));
        state.defer(AddressRange::new(0x2000, 0x2020));
    }

    #[test]
    fn test_context_slot() {
        let mut ctx = MutatorContext::attach(7);
        assert_eq!(ctx.id(), 7);
        assert_eq!(ctx.deferred_card_mark(), None);

        let region = AddressRange::new(0x3000, 0x3040);
        ctx.set_deferred_card_mark(Some(region));
        assert_eq!(ctx.deferred_state(), DeferredMarkState::Pending(region));

        ctx.set_deferred_card_mark(None);
        assert!(ctx.deferred_state().is_empty());
    }

    #[test]
    #[should_panic(expected = "destroyed with deferred card mark")]
    fn test_drop_with_pending_mark_is_fatal() {
        let mut ctx = MutatorContext::attach(1);
        ctx.set_deferred_card_mark(Some(AddressRange::new(0x1000, 0x1010)));
        drop(ctx);
    }
}
