//! Card Module - Card store contract and a byte-per-card table
//!
//! The barrier only needs four things from the card store: mark a region
//! dirty on the barrier path, mark a region dirty on the forced path, answer
//! whether an object is in the young generation, and say whether cards may
//! be scanned while mutators run.
//!
//! Both marking operations must be monotonic and idempotent: they only ever
//! set cards to dirty, so concurrent marks of the same card from different
//! threads commute. Clearing is reserved to the collector.

pub mod table;

pub use table::{CardTable, CARD_CLEAN, CARD_DIRTY};

use crate::memory::AddressRange;
use crate::object::ObjectRef;

/// How the collector variant scans the card store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Cards are only scanned while all mutators are stopped
    StopTheWorld,
    /// Cards may be scanned or refined concurrently with mutation
    Concurrent,
}

impl ScanMode {
    /// Card marks must become visible only after the initializing stores
    /// of the object they cover
    #[inline]
    pub fn requires_store_ordered_marking(self) -> bool {
        matches!(self, ScanMode::Concurrent)
    }
}

/// Card storage consumed by the barrier
///
/// Implementations are shared by every mutator and the collector, so all
/// methods take `&self`.
pub trait CardStore: Send + Sync {
    /// Dirty every card overlapping `region` (barrier path)
    fn dirty(&self, region: AddressRange);

    /// Dirty every card overlapping `region` (forced path: compensating
    /// marks, object copies, promotion)
    fn force_dirty(&self, region: AddressRange);

    /// Whether `obj` lives in the young generation
    fn is_in_young(&self, obj: ObjectRef) -> bool;

    /// Whether cards may be scanned concurrently with mutation
    fn requires_store_ordered_marking(&self) -> bool;

    /// Card size in bytes
    fn card_size(&self) -> usize;

    /// One-line description for diagnostics
    fn describe(&self) -> String {
        format!("card store ({} byte cards)", self.card_size())
    }
}
