//! Barrier Module - Card-marking post-write barrier
//!
//! Every mutator store of a heap reference must leave enough trace for a
//! minor collection to find old-to-young references without scanning the
//! old generation. This module records those traces as dirty cards.
//!
//! Store paths:
//! ```text
//! array store ──> BarrierDispatcher::mark_array_write(start, count)
//!                   │ align [start, start + count * ref_size) outward to words
//!                   ▼
//!                 BarrierSet::write_ref_array_work(region) ──> CardStore::dirty
//!
//! slow-path allocation ──> CardMarkPolicy::on_allocation_exit(thread, obj)
//!                   │ flush pending mark of `thread`
//!                   │ skip reference-free arrays and young objects
//!                   ▼
//!                 defer (thread slot) or invalidate now ──> CardStore::force_dirty
//! ```
//!
//! Deferred marks compensate for card marks the optimizing compiler elided
//! on the allocation fast path. They are flushed at the thread's next
//! slow-path allocation, when the thread detaches, or by the collector at a
//! safepoint before cards are scanned.

pub mod card_mark;
pub mod deferred;
pub mod dispatch;
pub mod global;
pub mod stats;

pub use card_mark::CardMarkPolicy;
pub use deferred::FlushReason;
pub use dispatch::{array_write_region, BarrierDispatcher};
pub use global::{barrier_set, set_barrier_set};
pub use stats::{AtomicBarrierStats, BarrierStats};

use crate::memory::{AddressRange, HeapAddress, HeapLayout};
use crate::object::ObjectRef;
use crate::thread::ThreadContext;

/// Interface the runtime calls into on stores, allocations and thread exit
///
/// Object safe so one barrier set can be installed process-wide behind an
/// `Arc<dyn BarrierSet>`.
pub trait BarrierSet: Send + Sync {
    /// Short name of the barrier kind
    fn name(&self) -> &'static str;

    /// Reference and word widths of the heap this barrier serves
    fn layout(&self) -> HeapLayout;

    /// Record stores into every reference slot of `region`
    fn write_region(&self, region: AddressRange);

    /// Record `region` as modified outside the normal store path
    fn invalidate(&self, region: AddressRange);

    /// Record a word-aligned bulk array write
    fn write_ref_array_work(&self, region: AddressRange) {
        self.write_region(region);
    }

    /// Record a bulk write of `count` references starting at `start`
    fn write_ref_array(&self, start: HeapAddress, count: usize) {
        self.write_ref_array_work(array_write_region(self.layout(), start, count));
    }

    /// Slow-path allocation of `obj` by `thread` completed
    fn on_slowpath_allocation_exit(&self, thread: &mut dyn ThreadContext, obj: ObjectRef);

    /// `thread` is about to be torn down
    fn on_thread_detach(&self, thread: &mut dyn ThreadContext);

    /// Card marks must strictly follow the stores they cover
    fn card_mark_must_follow_store(&self) -> bool;
}
