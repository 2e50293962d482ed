//! # cardmark - Card-Marking Write Barrier
//!
//! `cardmark` is the post-write barrier of a generational collector. It
//! records, for every store of a heap reference, which cards of the heap may
//! now hold old-to-young references, so a minor collection scans dirty cards
//! instead of the whole old generation.
//!
//! ## Overview
//!
//! - **Array write dispatch**: bulk reference stores are widened to heap
//!   word boundaries and their cards dirtied
//! - **Card mark policy**: per slow-path allocation, decide between marking
//!   now, deferring, or skipping
//! - **Deferred card marks**: compensate for card marks the optimizing
//!   compiler elided on the inlined allocation path, flushed at fixed points
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cardmark::{BarrierConfig, CardTable, MutatorContext, ScanMode, AddressRange};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), cardmark::BarrierError> {
//!     let config = BarrierConfig::default();
//!     let cards = Arc::new(CardTable::new(
//!         AddressRange::new(heap_start, heap_end),
//!         config.card_size,
//!         ScanMode::Concurrent,
//!     )?);
//!     let barrier = cardmark::init_with_config(&config, cards, Arc::new(MyObjectModel))?;
//!
//!     let mut thread = MutatorContext::attach(1);
//!     barrier.on_allocation_exit(&mut thread, new_object);
//!     // ...
//!     barrier.on_thread_detach(&mut thread);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Mutator Threads                       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
//! │  │ MutatorCtx   │  │ MutatorCtx   │  │ MutatorCtx   │    │
//! │  │ Empty        │  │ Pending(r)   │  │ Empty        │    │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘    │
//! │         └─────────────────┼─────────────────┘            │
//! │                           ▼                               │
//! │        BarrierDispatcher / CardMarkPolicy                 │
//! └───────────────────────────┼───────────────────────────────┘
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  CardStore (dirty / force_dirty, monotonic, idempotent)   │
//! │  scanned by the collector after flush_all_deferred        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Model
//!
//! Only initialization returns errors ([`BarrierError`]). Broken invariants
//! on the store and allocation paths panic through [`fatal_invariant!`]:
//! they mean the set of cards the next collection scans is already wrong.
//!
//! ## Thread Safety
//!
//! - [`CardMarkPolicy`] is `Send + Sync` and shared by every mutator
//! - [`MutatorContext`] is owned by its thread; the barrier takes `&mut`
//! - Flushing every thread requires `&mut` to every context, i.e. a
//!   safepoint provided by the runtime
//!
//! ## Modules
//!
//! - [`barrier`]: dispatcher, policy, deferred flush protocol, statistics
//! - [`card`]: card store contract and byte-per-card table
//! - [`config`]: barrier configuration and validation
//! - [`error`]: error types and the fatal invariant macro
//! - [`logging`]: structured barrier event log
//! - [`memory`]: addresses, ranges and heap layout
//! - [`object`]: object references and the object model contract
//! - [`thread`]: per-thread deferred mark state
//! - [`util`]: alignment helpers

pub mod config;
pub mod error;

pub mod card;
pub mod memory;
pub mod object;
pub mod thread;

pub mod barrier;

pub mod logging;
pub mod util;

pub use barrier::{
    array_write_region, BarrierDispatcher, BarrierSet, BarrierStats, CardMarkPolicy, FlushReason,
};
pub use card::{CardStore, CardTable, ScanMode};
pub use config::{BarrierConfig, ElisionConfig};
pub use error::{BarrierError, Result};
pub use memory::{AddressRange, HeapAddress, HeapLayout, HEAP_WORD_SIZE};
pub use object::{ObjectModel, ObjectRef};
pub use thread::{DeferredMarkState, MutatorContext, ThreadContext};

use std::sync::Arc;

/// cardmark version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the card-mark barrier from environment configuration and install it
///
/// See [`BarrierConfig::from_env`] for the recognized variables.
pub fn init<C, O>(cards: Arc<C>, objects: Arc<O>) -> Result<Arc<CardMarkPolicy<C, O>>>
where
    C: CardStore + 'static,
    O: ObjectModel + 'static,
{
    init_with_config(&BarrierConfig::from_env(), cards, objects)
}

/// Build the card-mark barrier and install it as the process-wide barrier set
///
/// # Errors
/// - `Configuration` / `LayoutMismatch` from [`CardMarkPolicy::new`]
/// - `AlreadyInstalled` if a barrier set is already installed
pub fn init_with_config<C, O>(
    config: &BarrierConfig,
    cards: Arc<C>,
    objects: Arc<O>,
) -> Result<Arc<CardMarkPolicy<C, O>>>
where
    C: CardStore + 'static,
    O: ObjectModel + 'static,
{
    let policy = Arc::new(CardMarkPolicy::new(config, cards, objects)?);
    barrier::set_barrier_set(policy.clone())?;
    Ok(policy)
}
