//! Test Utilities for the cardmark test suite
//!
//! Provides a card store that records every call the barrier makes and a
//! simulated heap implementing the object model.

#![allow(dead_code)]

use cardmark::{
    AddressRange, BarrierConfig, CardMarkPolicy, CardStore, CardTable, ElisionConfig, ObjectModel,
    ObjectRef, ScanMode, HEAP_WORD_SIZE,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Start of the simulated heap
pub const HEAP_BASE: usize = 0x1000_0000;

/// Size of the simulated heap (4MB): lower half old, upper half young
pub const HEAP_SIZE: usize = 4 * 1024 * 1024;

pub const YOUNG_BASE: usize = HEAP_BASE + HEAP_SIZE / 2;

/// Card size used by most tests
pub const CARD_SIZE: usize = 512;

// ============================================================================
// RECORDING CARD STORE
// ============================================================================

/// Which card store entry point a mark went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Dirty,
    ForceDirty,
}

/// Card store that records every mark on top of a real card table
pub struct RecordingCardStore {
    pub table: CardTable,
    calls: Mutex<Vec<(MarkKind, AddressRange)>>,
}

impl RecordingCardStore {
    pub fn new(scan_mode: ScanMode, card_size: usize) -> Self {
        let table = CardTable::new(
            AddressRange::new(HEAP_BASE, HEAP_BASE + HEAP_SIZE),
            card_size,
            scan_mode,
        )
        .expect("test card table geometry is valid");
        table.set_young_range(AddressRange::new(YOUNG_BASE, HEAP_BASE + HEAP_SIZE));

        Self {
            table,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All recorded marks in call order
    pub fn calls(&self) -> Vec<(MarkKind, AddressRange)> {
        self.calls.lock().clone()
    }

    /// Regions marked through `force_dirty`
    pub fn forced(&self) -> Vec<AddressRange> {
        self.calls
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == MarkKind::ForceDirty)
            .map(|(_, region)| *region)
            .collect()
    }

    /// How many times `region` was force-dirtied
    pub fn forced_count(&self, region: AddressRange) -> usize {
        self.forced().iter().filter(|r| **r == region).count()
    }

    /// Set of dirty card start addresses
    pub fn dirty_cards(&self) -> Vec<usize> {
        let mut cards = Vec::new();
        self.table.for_each_dirty(|range| cards.push(range.start()));
        cards
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl CardStore for RecordingCardStore {
    fn dirty(&self, region: AddressRange) {
        self.calls.lock().push((MarkKind::Dirty, region));
        self.table.dirty(region);
    }

    fn force_dirty(&self, region: AddressRange) {
        self.calls.lock().push((MarkKind::ForceDirty, region));
        self.table.force_dirty(region);
    }

    fn is_in_young(&self, obj: ObjectRef) -> bool {
        self.table.is_in_young(obj)
    }

    fn requires_store_ordered_marking(&self) -> bool {
        self.table.requires_store_ordered_marking()
    }

    fn card_size(&self) -> usize {
        self.table.card_size()
    }
}

// ============================================================================
// SIMULATED HEAP
// ============================================================================

/// Shape of a simulated object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectShape {
    /// Plain object with the given number of reference fields
    Instance { reference_fields: usize },
    /// Array of references
    ReferenceArray { length: usize },
    /// Array of primitives
    PrimitiveArray { words: usize },
}

impl ObjectShape {
    /// Size in heap words including a two-word header
    pub fn words(&self) -> usize {
        2 + match *self {
            ObjectShape::Instance { reference_fields } => reference_fields,
            ObjectShape::ReferenceArray { length } => length,
            ObjectShape::PrimitiveArray { words } => words,
        }
    }
}

/// Bump-allocated heap with an old and a young half
pub struct SimHeap {
    objects: RwLock<HashMap<usize, ObjectShape>>,
    old_top: AtomicUsize,
    young_top: AtomicUsize,
}

impl SimHeap {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            old_top: AtomicUsize::new(HEAP_BASE),
            young_top: AtomicUsize::new(YOUNG_BASE),
        }
    }

    fn bump(top: &AtomicUsize, shape: ObjectShape, limit: usize) -> usize {
        let bytes = shape.words() * HEAP_WORD_SIZE;
        let addr = top.fetch_add(bytes, Ordering::Relaxed);
        assert!(addr + bytes <= limit, "simulated heap exhausted");
        addr
    }

    /// Allocate in the old generation
    pub fn allocate_old(&self, shape: ObjectShape) -> ObjectRef {
        let addr = Self::bump(&self.old_top, shape, YOUNG_BASE);
        self.objects.write().insert(addr, shape);
        ObjectRef::new(addr)
    }

    /// Allocate in the young generation
    pub fn allocate_young(&self, shape: ObjectShape) -> ObjectRef {
        let addr = Self::bump(&self.young_top, shape, HEAP_BASE + HEAP_SIZE);
        self.objects.write().insert(addr, shape);
        ObjectRef::new(addr)
    }

    /// Forget an object, as if a collection had reclaimed it
    pub fn reclaim(&self, obj: ObjectRef) {
        self.objects.write().remove(&obj.address());
    }

    fn shape(&self, obj: ObjectRef) -> ObjectShape {
        *self
            .objects
            .read()
            .get(&obj.address())
            .unwrap_or_else(|| panic!("no object at {}", obj))
    }
}

impl ObjectModel for SimHeap {
    fn is_reference_free_array(&self, obj: ObjectRef) -> bool {
        matches!(self.shape(obj), ObjectShape::PrimitiveArray { .. })
    }

    fn extent(&self, obj: ObjectRef) -> AddressRange {
        AddressRange::from_words(obj.address(), self.shape(obj).words())
    }

    fn is_well_formed(&self, obj: ObjectRef) -> bool {
        self.objects.read().contains_key(&obj.address())
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

/// Policy over a recording card store and a simulated heap
pub struct BarrierFixture {
    pub policy: CardMarkPolicy<RecordingCardStore, SimHeap>,
}

impl BarrierFixture {
    /// Concurrent scanning: deferral on
    pub fn deferring() -> Self {
        Self::with(ScanMode::Concurrent, BarrierConfig::default())
    }

    /// Stop-the-world scanning: deferral off
    pub fn immediate() -> Self {
        Self::with(ScanMode::StopTheWorld, BarrierConfig::default())
    }

    /// Compressed references with word-sized cards
    pub fn compressed_word_cards() -> Self {
        let config = BarrierConfig {
            compressed_references: true,
            card_size: HEAP_WORD_SIZE,
            ..Default::default()
        };
        Self::with(ScanMode::StopTheWorld, config)
    }

    /// Deferral forced on without strict ordering
    pub fn forced_deferral() -> Self {
        let config = BarrierConfig {
            elision: ElisionConfig {
                defer_initial_card_mark: true,
                ..Default::default()
            },
            ..Default::default()
        };
        Self::with(ScanMode::StopTheWorld, config)
    }

    pub fn with(scan_mode: ScanMode, config: BarrierConfig) -> Self {
        let cards = Arc::new(RecordingCardStore::new(scan_mode, config.card_size));
        let policy = CardMarkPolicy::new(&config, cards, Arc::new(SimHeap::new()))
            .expect("fixture configuration is valid");
        Self { policy }
    }

    pub fn cards(&self) -> &RecordingCardStore {
        self.policy.card_store()
    }

    pub fn heap(&self) -> &SimHeap {
        self.policy.object_model()
    }
}

/// Object with `n` reference fields
pub fn instance(n: usize) -> ObjectShape {
    ObjectShape::Instance {
        reference_fields: n,
    }
}
