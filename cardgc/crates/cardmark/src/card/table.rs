//! Card Table - byte-per-card remembered set
//!
//! Divides the covered heap into fixed-size cards (512 bytes by default).
//! Each card has one byte that is either [`CARD_CLEAN`] or [`CARD_DIRTY`].
//! Mutators only ever store [`CARD_DIRTY`]; the collector clears cards after
//! scanning them.
//!
//! Card Layout:
//! ```text
//! heap:   |  card 0  |  card 1  |  card 2  | ...
//!         ^ covered.start
//! table:  [  0x00   ][  0x01   ][  0x00   ] ...
//! index = (addr - covered.start) >> card_shift
//! ```

use super::{CardStore, ScanMode};
use crate::error::{BarrierError, Result};
use crate::memory::{AddressRange, HEAP_WORD_SIZE};
use crate::object::ObjectRef;
use crate::util::Alignment;
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicU8, Ordering};

/// Card state values.
pub const CARD_CLEAN: u8 = 0;
pub const CARD_DIRTY: u8 = 1;

/// Card table covering one contiguous heap reservation
///
/// # Thread Safety
/// Marking is a plain atomic store of [`CARD_DIRTY`]; no read-modify-write
/// is involved, so concurrent marks never conflict. Under
/// [`ScanMode::Concurrent`] the store uses `Release` so a scanner that
/// observes the dirty byte with `Acquire` also observes the stores that
/// preceded the mark on the marking thread.
pub struct CardTable {
    /// One byte per card
    cards: Box<[AtomicU8]>,
    /// Heap range covered by the table
    covered: AddressRange,
    /// Card size in bytes
    card_size: usize,
    /// log2(card_size)
    card_shift: u32,
    /// Collector variant scanning capability
    scan_mode: ScanMode,
    /// Young generation bounds, published as one value so readers never
    /// pair a new start with an old end
    young: AtomicCell<AddressRange>,
}

impl CardTable {
    /// Create a card table covering `covered`
    ///
    /// # Errors
    /// `LayoutMismatch` if `card_size` is not a power of two, is smaller
    /// than a heap word, or `covered.start()` is not card aligned.
    pub fn new(covered: AddressRange, card_size: usize, scan_mode: ScanMode) -> Result<Self> {
        if !card_size.is_power_of_two() || card_size < HEAP_WORD_SIZE {
            return Err(BarrierError::LayoutMismatch(format!(
                "card size {} must be a power of two >= {}",
                card_size, HEAP_WORD_SIZE
            )));
        }

        if !Alignment::is_aligned(covered.start(), card_size) {
            return Err(BarrierError::LayoutMismatch(format!(
                "covered range {} does not start on a card boundary",
                covered
            )));
        }

        let num_cards = covered.byte_size().div_ceil(card_size);
        let cards: Vec<AtomicU8> = (0..num_cards).map(|_| AtomicU8::new(CARD_CLEAN)).collect();

        Ok(Self {
            cards: cards.into_boxed_slice(),
            covered,
            card_size,
            card_shift: card_size.trailing_zeros(),
            scan_mode,
            young: AtomicCell::new(AddressRange::empty()),
        })
    }

    /// Card index for an address inside the covered range
    ///
    /// # Panics
    /// If `addr` lies outside the covered range.
    #[inline]
    fn card_index(&self, addr: usize) -> usize {
        crate::fatal_invariant!(
            self.covered.contains(addr),
            "address {:#x} outside card table coverage {}",
            addr,
            self.covered
        );
        (addr - self.covered.start()) >> self.card_shift
    }

    /// Indices of all cards overlapping `region`
    #[inline]
    fn card_span(&self, region: AddressRange) -> std::ops::RangeInclusive<usize> {
        self.card_index(region.start())..=self.card_index(region.end() - 1)
    }

    #[inline]
    fn mark_ordering(&self) -> Ordering {
        match self.scan_mode {
            ScanMode::Concurrent => Ordering::Release,
            ScanMode::StopTheWorld => Ordering::Relaxed,
        }
    }

    fn dirty_region(&self, region: AddressRange) {
        if region.is_empty() {
            return;
        }
        let ordering = self.mark_ordering();
        for index in self.card_span(region) {
            self.cards[index].store(CARD_DIRTY, ordering);
        }
    }

    /// Check if the card holding `addr` is dirty
    #[inline]
    pub fn is_dirty(&self, addr: usize) -> bool {
        self.cards[self.card_index(addr)].load(Ordering::Acquire) == CARD_DIRTY
    }

    /// Heap range covered by card `index`
    #[inline]
    pub fn card_range(&self, index: usize) -> AddressRange {
        let start = self.covered.start() + (index << self.card_shift);
        AddressRange::new(start, (start + self.card_size).min(self.covered.end()))
    }

    /// Iterate over dirty cards, calling the closure with each card's range
    pub fn for_each_dirty<F>(&self, mut f: F)
    where
        F: FnMut(AddressRange),
    {
        for (index, card) in self.cards.iter().enumerate() {
            if card.load(Ordering::Acquire) == CARD_DIRTY {
                f(self.card_range(index));
            }
        }
    }

    /// Count dirty cards
    pub fn dirty_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.load(Ordering::Acquire) == CARD_DIRTY)
            .count()
    }

    /// Clear every card overlapping `region` (collector only)
    pub fn clear_region(&self, region: AddressRange) {
        if region.is_empty() {
            return;
        }
        for index in self.card_span(region) {
            self.cards[index].store(CARD_CLEAN, Ordering::Relaxed);
        }
    }

    /// Clear all cards (collector only)
    pub fn clear_all(&self) {
        for card in self.cards.iter() {
            card.store(CARD_CLEAN, Ordering::Relaxed);
        }
    }

    /// Publish the young generation bounds
    ///
    /// Normally called by the collector while mutators are stopped, but
    /// both bounds are replaced together, so a concurrent
    /// [`young_range`](Self::young_range) sees either the old or the new
    /// range.
    pub fn set_young_range(&self, young: AddressRange) {
        self.young.store(young);
    }

    /// Current young generation bounds
    pub fn young_range(&self) -> AddressRange {
        self.young.load()
    }

    /// Heap range covered by the table
    pub fn covered(&self) -> AddressRange {
        self.covered
    }

    /// Number of cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the table covers nothing
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Scanning capability of the collector variant
    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }
}

impl CardStore for CardTable {
    #[inline]
    fn dirty(&self, region: AddressRange) {
        self.dirty_region(region);
    }

    #[inline]
    fn force_dirty(&self, region: AddressRange) {
        self.dirty_region(region);
    }

    #[inline]
    fn is_in_young(&self, obj: ObjectRef) -> bool {
        self.young_range().contains(obj.address())
    }

    #[inline]
    fn requires_store_ordered_marking(&self) -> bool {
        self.scan_mode.requires_store_ordered_marking()
    }

    #[inline]
    fn card_size(&self) -> usize {
        self.card_size
    }

    fn describe(&self) -> String {
        format!(
            "card table {} ({} cards of {} bytes, {:?} scanning)",
            self.covered,
            self.len(),
            self.card_size,
            self.scan_mode
        )
    }
}
