//! Array Write Dispatch Tests
//!
//! These tests verify the bulk array-write path:
//! - Outward word alignment never drops a written slot
//! - Word-sized references pass through unchanged
//! - Every card overlapping the write is dirtied, and only those

mod common;

use cardmark::{
    array_write_region, AddressRange, BarrierDispatcher, BarrierSet, HeapLayout, HEAP_WORD_SIZE,
};
use common::{BarrierFixture, MarkKind, CARD_SIZE, HEAP_BASE};
use rand::{Rng, SeedableRng};
use std::sync::Arc;

// ============================================================================
// ALIGNMENT SOUNDNESS
// ============================================================================

/// **Invariant verified:** aligned region contains the raw write interval
/// and both bounds are word aligned
#[test]
fn test_alignment_soundness_randomized() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let layouts = [HeapLayout::compressed(), HeapLayout::uncompressed()];

    for _ in 0..10_000 {
        let layout = layouts[rng.gen_range(0..layouts.len())];
        // Slot-aligned start somewhere in the heap.
        let slot = rng.gen_range(0..1 << 20);
        let start = HEAP_BASE + slot * layout.reference_size();
        let count = rng.gen_range(0..4096);

        let raw = AddressRange::new(start, start + count * layout.reference_size());
        let aligned = array_write_region(layout, start, count);

        assert!(
            aligned.contains_range(&raw),
            "aligned {} does not cover written {}",
            aligned,
            raw
        );
        assert!(aligned.is_word_aligned(), "{} not word aligned", aligned);
        assert!(aligned.byte_size() < raw.byte_size() + 2 * HEAP_WORD_SIZE);

        if !layout.uses_compressed_references() {
            assert_eq!(aligned, raw);
        }
    }
}

/// **Invariant verified:** compressed write from mid-word widens to three
/// full words and dirties three word-sized cards
#[test]
fn test_compressed_write_marks_all_covered_cards() {
    let fixture = BarrierFixture::compressed_word_cards();
    let start = HEAP_BASE + 0x1004;

    BarrierSet::write_ref_array(&fixture.policy, start, 4);

    let expected = AddressRange::new(HEAP_BASE + 0x1000, HEAP_BASE + 0x1018);
    assert_eq!(fixture.cards().calls(), vec![(MarkKind::Dirty, expected)]);
    assert_eq!(
        fixture.cards().dirty_cards(),
        vec![HEAP_BASE + 0x1000, HEAP_BASE + 0x1008, HEAP_BASE + 0x1010]
    );
}

/// **Invariant verified:** aligned compressed writes are not widened
#[test]
fn test_compressed_aligned_write_not_widened() {
    let fixture = BarrierFixture::compressed_word_cards();
    let start = HEAP_BASE + 0x1008;

    BarrierSet::write_ref_array(&fixture.policy, start, 2);

    assert_eq!(
        fixture.cards().calls(),
        vec![(MarkKind::Dirty, AddressRange::new(start, start + 8))]
    );
    assert_eq!(fixture.cards().dirty_cards(), vec![start]);
}

/// **Invariant verified:** a write crossing a card boundary dirties both
/// cards and nothing else
#[test]
fn test_write_across_card_boundary() {
    let fixture = BarrierFixture::immediate();
    let dispatcher = BarrierDispatcher::new(Arc::new(fixture.policy));
    let start = HEAP_BASE + CARD_SIZE - 2 * HEAP_WORD_SIZE;

    dispatcher.mark_array_write(start, 4);

    let cards = dispatcher.barrier().card_store();
    assert_eq!(cards.dirty_cards(), vec![HEAP_BASE, HEAP_BASE + CARD_SIZE]);
    assert_eq!(dispatcher.barrier().stats().array_writes, 1);
}

/// **Invariant verified:** empty writes reach the store but dirty nothing
#[test]
fn test_empty_write() {
    let fixture = BarrierFixture::immediate();
    BarrierSet::write_ref_array(&fixture.policy, HEAP_BASE + 0x40, 0);
    assert!(fixture.cards().dirty_cards().is_empty());
}

#[test]
#[should_panic(expected = "too large")]
fn test_oversized_count_is_fatal() {
    let fixture = BarrierFixture::compressed_word_cards();
    BarrierSet::write_ref_array(&fixture.policy, HEAP_BASE, usize::MAX);
}

// ============================================================================
// MARKING PROPERTIES
// ============================================================================

/// **Invariant verified:** marking twice leaves the same dirty set as once
#[test]
fn test_marking_idempotent() {
    let fixture = BarrierFixture::immediate();
    let region = AddressRange::new(HEAP_BASE + 0x800, HEAP_BASE + 0xc10);

    fixture.policy.mark_region(region);
    let once = fixture.cards().dirty_cards();

    fixture.policy.mark_region(region);
    fixture.policy.invalidate(region);
    assert_eq!(fixture.cards().dirty_cards(), once);
}

/// **Invariant verified:** no marking operation ever cleans a card
#[test]
fn test_marking_monotonic() {
    let fixture = BarrierFixture::immediate();
    let first = AddressRange::new(HEAP_BASE, HEAP_BASE + 0x1000);
    fixture.policy.mark_region(first);
    let before = fixture.cards().dirty_cards();

    for offset in (0..0x4000).step_by(0x100) {
        let region = AddressRange::new(HEAP_BASE + offset, HEAP_BASE + offset + 8);
        fixture.policy.mark_region(region);
        fixture.policy.invalidate(region);
        let now = fixture.cards().dirty_cards();
        assert!(before.iter().all(|card| now.contains(card)));
    }

    // Only the collector clears.
    fixture.cards().table.clear_all();
    assert!(fixture.cards().dirty_cards().is_empty());
}

/// **Invariant verified:** invalidate goes through the forced path,
/// mark_region through the barrier path
#[test]
fn test_mark_paths_preserved() {
    let fixture = BarrierFixture::immediate();
    let region = AddressRange::new(HEAP_BASE + 0x40, HEAP_BASE + 0x80);

    fixture.policy.mark_region(region);
    fixture.policy.invalidate(region);

    assert_eq!(
        fixture.cards().calls(),
        vec![(MarkKind::Dirty, region), (MarkKind::ForceDirty, region)]
    );
}
