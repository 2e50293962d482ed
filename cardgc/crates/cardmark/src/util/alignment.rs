//! Alignment Utilities
//!
//! Power-of-two rounding used to widen barrier regions to word and card
//! boundaries.

/// Alignment - utility for alignment operations
pub struct Alignment;

impl Alignment {
    /// Align value up to boundary
    ///
    /// Returns `None` when rounding up would overflow the address space.
    ///
    /// # Examples
    /// ```
    /// use cardmark::util::Alignment;
    ///
    /// assert_eq!(Alignment::checked_align_up(100, 8), Some(104));
    /// assert_eq!(Alignment::checked_align_up(64, 8), Some(64));
    /// assert_eq!(Alignment::checked_align_up(usize::MAX, 8), None);
    /// ```
    #[inline]
    pub fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
        debug_assert!(alignment.is_power_of_two());
        value
            .checked_add(alignment - 1)
            .map(|v| v & !(alignment - 1))
    }

    /// Align value down to boundary
    #[inline]
    pub fn align_down(value: usize, alignment: usize) -> usize {
        debug_assert!(alignment.is_power_of_two());
        value & !(alignment - 1)
    }

    /// Check if value is aligned
    #[inline]
    pub fn is_aligned(value: usize, alignment: usize) -> bool {
        value & (alignment - 1) == 0
    }
}
