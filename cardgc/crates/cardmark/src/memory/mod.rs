//! Memory Module - Heap addresses and layout
//!
//! Addresses are plain `usize` byte addresses. The barrier never
//! dereferences them; object contents are only reached through the
//! [`ObjectModel`](crate::object::ObjectModel) collaborator.

pub mod region;

pub use region::AddressRange;

use serde::Serialize;

/// Heap address in bytes
pub type HeapAddress = usize;

/// Size of a heap word in bytes
pub const HEAP_WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Reference width and word width of the managed heap
///
/// With uncompressed references every reference slot is exactly one heap
/// word. With compressed references slots are narrower, and an array write
/// can begin or end in the middle of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapLayout {
    reference_size: usize,
}

impl HeapLayout {
    /// Word-sized references
    pub const fn uncompressed() -> Self {
        Self {
            reference_size: HEAP_WORD_SIZE,
        }
    }

    /// 32-bit references
    pub const fn compressed() -> Self {
        Self {
            reference_size: crate::config::COMPRESSED_REFERENCE_SIZE,
        }
    }

    /// Width of one reference slot in bytes
    #[inline]
    pub fn reference_size(&self) -> usize {
        self.reference_size
    }

    /// Heap word width in bytes
    #[inline]
    pub fn word_size(&self) -> usize {
        HEAP_WORD_SIZE
    }

    /// References narrower than a heap word
    #[inline]
    pub fn uses_compressed_references(&self) -> bool {
        self.reference_size < HEAP_WORD_SIZE
    }
}

impl Default for HeapLayout {
    fn default() -> Self {
        Self::uncompressed()
    }
}
