//! Object Module - Heap object view used by the barrier
//!
//! The barrier never parses object headers itself. Everything it needs to
//! know about an object comes through [`ObjectModel`], implemented by the
//! surrounding runtime.

use crate::memory::{AddressRange, HeapAddress};
use std::fmt;

/// Reference to the start of a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(HeapAddress);

impl ObjectRef {
    #[inline]
    pub const fn new(address: HeapAddress) -> Self {
        Self(address)
    }

    #[inline]
    pub const fn address(self) -> HeapAddress {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Object introspection provided by the runtime
pub trait ObjectModel: Send + Sync {
    /// Array whose elements are not references (no post-barrier needed)
    fn is_reference_free_array(&self, obj: ObjectRef) -> bool;

    /// Heap range occupied by `obj`, header included, word aligned
    fn extent(&self, obj: ObjectRef) -> AddressRange;

    /// `obj` parses as a single, fully initialized object
    ///
    /// Only used to verify deferred card marks at flush time.
    fn is_well_formed(&self, obj: ObjectRef) -> bool;
}
