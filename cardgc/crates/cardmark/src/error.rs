//! Error Module - Barrier Error Types
//!
//! The barrier core itself has no recoverable errors. Every contract
//! violation on the store or allocation path is a corrupted invariant of the
//! memory manager and terminates through [`fatal_invariant!`].
//!
//! [`BarrierError`] only covers the setup surface:
//!
//! ## Initialization Errors
//! - `Configuration` - Invalid barrier configuration
//! - `LayoutMismatch` - Card store geometry incompatible with heap layout
//! - `AlreadyInstalled` - A global barrier set was installed twice
//! - `NotInstalled` - The global barrier set was queried before installation

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for barrier initialization
///
/// # Examples
///
/// ```rust
/// use cardmark::error::BarrierError;
///
/// fn handle_error(err: BarrierError) {
///     match err {
///         BarrierError::Configuration(cause) => {
///             eprintln!("bad config: {}", cause);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum BarrierError {
    /// Configuration rejected by [`BarrierConfig::validate`](crate::config::BarrierConfig::validate)
    ///
    /// **Recovery strategy:** Use default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Card store geometry does not fit the heap layout
    ///
    /// **When returned:** Card size smaller than a heap word, or a card
    /// store whose card size differs from the configured one
    #[error("Layout mismatch: {0}")]
    LayoutMismatch(String),

    /// A barrier set was already installed for this process
    ///
    /// **Recovery strategy:** Cannot recover - initialization ran twice
    #[error("Barrier set already installed: {0}")]
    AlreadyInstalled(String),

    /// No barrier set installed yet
    #[error("No barrier set installed")]
    NotInstalled,
}

impl BarrierError {
    /// Check if this error indicates a bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            BarrierError::AlreadyInstalled(_) | BarrierError::NotInstalled
        )
    }
}

/// Result type alias for barrier setup operations
pub type Result<T> = std::result::Result<T, BarrierError>;

/// Panic on a broken barrier invariant
///
/// Used for the fatal conditions of the barrier core: oversized array
/// writes, a pending deferred mark where none is expected, a stale deferred
/// region at flush time and a thread context destroyed with a pending mark.
#[macro_export]
macro_rules! fatal_invariant {
    ($cond:expr, $context:expr) => {
        if !$cond {
            panic!(
                "Fatal barrier invariant violated at {}: {}",
                stringify!($cond),
                $context
            );
        }
    };
    ($cond:expr, $context:expr, $($arg:tt)*) => {
        if !$cond {
            panic!(
                "Fatal barrier invariant violated at {}: {}",
                stringify!($cond),
                format!($context, $($arg)*)
            );
        }
    };
}
