//! Configuration Module - Barrier Parameters
//!
//! Process-wide barrier settings. Everything here is resolved once at
//! initialization and is immutable afterwards; in particular whether initial
//! card marks may be deferred is never re-evaluated while mutators run.

use crate::memory::{HeapLayout, HEAP_WORD_SIZE};
use serde::Serialize;

/// Compiler-side switches governing barrier elision on the allocation fast path
///
/// These stand in for the JIT's own flags. The barrier core never queries
/// the compiler; it only sees these booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElisionConfig {
    /// Compiled code may omit card marks for initializing stores into a
    /// freshly allocated object.
    ///
    /// When false, no compensation is needed and slow-path allocation exits
    /// are ignored by the barrier.
    ///
    /// Default: true
    pub reduce_initial_card_marks: bool,

    /// The optimizing (server) compiler is active.
    ///
    /// Default: true
    pub server_compilation: bool,

    /// The heap allows store barriers to be elided for TLAB allocations.
    ///
    /// Default: true
    pub can_elide_tlab_store_barriers: bool,

    /// Defer the compensating card mark even when the collector does not
    /// require marks to follow initializing stores.
    ///
    /// Default: false
    pub defer_initial_card_mark: bool,
}

impl Default for ElisionConfig {
    fn default() -> Self {
        Self {
            reduce_initial_card_marks: true,
            server_compilation: true,
            can_elide_tlab_store_barriers: true,
            defer_initial_card_mark: false,
        }
    }
}

impl ElisionConfig {
    /// Resolve whether compensating card marks are deferred
    ///
    /// `strict_ordering` is the card store's answer to whether a mark must
    /// strictly follow the initializing stores of the object.
    pub fn deferral_enabled(&self, strict_ordering: bool) -> bool {
        self.server_compilation
            && self.reduce_initial_card_marks
            && self.can_elide_tlab_store_barriers
            && (self.defer_initial_card_mark || strict_ordering)
    }
}

/// Main configuration for the card-marking barrier
///
/// # Examples
///
/// ```rust
/// use cardmark::BarrierConfig;
///
/// let config = BarrierConfig {
///     compressed_references: true,
///     card_size: 256,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct BarrierConfig {
    /// References are stored narrower than a heap word
    ///
    /// Two reference slots can then share one heap word, so array writes
    /// may start or end mid-word.
    ///
    /// Default: false
    pub compressed_references: bool,

    /// Card size in bytes
    ///
    /// Power of two, at least one heap word, at most 4KB.
    /// Default: 512
    pub card_size: usize,

    /// Barrier elision switches
    pub elision: ElisionConfig,

    /// Emit barrier events through the global logger
    ///
    /// Default: false
    pub verbose: bool,

    /// Collect barrier statistics
    ///
    /// Default: true
    pub stats_enabled: bool,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        BarrierConfig {
            compressed_references: false,
            card_size: DEFAULT_CARD_SIZE,
            elision: ElisionConfig::default(),
            verbose: false,
            stats_enabled: true,
        }
    }
}

impl BarrierConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// use cardmark::BarrierConfig;
    ///
    /// let config = BarrierConfig {
    ///     card_size: 100, // not a power of two
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.card_size == 0 || !self.card_size.is_power_of_two() {
            return Err(ConfigError::InvalidCardSize(format!(
                "card_size must be a power of two, got {}",
                self.card_size
            )));
        }

        if self.card_size < HEAP_WORD_SIZE {
            return Err(ConfigError::InvalidCardSize(format!(
                "card_size must be at least one heap word ({} bytes)",
                HEAP_WORD_SIZE
            )));
        }

        if self.card_size > MAX_CARD_SIZE {
            return Err(ConfigError::InvalidCardSize(format!(
                "card_size must be <= {} bytes",
                MAX_CARD_SIZE
            )));
        }

        if self.compressed_references && HEAP_WORD_SIZE <= COMPRESSED_REFERENCE_SIZE {
            return Err(ConfigError::InvalidReferenceSize(
                "compressed references require a heap word wider than 4 bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Heap layout implied by this configuration
    pub fn layout(&self) -> HeapLayout {
        if self.compressed_references {
            HeapLayout::compressed()
        } else {
            HeapLayout::uncompressed()
        }
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with:
    /// - CARDMARK_COMPRESSED_REFS
    /// - CARDMARK_CARD_SIZE
    /// - CARDMARK_REDUCE_INITIAL_CARD_MARKS
    /// - CARDMARK_DEFER_INITIAL_CARD_MARK
    /// - CARDMARK_VERBOSE
    ///
    /// ```bash
    /// export CARDMARK_COMPRESSED_REFS=1
    /// export CARDMARK_CARD_SIZE=512
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(flag) = env_flag("CARDMARK_COMPRESSED_REFS") {
            config.compressed_references = flag;
        }

        if let Ok(val) = std::env::var("CARDMARK_CARD_SIZE") {
            match val.parse::<usize>() {
                Ok(size) => config.card_size = size,
                Err(_) => log::warn!("Ignoring CARDMARK_CARD_SIZE={:?}: not a number", val),
            }
        }

        if let Some(flag) = env_flag("CARDMARK_REDUCE_INITIAL_CARD_MARKS") {
            config.elision.reduce_initial_card_marks = flag;
        }

        if let Some(flag) = env_flag("CARDMARK_DEFER_INITIAL_CARD_MARK") {
            config.elision.defer_initial_card_mark = flag;
        }

        if let Some(flag) = env_flag("CARDMARK_VERBOSE") {
            config.verbose = flag;
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid card size: {0}")]
    InvalidCardSize(String),

    #[error("Invalid reference size: {0}")]
    InvalidReferenceSize(String),
}

// ============================================================================
// CONSTANTS & HELPERS
// ============================================================================

/// Default card size: 512 bytes
pub const DEFAULT_CARD_SIZE: usize = 512;

/// Largest accepted card size: 4KB
pub const MAX_CARD_SIZE: usize = 4096;

/// Width of a compressed reference in bytes
pub const COMPRESSED_REFERENCE_SIZE: usize = 4;

fn env_flag(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    match val.as_str() {
        "1" => Some(true),
        "0" => Some(false),
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => {
            log::warn!("Ignoring {}={:?}: expected a boolean", name, val);
            None
        }
    }
}
