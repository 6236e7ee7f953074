//! # Buffer Configuration
//!
//! Segment sizing and disposal policy, loaded once at startup from TOML.
//!
//! ```toml
//! [buffer]
//! segment_size = 8192
//! initial_segments = 1
//! clear_on_dispose = false
//!
//! [pool]
//! max_retained_blocks = 64
//! ```

use std::path::Path;

use serde::Deserialize;
use strata_memory::PoolConfig;

use crate::error::{BufferError, BufferResult};
use crate::item::{Item, ItemLayout};

/// Default segment (and initial block) size in bytes.
pub const DEFAULT_SEGMENT_SIZE: usize = 8192;

/// Settings shared by both buffer variants.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    /// Bytes per segment for `SegmentedBuffer`, initial block size for
    /// `ContinuousBuffer`. Must be a multiple of the item size.
    pub segment_size: usize,
    /// Segments rented up front by `SegmentedBuffer`. At least one is always
    /// rented.
    pub initial_segments: usize,
    /// Zero every block before it goes back to the pool.
    pub clear_on_dispose: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            initial_segments: 1,
            clear_on_dispose: false,
        }
    }
}

impl BufferConfig {
    /// Configuration with the given segment size and defaults otherwise.
    #[must_use]
    pub fn with_segment_size(segment_size: usize) -> Self {
        Self {
            segment_size,
            ..Self::default()
        }
    }

    /// Checks the configuration against item type `T`.
    ///
    /// # Errors
    ///
    /// Returns the item layout error, `ItemSizeMismatch` if the segment
    /// size does not hold a whole number of items, or `InvalidConfig` if the
    /// initial segments cannot be addressed.
    pub fn validate<T: Item>(&self) -> BufferResult<ItemLayout> {
        let layout = ItemLayout::for_item::<T>()?;
        layout.check_block_size(self.segment_size)?;

        let initial_bytes = self
            .initial_segments
            .max(1)
            .checked_mul(self.segment_size)
            .filter(|&bytes| isize::try_from(bytes).is_ok());
        if initial_bytes.is_none() {
            return Err(BufferError::InvalidConfig(format!(
                "{} initial segments of {} bytes exceed the address space",
                self.initial_segments, self.segment_size
            )));
        }
        Ok(layout)
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    /// `[buffer]` table.
    pub buffer: BufferConfig,
    /// `[pool]` table.
    pub pool: PoolConfig,
}

impl StrataConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> BufferResult<Self> {
        toml::from_str(text).map_err(|e| BufferError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidConfig` if it cannot
    /// be parsed.
    pub fn load(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }
}
