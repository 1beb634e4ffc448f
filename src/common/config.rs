//! Configuration for the paged index.
//!
//! Compile-time layout constants live here next to [`StorageConfig`], the
//! runtime knobs for opening a [`Storage`](crate::storage::Storage).
//!
//! # Environment Variables
//!
//! - `BTREE_INDEX_POOL_SIZE`: number of buffer pool frames (default: `64`)

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems. Every B-tree node, every stored
/// object and the storage header each occupy exactly one page.
pub const PAGE_SIZE: usize = 4096;

/// Longest string key accepted by an index, in bytes.
///
/// Keeps at least three keys per string-keyed page so that a split always
/// leaves both halves non-empty.
pub const MAX_STRING_KEY_LEN: usize = 1024;

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Environment variable read by [`StorageConfig::from_env`].
pub const POOL_SIZE_ENV: &str = "BTREE_INDEX_POOL_SIZE";

/// Runtime configuration for a storage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Number of frames in the buffer pool. Must be at least 1.
    pub pool_size: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A setting has an invalid value.
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl StorageConfig {
    /// Replace the pool size. The value is checked by [`validate`](Self::validate)
    /// when the config is used to create or open storage.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(POOL_SIZE_ENV) {
            config.pool_size = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: POOL_SIZE_ENV.to_string(),
                message: format!("{e}"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the values against their limits.
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` if `pool_size` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: POOL_SIZE_ENV.to_string(),
                message: "pool size must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}
