//! Tree cache configuration.

use serde::{Deserialize, Serialize};

/// In-memory cache of built folder trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether built trees are cached between reads.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum number of cached tree scopes.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// TTL for cached trees in seconds.
    #[serde(default = "default_ttl")]
    pub time_to_live_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_max_capacity(),
            time_to_live_seconds: default_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_capacity() -> u64 {
    1000
}

fn default_ttl() -> u64 {
    300
}
