//! Subtree write-lock configuration.

use serde::{Deserialize, Serialize};

/// Controls how mutations wait for tree locks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingConfig {
    /// How long a mutation waits for its tree locks, in milliseconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,
    /// How many times lock acquisition is retried when a touched folder
    /// changed trees while the mutation was waiting.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: default_acquire_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_acquire_timeout() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}
